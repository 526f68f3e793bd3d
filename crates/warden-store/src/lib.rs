//! Warden Store - key and session tables
//!
//! Lookup contracts for key pairs and derived sessions, plus the volatile
//! in-memory implementation the manager uses by default.

pub mod memory;
pub mod record;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

pub use memory::{MemoryKeyStore, MemorySessionStore, MemoryTable};
pub use record::{Expiring, KeyPairRecord, SessionRecord};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Identifier already in use: {0}")]
    DuplicateId(String),

    #[error("Lifetime of {0} runs past the supported date range")]
    LifetimeOutOfRange(String),
}

/// Table of key pairs. The store is the sole owner of private key bytes;
/// readers get a shared handle, never a copy.
pub trait KeyStore: Send + Sync {
    fn insert(&self, record: KeyPairRecord) -> Result<Arc<KeyPairRecord>, StoreError>;

    /// Plain lookup; expired keys are still returned.
    fn get(&self, key_id: &str) -> Option<Arc<KeyPairRecord>>;

    fn remove(&self, key_id: &str) -> bool;

    /// Drop every key expired as of `now`, returning how many went.
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;

    fn count_active(&self, now: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Table of established sessions.
pub trait SessionStore: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<Arc<SessionRecord>, StoreError>;

    /// Plain lookup with no side effects.
    fn get(&self, session_id: &str) -> Option<Arc<SessionRecord>>;

    /// Read-triggers-cleanup lookup: an expired session is evicted and
    /// reported as absent.
    fn get_live(&self, session_id: &str, now: DateTime<Utc>) -> Option<Arc<SessionRecord>>;

    fn remove(&self, session_id: &str) -> bool;

    fn purge_expired(&self, now: DateTime<Utc>) -> usize;

    fn count_active(&self, now: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
