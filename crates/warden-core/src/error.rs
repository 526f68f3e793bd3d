//! Error taxonomy for manager operations
//!
//! Messages name the stage that failed and the ids involved. Key bytes,
//! shared secrets and session keys never reach an error value.

use std::fmt;
use thiserror::Error;

use warden_crypto::{Algorithm, CipherError, ProviderError};
use warden_store::StoreError;

/// Which operation was running when a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    KeyGeneration,
    Signing,
    Encapsulation,
    Decapsulation,
    SessionEstablishment,
    SessionAcceptance,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KeyGeneration => "key generation",
            Self::Signing => "signing",
            Self::Encapsulation => "encapsulation",
            Self::Decapsulation => "decapsulation",
            Self::SessionEstablishment => "session establishment",
            Self::SessionAcceptance => "session acceptance",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Key,
    Session,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => write!(f, "Key"),
            Self::Session => write!(f, "Session"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntryKind, id: String },

    #[error("{kind} expired: {id}")]
    Expired { kind: EntryKind, id: String },

    #[error("Unsupported algorithm for {stage}: {algorithm}")]
    UnsupportedAlgorithm { algorithm: Algorithm, stage: Stage },

    #[error("{stage} failed ({algorithm}): {source}")]
    ProviderFailure {
        stage: Stage,
        algorithm: Algorithm,
        #[source]
        source: ProviderError,
    },

    #[error("Session payload error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SecurityError {
    pub(crate) fn key_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: EntryKind::Key,
            id: id.to_string(),
        }
    }

    pub(crate) fn session_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: EntryKind::Session,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

pub type Result<T> = std::result::Result<T, SecurityError>;
