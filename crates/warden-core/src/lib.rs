//! Warden Core - Key and session orchestration
//!
//! This crate ties the algorithm providers and the key/session tables
//! together behind `QuantumSecurityManager`, which is what every Warden
//! frontend (CLI, embedding services) talks to.

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod types;

pub use audit::{AuditEvent, AuditSink, MemoryAuditSink, Severity, TracingAuditSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ManagerConfig;
pub use error::{EntryKind, Result, SecurityError, Stage};
pub use manager::{ManagerBuilder, QuantumSecurityManager};
pub use types::{CleanupReport, SecurityMetrics, SignatureResult};

pub use warden_crypto::{Algorithm, AlgorithmFamily, Encapsulation, SecurityLevel};
pub use warden_store::{KeyPairRecord, SessionRecord};
