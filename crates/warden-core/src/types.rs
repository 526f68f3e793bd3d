//! Values returned by the manager

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_crypto::{Algorithm, SecurityLevel};

/// A detached signature together with everything needed to check it
/// against any public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResult {
    #[serde(with = "hex")]
    pub signature: Vec<u8>,
    /// Scheme that actually produced the signature
    pub algorithm: Algorithm,
    pub security_level: SecurityLevel,
    pub key_id: String,
    pub timestamp: DateTime<Utc>,
    /// The exact bytes that were signed
    #[serde(with = "hex")]
    pub message: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityMetrics {
    pub active_keys: usize,
    pub active_sessions: usize,
    pub supported_algorithms: Vec<Algorithm>,
    pub quantum_resistant: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub keys_removed: usize,
    pub sessions_removed: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.keys_removed + self.sessions_removed
    }
}
