//! Security audit facade
//!
//! The manager reports `(name, severity, details)` events to whatever sink
//! it was built with. Storage and retention belong to the sink, not to us.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Event names reported by the manager
pub mod events {
    pub const KEY_GENERATED: &str = "key_generated";
    pub const KEY_REVOKED: &str = "key_revoked";
    pub const ALGORITHM_SUBSTITUTED: &str = "algorithm_substituted";
    pub const SIGNING_FAILED: &str = "signing_failed";
    pub const SESSION_ESTABLISHED: &str = "session_established";
    pub const SESSION_FAILED: &str = "session_establishment_failed";
    pub const SESSION_ACCEPTED: &str = "session_accepted";
    pub const SESSION_REVOKED: &str = "session_revoked";
    pub const EXPIRED_MATERIAL_PURGED: &str = "expired_material_purged";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub name: String,
    pub severity: Severity,
    pub details: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(name: &str, severity: Severity, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            severity,
            details: BTreeMap::new(),
            timestamp,
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Forwards events to the `tracing` subscriber under the `warden::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let details = serde_json::to_string(&event.details).unwrap_or_default();
        match event.severity {
            Severity::Info => {
                info!(target: "warden::audit", event = %event.name, id = %event.id, %details)
            }
            Severity::Warning => {
                warn!(target: "warden::audit", event = %event.name, id = %event.id, %details)
            }
            Severity::Critical => {
                error!(target: "warden::audit", event = %event.name, id = %event.id, %details)
            }
        }
    }
}

/// Keeps every event in memory; handy for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.name.clone()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}
