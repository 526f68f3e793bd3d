//! Manager configuration
//!
//! Loaded from a JSON file, then overridden from the environment:
//!   WARDEN_SECURITY_LEVEL          default level for new keys (1, 3, 5)
//!   WARDEN_KEY_LIFETIME_DAYS       0 means keys never expire
//!   WARDEN_SESSION_LIFETIME_HOURS  must be positive

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use warden_crypto::{Algorithm, AlgorithmFamily, ProviderRegistry, SecurityLevel};

use crate::error::{Result, SecurityError};

pub const ENV_SECURITY_LEVEL: &str = "WARDEN_SECURITY_LEVEL";
pub const ENV_KEY_LIFETIME_DAYS: &str = "WARDEN_KEY_LIFETIME_DAYS";
pub const ENV_SESSION_LIFETIME_HOURS: &str = "WARDEN_SESSION_LIFETIME_HOURS";

/// One hundred years
pub const MAX_KEY_LIFETIME_DAYS: u32 = 36_500;
/// Ten years
pub const MAX_SESSION_LIFETIME_HOURS: u32 = 87_600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub default_security_level: SecurityLevel,
    pub default_kem: Algorithm,
    pub key_lifetime_days: u32,
    pub session_lifetime_hours: u32,
    /// Requested algorithm → algorithm allowed to stand in for it.
    /// Empty by default: unsupported requests fail.
    pub fallbacks: BTreeMap<Algorithm, Algorithm>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_security_level: SecurityLevel::Level3,
            default_kem: Algorithm::Kyber,
            key_lifetime_days: 365,
            session_lifetime_hours: 24,
            fallbacks: BTreeMap::new(),
        }
    }
}

impl ManagerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SecurityError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            SecurityError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded manager config");
        Ok(config)
    }

    /// Apply overrides from process environment variables.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any name → value lookup.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_SECURITY_LEVEL) {
            self.default_security_level = level
                .parse()
                .map_err(|e| SecurityError::Config(format!("{}: {}", ENV_SECURITY_LEVEL, e)))?;
        }
        if let Some(days) = lookup(ENV_KEY_LIFETIME_DAYS) {
            self.key_lifetime_days = parse_number(ENV_KEY_LIFETIME_DAYS, &days)?;
        }
        if let Some(hours) = lookup(ENV_SESSION_LIFETIME_HOURS) {
            self.session_lifetime_hours = parse_number(ENV_SESSION_LIFETIME_HOURS, &hours)?;
        }
        Ok(self)
    }

    pub fn with_fallback(mut self, requested: Algorithm, substitute: Algorithm) -> Self {
        self.fallbacks.insert(requested, substitute);
        self
    }

    /// `None` when keys are configured not to expire.
    pub fn key_lifetime(&self) -> Option<Duration> {
        match self.key_lifetime_days {
            0 => None,
            days => Some(Duration::days(i64::from(days))),
        }
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::hours(i64::from(self.session_lifetime_hours))
    }

    pub fn validate(&self, registry: &ProviderRegistry) -> Result<()> {
        if self.session_lifetime_hours == 0 {
            return Err(SecurityError::Config(
                "session_lifetime_hours must be positive".into(),
            ));
        }
        if self.session_lifetime_hours > MAX_SESSION_LIFETIME_HOURS {
            return Err(SecurityError::Config(format!(
                "session_lifetime_hours {} exceeds {}",
                self.session_lifetime_hours, MAX_SESSION_LIFETIME_HOURS
            )));
        }
        if self.key_lifetime_days > MAX_KEY_LIFETIME_DAYS {
            return Err(SecurityError::Config(format!(
                "key_lifetime_days {} exceeds {}",
                self.key_lifetime_days, MAX_KEY_LIFETIME_DAYS
            )));
        }
        if self.default_kem.family() != AlgorithmFamily::Kem {
            return Err(SecurityError::Config(format!(
                "default_kem {} is not a KEM",
                self.default_kem
            )));
        }
        for (&requested, &substitute) in &self.fallbacks {
            if requested == substitute {
                return Err(SecurityError::Config(format!(
                    "fallback for {} points at itself",
                    requested
                )));
            }
            if requested.family() != substitute.family() {
                return Err(SecurityError::Config(format!(
                    "fallback {} -> {} crosses algorithm families",
                    requested, substitute
                )));
            }
            if !registry.supports(substitute) {
                return Err(SecurityError::Config(format!(
                    "fallback target {} has no registered provider",
                    substitute
                )));
            }
        }
        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| SecurityError::Config(format!("{}: not a number: {}", name, value)))
}
