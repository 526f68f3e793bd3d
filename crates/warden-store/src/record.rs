//! Key pair and session records
//!
//! Private key bytes, KEM shared secrets and session keys are scrubbed
//! from memory when the last reference to a record drops, and never
//! appear in `Debug` or serialized output.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::fmt;
use zeroize::Zeroizing;

use warden_crypto::{
    derive_session_key, Algorithm, AlgorithmFamily, KeyMaterial, SecurityLevel, SESSION_KEY_SIZE,
};

use crate::StoreError;

/// Anything kept in a table with an optional deadline.
pub trait Expiring {
    fn id(&self) -> &str;

    fn expires_at(&self) -> Option<DateTime<Utc>>;

    /// Expired once `now` reaches the deadline. No deadline, never expires.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(false, |exp| now >= exp)
    }
}

#[derive(Serialize)]
pub struct KeyPairRecord {
    pub key_id: String,
    /// Scheme that actually produced this key
    pub algorithm: Algorithm,
    /// Set only when a configured fallback stood in for the requested scheme
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_algorithm: Option<Algorithm>,
    pub security_level: SecurityLevel,
    #[serde(serialize_with = "hex::serialize")]
    pub public_key: Vec<u8>,
    #[serde(skip)]
    private_key: Zeroizing<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl KeyPairRecord {
    /// Build a record from fresh key material.
    ///
    /// A `lifetime` that is absent or not positive yields a non-expiring key,
    /// which keeps `expires_at > created_at` whenever a deadline exists.
    /// Fails if the deadline falls outside the representable date range.
    pub fn new(
        key_id: String,
        algorithm: Algorithm,
        security_level: SecurityLevel,
        material: KeyMaterial,
        created_at: DateTime<Utc>,
        lifetime: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let expires_at = match lifetime.filter(|d| *d > Duration::zero()) {
            Some(d) => Some(deadline(&key_id, created_at, d)?),
            None => None,
        };
        Ok(Self {
            key_id,
            algorithm,
            requested_algorithm: None,
            security_level,
            public_key: material.public_key,
            private_key: material.private_key,
            created_at,
            expires_at,
        })
    }

    pub fn with_requested_algorithm(mut self, requested: Algorithm) -> Self {
        if requested != self.algorithm {
            self.requested_algorithm = Some(requested);
        }
        self
    }

    /// Borrow the private key for the duration of one operation.
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    pub fn family(&self) -> AlgorithmFamily {
        self.algorithm.family()
    }
}

impl Expiring for KeyPairRecord {
    fn id(&self) -> &str {
        &self.key_id
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for KeyPairRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairRecord")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("requested_algorithm", &self.requested_algorithm)
            .field("security_level", &self.security_level)
            .field("public_key_len", &self.public_key.len())
            .field("private_key", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub algorithm: Algorithm,
    pub security_level: SecurityLevel,
    /// What a transport hands to the peer so it can decapsulate
    #[serde(serialize_with = "hex::serialize")]
    pub ciphertext: Vec<u8>,
    #[serde(skip)]
    kem_shared_secret: Secret<Vec<u8>>,
    #[serde(skip)]
    symmetric_key: Zeroizing<[u8; SESSION_KEY_SIZE]>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Build a session, deriving its symmetric key from the shared secret
    /// and the session id. The raw secret stays inside the record.
    pub fn new(
        session_id: String,
        algorithm: Algorithm,
        security_level: SecurityLevel,
        ciphertext: Vec<u8>,
        shared_secret: Zeroizing<Vec<u8>>,
        created_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<Self, StoreError> {
        let expires_at = deadline(&session_id, created_at, lifetime)?;
        let symmetric_key = derive_session_key(&shared_secret, &session_id);
        Ok(Self {
            session_id,
            algorithm,
            security_level,
            ciphertext,
            kem_shared_secret: Secret::new(shared_secret.to_vec()),
            symmetric_key,
            created_at,
            expires_at,
        })
    }

    /// 256-bit key for symmetric use by the caller.
    pub fn symmetric_key(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.symmetric_key
    }

    /// Recompute the session key from the stored secret and compare.
    pub fn key_binding_holds(&self) -> bool {
        let rederived = derive_session_key(self.kem_shared_secret.expose_secret(), &self.session_id);
        *rederived == *self.symmetric_key
    }
}

fn deadline(
    id: &str,
    created_at: DateTime<Utc>,
    lifetime: Duration,
) -> Result<DateTime<Utc>, StoreError> {
    created_at
        .checked_add_signed(lifetime)
        .ok_or_else(|| StoreError::LifetimeOutOfRange(id.to_string()))
}

impl Expiring for SessionRecord {
    fn id(&self) -> &str {
        &self.session_id
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        Some(self.expires_at)
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("session_id", &self.session_id)
            .field("algorithm", &self.algorithm)
            .field("security_level", &self.security_level)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("kem_shared_secret", &"[REDACTED]")
            .field("symmetric_key", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
