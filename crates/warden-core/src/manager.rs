//! Quantum security manager
//!
//! Orchestrates providers, key and session tables, the clock and the audit
//! sink. Every dependency is injected, so tests build isolated instances.
//!
//! Error policy: generation, signing and KEM failures propagate as
//! `SecurityError`; verification always resolves to a boolean.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use warden_crypto::{
    cipher, ids, Algorithm, AlgorithmFamily, Encapsulation, KemProvider, ProviderError,
    ProviderRegistry, SecurityLevel, SignatureProvider,
};
use warden_store::{
    Expiring, KeyPairRecord, KeyStore, MemoryKeyStore, MemorySessionStore, SessionRecord,
    SessionStore,
};

use crate::audit::{events, AuditEvent, AuditSink, Severity, TracingAuditSink};
use crate::clock::{Clock, SystemClock};
use crate::config::ManagerConfig;
use crate::error::{EntryKind, Result, SecurityError, Stage};
use crate::types::{CleanupReport, SecurityMetrics, SignatureResult};

pub struct QuantumSecurityManager {
    config: ManagerConfig,
    registry: ProviderRegistry,
    keys: Arc<dyn KeyStore>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    /// Held exclusively by `cleanup`, shared by `get_metrics`, so a metrics
    /// snapshot never lands between the key purge and the session purge.
    maintenance: RwLock<()>,
}

/// Assembles a manager; anything not set gets the volatile default.
#[derive(Default)]
pub struct ManagerBuilder {
    config: Option<ManagerConfig>,
    registry: Option<ProviderRegistry>,
    keys: Option<Arc<dyn KeyStore>>,
    sessions: Option<Arc<dyn SessionStore>>,
    clock: Option<Arc<dyn Clock>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl ManagerBuilder {
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn key_store(mut self, keys: Arc<dyn KeyStore>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn build(self) -> Result<QuantumSecurityManager> {
        let config = self.config.unwrap_or_default();
        let registry = self.registry.unwrap_or_else(ProviderRegistry::with_defaults);
        config.validate(&registry)?;

        info!(
            algorithms = ?registry.supported(),
            default_level = %config.default_security_level,
            "quantum security manager ready"
        );

        Ok(QuantumSecurityManager {
            config,
            registry,
            keys: self.keys.unwrap_or_else(|| Arc::new(MemoryKeyStore::new())),
            sessions: self
                .sessions
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            audit: self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink)),
            maintenance: RwLock::new(()),
        })
    }
}

impl QuantumSecurityManager {
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::default()
    }

    /// Manager with the given config and every other dependency defaulted.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    // ---- keys ----------------------------------------------------------

    /// Generate and store a key pair. `None` uses the configured default level.
    ///
    /// The returned record includes the private key; callers must not
    /// persist it anywhere else.
    pub fn generate_key_pair(
        &self,
        algorithm: Algorithm,
        security_level: Option<SecurityLevel>,
    ) -> Result<Arc<KeyPairRecord>> {
        let level = security_level.unwrap_or(self.config.default_security_level);
        let actual = self.resolve(algorithm, Stage::KeyGeneration)?;

        let material = match actual.family() {
            AlgorithmFamily::Signature => self.signer(actual, Stage::KeyGeneration)?.keygen(level),
            AlgorithmFamily::Kem => self.kem(actual, Stage::KeyGeneration)?.keygen(level),
        }
        .map_err(|source| provider_failure(Stage::KeyGeneration, actual, source))?;

        let key_id = ids::new_key_id()
            .map_err(|source| provider_failure(Stage::KeyGeneration, actual, source))?;
        let now = self.clock.now();
        let record = KeyPairRecord::new(
            key_id,
            actual,
            level,
            material,
            now,
            self.config.key_lifetime(),
        )?
        .with_requested_algorithm(algorithm);

        let record = self.keys.insert(record)?;

        info!(key_id = %record.key_id, algorithm = %actual, %level, "generated key pair");
        self.report(
            AuditEvent::new(events::KEY_GENERATED, Severity::Info, now)
                .with_detail("key_id", &record.key_id)
                .with_detail("algorithm", actual)
                .with_detail("security_level", level),
        );
        Ok(record)
    }

    /// Plain lookup; does not check expiry.
    pub fn get_key_pair(&self, key_id: &str) -> Option<Arc<KeyPairRecord>> {
        self.keys.get(key_id)
    }

    pub fn revoke_key(&self, key_id: &str) -> bool {
        let removed = self.keys.remove(key_id);
        if removed {
            info!(key_id, "revoked key");
            self.report(
                AuditEvent::new(events::KEY_REVOKED, Severity::Info, self.clock.now())
                    .with_detail("key_id", key_id),
            );
        }
        removed
    }

    // ---- signatures ----------------------------------------------------

    pub fn sign(&self, message: &[u8], key_id: &str) -> Result<SignatureResult> {
        let result = self.try_sign(message, key_id);
        if let Err(err) = &result {
            warn!(key_id, error = %err, "signing failed");
            self.report(
                AuditEvent::new(events::SIGNING_FAILED, Severity::Warning, self.clock.now())
                    .with_detail("key_id", key_id)
                    .with_detail("reason", err),
            );
        }
        result
    }

    fn try_sign(&self, message: &[u8], key_id: &str) -> Result<SignatureResult> {
        let now = self.clock.now();
        let record = self.live_key(key_id, now)?;
        let signer = self.signer(record.algorithm, Stage::Signing)?;

        let signature = signer
            .sign(record.security_level, record.private_key(), message)
            .map_err(|source| provider_failure(Stage::Signing, record.algorithm, source))?;

        debug!(key_id, algorithm = %record.algorithm, "signed message");
        Ok(SignatureResult {
            signature,
            algorithm: record.algorithm,
            security_level: record.security_level,
            key_id: record.key_id.clone(),
            timestamp: now,
            message: message.to_vec(),
        })
    }

    /// Check `signature` against `public_key`. Any failure, including a
    /// panicking provider, is reported as `false`.
    pub fn verify(&self, signature: &SignatureResult, public_key: &[u8]) -> bool {
        let Some(signer) = self.registry.signer(signature.algorithm) else {
            debug!(algorithm = %signature.algorithm, "no provider to verify with");
            return false;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            signer.verify(
                signature.security_level,
                public_key,
                &signature.message,
                &signature.signature,
            )
        }));

        match outcome {
            Ok(Ok(valid)) => valid,
            Ok(Err(err)) => {
                debug!(error = %err, "verification input rejected");
                false
            }
            Err(_) => {
                warn!(algorithm = %signature.algorithm, "provider panicked during verification");
                false
            }
        }
    }

    // ---- raw KEM -------------------------------------------------------

    /// Encapsulate to `public_key`; the level is taken from the key length.
    pub fn encapsulate(&self, public_key: &[u8], algorithm: Algorithm) -> Result<Encapsulation> {
        let kem = self.kem(algorithm, Stage::Encapsulation)?;
        let level = kem.level_for_public_key(public_key).ok_or_else(|| {
            provider_failure(
                Stage::Encapsulation,
                algorithm,
                ProviderError::InvalidLength {
                    what: "public key",
                    len: public_key.len(),
                },
            )
        })?;
        kem.encapsulate(level, public_key)
            .map_err(|source| provider_failure(Stage::Encapsulation, algorithm, source))
    }

    pub fn decapsulate(
        &self,
        private_key: &[u8],
        ciphertext: &[u8],
        algorithm: Algorithm,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let kem = self.kem(algorithm, Stage::Decapsulation)?;
        let level = kem.level_for_private_key(private_key).ok_or_else(|| {
            provider_failure(
                Stage::Decapsulation,
                algorithm,
                ProviderError::InvalidLength {
                    what: "private key",
                    len: private_key.len(),
                },
            )
        })?;
        kem.decapsulate(level, ciphertext, private_key)
            .map_err(|source| provider_failure(Stage::Decapsulation, algorithm, source))
    }

    // ---- sessions ------------------------------------------------------

    /// Initiator side: encapsulate to the peer, derive the session key and
    /// store the session. The record's `ciphertext` is what a transport
    /// would deliver to the peer.
    ///
    /// `algorithm` defaults to the configured KEM. When `security_level`
    /// is omitted it is read off the peer key; when given it must match it.
    pub fn establish_session(
        &self,
        peer_public_key: &[u8],
        algorithm: Option<Algorithm>,
        security_level: Option<SecurityLevel>,
    ) -> Result<Arc<SessionRecord>> {
        let algorithm = algorithm.unwrap_or(self.config.default_kem);
        let result = self.try_establish(peer_public_key, algorithm, security_level);
        match &result {
            Ok(session) => {
                info!(session_id = %session.session_id, algorithm = %session.algorithm, "established session");
                self.report(
                    AuditEvent::new(events::SESSION_ESTABLISHED, Severity::Info, session.created_at)
                        .with_detail("session_id", &session.session_id)
                        .with_detail("algorithm", session.algorithm)
                        .with_detail("security_level", session.security_level)
                        .with_detail("expires_at", session.expires_at.to_rfc3339()),
                );
            }
            Err(err) => {
                warn!(%algorithm, error = %err, "session establishment failed");
                self.report(
                    AuditEvent::new(events::SESSION_FAILED, Severity::Warning, self.clock.now())
                        .with_detail("algorithm", algorithm)
                        .with_detail("reason", err),
                );
            }
        }
        result
    }

    fn try_establish(
        &self,
        peer_public_key: &[u8],
        algorithm: Algorithm,
        security_level: Option<SecurityLevel>,
    ) -> Result<Arc<SessionRecord>> {
        let stage = Stage::SessionEstablishment;
        let actual = self.resolve(algorithm, stage)?;
        let kem = self.kem(actual, stage)?;

        let level = match security_level {
            Some(level) => level,
            None => kem.level_for_public_key(peer_public_key).ok_or_else(|| {
                provider_failure(
                    stage,
                    actual,
                    ProviderError::InvalidLength {
                        what: "public key",
                        len: peer_public_key.len(),
                    },
                )
            })?,
        };

        let session_id =
            ids::new_session_id().map_err(|source| provider_failure(stage, actual, source))?;
        let Encapsulation {
            ciphertext,
            shared_secret,
        } = kem
            .encapsulate(level, peer_public_key)
            .map_err(|source| provider_failure(stage, actual, source))?;

        let record = SessionRecord::new(
            session_id,
            actual,
            level,
            ciphertext,
            shared_secret,
            self.clock.now(),
            self.config.session_lifetime(),
        )?;
        Ok(self.sessions.insert(record)?)
    }

    /// Responder side: decapsulate the initiator's ciphertext with a stored
    /// KEM key and register the session under the initiator's id, so both
    /// parties end up holding the same symmetric key.
    pub fn accept_session(
        &self,
        session_id: &str,
        ciphertext: &[u8],
        key_id: &str,
    ) -> Result<Arc<SessionRecord>> {
        let stage = Stage::SessionAcceptance;
        let now = self.clock.now();
        let key = self.live_key(key_id, now)?;
        let kem = self.kem(key.algorithm, stage)?;

        let shared_secret = kem
            .decapsulate(key.security_level, ciphertext, key.private_key())
            .map_err(|source| provider_failure(stage, key.algorithm, source))?;

        let record = SessionRecord::new(
            session_id.to_string(),
            key.algorithm,
            key.security_level,
            ciphertext.to_vec(),
            shared_secret,
            now,
            self.config.session_lifetime(),
        )?;
        let session = self.sessions.insert(record)?;

        info!(session_id, key_id, "accepted session");
        self.report(
            AuditEvent::new(events::SESSION_ACCEPTED, Severity::Info, now)
                .with_detail("session_id", session_id)
                .with_detail("key_id", key_id)
                .with_detail("algorithm", key.algorithm),
        );
        Ok(session)
    }

    /// Read-triggers-cleanup: a session past its deadline is evicted by
    /// this call and reported as absent, even if nobody asked before.
    pub fn get_session(&self, session_id: &str) -> Option<Arc<SessionRecord>> {
        self.sessions.get_live(session_id, self.clock.now())
    }

    pub fn revoke_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id);
        if removed {
            info!(session_id, "revoked session");
            self.report(
                AuditEvent::new(events::SESSION_REVOKED, Severity::Info, self.clock.now())
                    .with_detail("session_id", session_id),
            );
        }
        removed
    }

    /// Encrypt a payload under a live session's key.
    pub fn seal(&self, session_id: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let session = self.live_session(session_id)?;
        Ok(cipher::seal(
            session.symmetric_key(),
            &session.session_id,
            plaintext,
        )?)
    }

    pub fn open(&self, session_id: &str, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let session = self.live_session(session_id)?;
        Ok(cipher::open(session.symmetric_key(), &session.session_id, sealed)?)
    }

    // ---- lifecycle -----------------------------------------------------

    /// Purge expired keys and sessions as of now. Both tables are purged
    /// as one step with respect to `get_metrics` and other `cleanup` calls.
    pub fn cleanup(&self) -> CleanupReport {
        let now = self.clock.now();
        let report = {
            let _guard = self.maintenance.write();
            CleanupReport {
                keys_removed: self.keys.purge_expired(now),
                sessions_removed: self.sessions.purge_expired(now),
            }
        };

        if report.total() > 0 {
            info!(
                keys = report.keys_removed,
                sessions = report.sessions_removed,
                "purged expired material"
            );
            self.report(
                AuditEvent::new(events::EXPIRED_MATERIAL_PURGED, Severity::Info, now)
                    .with_detail("keys_removed", report.keys_removed)
                    .with_detail("sessions_removed", report.sessions_removed),
            );
        } else {
            debug!("cleanup found nothing to purge");
        }
        report
    }

    pub fn get_metrics(&self) -> SecurityMetrics {
        let _guard = self.maintenance.read();
        let now = self.clock.now();
        SecurityMetrics {
            active_keys: self.keys.count_active(now),
            active_sessions: self.sessions.count_active(now),
            supported_algorithms: self.registry.supported(),
            // every registered scheme is post-quantum; there is no classical path
            quantum_resistant: true,
        }
    }

    // ---- helpers -------------------------------------------------------

    /// Pick the provider algorithm for a request, applying a configured
    /// fallback loudly or failing closed.
    fn resolve(&self, requested: Algorithm, stage: Stage) -> Result<Algorithm> {
        if self.has_provider(requested) {
            return Ok(requested);
        }

        match self.config.fallbacks.get(&requested).copied() {
            Some(substitute)
                if substitute.family() == requested.family() && self.has_provider(substitute) =>
            {
                warn!(
                    %requested,
                    %substitute,
                    %stage,
                    "no native provider; substituting configured fallback"
                );
                self.report(
                    AuditEvent::new(events::ALGORITHM_SUBSTITUTED, Severity::Warning, self.clock.now())
                        .with_detail("requested", requested)
                        .with_detail("actual", substitute)
                        .with_detail("stage", stage),
                );
                Ok(substitute)
            }
            _ => Err(SecurityError::UnsupportedAlgorithm {
                algorithm: requested,
                stage,
            }),
        }
    }

    fn has_provider(&self, algorithm: Algorithm) -> bool {
        match algorithm.family() {
            AlgorithmFamily::Signature => self.registry.signer(algorithm).is_some(),
            AlgorithmFamily::Kem => self.registry.kem(algorithm).is_some(),
        }
    }

    fn signer(&self, algorithm: Algorithm, stage: Stage) -> Result<Arc<dyn SignatureProvider>> {
        self.registry
            .signer(algorithm)
            .ok_or(SecurityError::UnsupportedAlgorithm { algorithm, stage })
    }

    fn kem(&self, algorithm: Algorithm, stage: Stage) -> Result<Arc<dyn KemProvider>> {
        self.registry
            .kem(algorithm)
            .ok_or(SecurityError::UnsupportedAlgorithm { algorithm, stage })
    }

    fn live_key(&self, key_id: &str, now: DateTime<Utc>) -> Result<Arc<KeyPairRecord>> {
        let record = self
            .keys
            .get(key_id)
            .ok_or_else(|| SecurityError::key_not_found(key_id))?;
        if record.is_expired(now) {
            return Err(SecurityError::Expired {
                kind: EntryKind::Key,
                id: key_id.to_string(),
            });
        }
        Ok(record)
    }

    fn live_session(&self, session_id: &str) -> Result<Arc<SessionRecord>> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SecurityError::session_not_found(session_id))?;
        if session.is_expired(self.clock.now()) {
            self.sessions.remove(session_id);
            return Err(SecurityError::Expired {
                kind: EntryKind::Session,
                id: session_id.to_string(),
            });
        }
        Ok(session)
    }

    fn report(&self, event: AuditEvent) {
        self.audit.record(event);
    }
}

fn provider_failure(stage: Stage, algorithm: Algorithm, source: ProviderError) -> SecurityError {
    SecurityError::ProviderFailure {
        stage,
        algorithm,
        source,
    }
}
