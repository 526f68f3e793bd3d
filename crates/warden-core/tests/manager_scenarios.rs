//! End-to-end behaviour of the manager with injected collaborators.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;
use zeroize::Zeroizing;

use warden_core::audit::events;
use warden_core::{
    Algorithm, ManagerConfig, ManualClock, MemoryAuditSink, QuantumSecurityManager,
    SecurityError, SecurityLevel,
};
use warden_crypto::{
    AlgorithmProvider, Encapsulation, KemProvider, KeyMaterial, ProviderError, ProviderRegistry,
    SignatureProvider,
};
use warden_store::{KeyPairRecord, KeyStore, MemoryKeyStore};

/// Cheap stand-in signer: the "signature" is the key followed by the message.
struct EchoSigner {
    algorithm: Algorithm,
    counter: AtomicU64,
}

impl EchoSigner {
    fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            counter: AtomicU64::new(0),
        }
    }
}

impl AlgorithmProvider for EchoSigner {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn levels(&self) -> Vec<SecurityLevel> {
        SecurityLevel::ALL.to_vec()
    }

    fn keygen(&self, _level: SecurityLevel) -> Result<KeyMaterial, ProviderError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed).to_be_bytes().to_vec();
        Ok(KeyMaterial {
            public_key: n.clone(),
            private_key: Zeroizing::new(n),
        })
    }

    fn level_for_public_key(&self, _public_key: &[u8]) -> Option<SecurityLevel> {
        Some(SecurityLevel::Level1)
    }

    fn level_for_private_key(&self, _private_key: &[u8]) -> Option<SecurityLevel> {
        Some(SecurityLevel::Level1)
    }
}

impl SignatureProvider for EchoSigner {
    fn sign(
        &self,
        _level: SecurityLevel,
        private_key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        Ok([private_key, message].concat())
    }

    fn verify(
        &self,
        _level: SecurityLevel,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, ProviderError> {
        Ok(signature == [public_key, message].concat().as_slice())
    }
}

/// Signer whose verification blows up.
struct PanickingSigner;

impl AlgorithmProvider for PanickingSigner {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Falcon
    }

    fn levels(&self) -> Vec<SecurityLevel> {
        vec![SecurityLevel::Level1]
    }

    fn keygen(&self, _level: SecurityLevel) -> Result<KeyMaterial, ProviderError> {
        Ok(KeyMaterial {
            public_key: vec![1],
            private_key: Zeroizing::new(vec![2]),
        })
    }

    fn level_for_public_key(&self, _public_key: &[u8]) -> Option<SecurityLevel> {
        Some(SecurityLevel::Level1)
    }

    fn level_for_private_key(&self, _private_key: &[u8]) -> Option<SecurityLevel> {
        Some(SecurityLevel::Level1)
    }
}

impl SignatureProvider for PanickingSigner {
    fn sign(
        &self,
        _level: SecurityLevel,
        _private_key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        Ok(message.to_vec())
    }

    fn verify(
        &self,
        _level: SecurityLevel,
        _public_key: &[u8],
        _message: &[u8],
        _signature: &[u8],
    ) -> Result<bool, ProviderError> {
        panic!("verifier exploded")
    }
}

/// KEM whose shared secret is the public key itself.
struct MirrorKem;

impl AlgorithmProvider for MirrorKem {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Kyber
    }

    fn levels(&self) -> Vec<SecurityLevel> {
        SecurityLevel::ALL.to_vec()
    }

    fn keygen(&self, _level: SecurityLevel) -> Result<KeyMaterial, ProviderError> {
        Ok(KeyMaterial {
            public_key: vec![7; 16],
            private_key: Zeroizing::new(vec![7; 16]),
        })
    }

    fn level_for_public_key(&self, _public_key: &[u8]) -> Option<SecurityLevel> {
        Some(SecurityLevel::Level3)
    }

    fn level_for_private_key(&self, _private_key: &[u8]) -> Option<SecurityLevel> {
        Some(SecurityLevel::Level3)
    }
}

impl KemProvider for MirrorKem {
    fn encapsulate(
        &self,
        _level: SecurityLevel,
        public_key: &[u8],
    ) -> Result<Encapsulation, ProviderError> {
        Ok(Encapsulation {
            ciphertext: public_key.to_vec(),
            shared_secret: Zeroizing::new(public_key.to_vec()),
        })
    }

    fn decapsulate(
        &self,
        _level: SecurityLevel,
        ciphertext: &[u8],
        _private_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
        Ok(Zeroizing::new(ciphertext.to_vec()))
    }
}

fn fake_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register_signer(Arc::new(EchoSigner::new(Algorithm::Falcon)));
    registry.register_kem(Arc::new(MirrorKem));
    registry
}

fn manager_with_clock(clock: Arc<ManualClock>) -> QuantumSecurityManager {
    QuantumSecurityManager::builder()
        .clock(clock)
        .build()
        .unwrap()
}

#[test]
fn test_signature_scenario_level_three() {
    let manager = QuantumSecurityManager::new(ManagerConfig::default()).unwrap();
    let key = manager
        .generate_key_pair(Algorithm::Dilithium, Some(SecurityLevel::Level3))
        .unwrap();

    let sig = manager.sign(b"hello", &key.key_id).unwrap();
    assert!(manager.verify(&sig, &key.public_key));

    let stranger = manager
        .generate_key_pair(Algorithm::Dilithium, Some(SecurityLevel::Level3))
        .unwrap();
    assert!(!manager.verify(&sig, &stranger.public_key));
}

#[test]
fn test_session_scenario_cleanup_restores_count() {
    let clock = Arc::new(ManualClock::starting_now());
    let manager = manager_with_clock(clock.clone());
    let key = manager
        .generate_key_pair(Algorithm::Kyber, Some(SecurityLevel::Level3))
        .unwrap();

    let before = manager.get_metrics().active_sessions;
    let session = manager
        .establish_session(&key.public_key, Some(Algorithm::Kyber), None)
        .unwrap();
    assert_eq!(manager.get_metrics().active_sessions, before + 1);

    clock.advance(Duration::hours(24) + Duration::seconds(1));
    let report = manager.cleanup();
    assert_eq!(report.sessions_removed, 1);
    assert_eq!(manager.get_metrics().active_sessions, before);
    assert!(manager.get_session(&session.session_id).is_none());
}

#[test]
fn test_every_signature_scheme_round_trips() {
    let manager = QuantumSecurityManager::new(ManagerConfig::default()).unwrap();
    for algorithm in manager.registry().signature_algorithms() {
        let key = manager
            .generate_key_pair(algorithm, Some(SecurityLevel::Level1))
            .unwrap();
        let sig = manager.sign(b"round trip", &key.key_id).unwrap();
        assert!(manager.verify(&sig, &key.public_key), "{}", algorithm);

        let mut altered = sig.clone();
        altered.message.push(b'!');
        assert!(!manager.verify(&altered, &key.public_key), "{}", algorithm);
    }
}

#[test]
fn test_every_kem_level_agrees() {
    let manager = QuantumSecurityManager::new(ManagerConfig::default()).unwrap();
    for level in SecurityLevel::ALL {
        let key = manager.generate_key_pair(Algorithm::Kyber, Some(level)).unwrap();
        let enc = manager.encapsulate(&key.public_key, Algorithm::Kyber).unwrap();
        let secret = manager
            .decapsulate(key.private_key(), &enc.ciphertext, Algorithm::Kyber)
            .unwrap();
        assert_eq!(secret.as_slice(), enc.shared_secret.as_slice(), "{}", level);
    }
}

#[test]
fn test_key_ids_unique() {
    let manager = QuantumSecurityManager::builder()
        .registry(fake_registry())
        .build()
        .unwrap();

    let ids: HashSet<String> = (0..10_000)
        .map(|_| {
            manager
                .generate_key_pair(Algorithm::Falcon, Some(SecurityLevel::Level1))
                .unwrap()
                .key_id
                .clone()
        })
        .collect();
    assert_eq!(ids.len(), 10_000);
    assert_eq!(manager.get_metrics().active_keys, 10_000);
}

#[test]
fn test_session_ids_unique() {
    let manager = QuantumSecurityManager::builder()
        .registry(fake_registry())
        .build()
        .unwrap();

    let ids: HashSet<String> = (0..10_000)
        .map(|_| {
            manager
                .establish_session(&[7; 16], None, None)
                .unwrap()
                .session_id
                .clone()
        })
        .collect();
    assert_eq!(ids.len(), 10_000);
}

#[test]
fn test_past_deadline_key_is_expired_not_missing() {
    let keys = Arc::new(MemoryKeyStore::new());
    let manager = QuantumSecurityManager::builder()
        .registry(fake_registry())
        .key_store(keys.clone())
        .build()
        .unwrap();

    let material = KeyMaterial {
        public_key: vec![1, 2, 3],
        private_key: Zeroizing::new(vec![1, 2, 3]),
    };
    let created = Utc::now() - Duration::days(30);
    let stale = KeyPairRecord::new(
        "pqk_stale".to_string(),
        Algorithm::Falcon,
        SecurityLevel::Level1,
        material,
        created,
        Some(Duration::days(1)),
    )
    .unwrap();
    keys.insert(stale).unwrap();

    let err = manager.sign(b"late", "pqk_stale").unwrap_err();
    assert!(matches!(err, SecurityError::Expired { .. }), "{:?}", err);
    assert!(manager.sign(b"late", "pqk_unknown").unwrap_err().is_not_found());
}

#[test]
fn test_cleanup_is_idempotent() {
    let clock = Arc::new(ManualClock::starting_now());
    let config = ManagerConfig {
        key_lifetime_days: 1,
        ..Default::default()
    };
    let manager = QuantumSecurityManager::builder()
        .config(config)
        .registry(fake_registry())
        .clock(clock.clone())
        .build()
        .unwrap();

    for _ in 0..3 {
        manager
            .generate_key_pair(Algorithm::Falcon, None)
            .unwrap();
        manager.establish_session(&[7; 16], None, None).unwrap();
    }
    clock.advance(Duration::days(2));

    let first = manager.cleanup();
    assert_eq!(first.keys_removed, 3);
    assert_eq!(first.sessions_removed, 3);

    let second = manager.cleanup();
    assert_eq!(second.total(), 0);
}

#[test]
fn test_non_expiring_keys() {
    let clock = Arc::new(ManualClock::starting_now());
    let config = ManagerConfig {
        key_lifetime_days: 0,
        ..Default::default()
    };
    let manager = QuantumSecurityManager::builder()
        .config(config)
        .registry(fake_registry())
        .clock(clock.clone())
        .build()
        .unwrap();

    let key = manager.generate_key_pair(Algorithm::Falcon, None).unwrap();
    assert!(key.expires_at.is_none());

    clock.advance(Duration::days(10_000));
    assert_eq!(manager.cleanup().keys_removed, 0);
    assert!(manager.sign(b"still here", &key.key_id).is_ok());
}

#[test]
fn test_verify_survives_panicking_provider() {
    let mut registry = ProviderRegistry::new();
    registry.register_signer(Arc::new(PanickingSigner));
    registry.register_kem(Arc::new(MirrorKem));
    let manager = QuantumSecurityManager::builder()
        .registry(registry)
        .build()
        .unwrap();

    let key = manager.generate_key_pair(Algorithm::Falcon, None).unwrap();
    let sig = manager.sign(b"boom", &key.key_id).unwrap();
    assert!(!manager.verify(&sig, &key.public_key));
}

#[test]
fn test_verify_with_unregistered_algorithm() {
    let manager = QuantumSecurityManager::builder()
        .registry(fake_registry())
        .build()
        .unwrap();
    let key = manager.generate_key_pair(Algorithm::Falcon, None).unwrap();
    let mut sig = manager.sign(b"m", &key.key_id).unwrap();
    sig.algorithm = Algorithm::SphincsPlus;
    assert!(!manager.verify(&sig, &key.public_key));
}

#[test]
fn test_two_parties_share_session_key() {
    let alice = QuantumSecurityManager::new(ManagerConfig::default()).unwrap();
    let bob = QuantumSecurityManager::new(ManagerConfig::default()).unwrap();

    let bob_key = bob.generate_key_pair(Algorithm::Kyber, None).unwrap();
    let outbound = alice
        .establish_session(&bob_key.public_key, None, None)
        .unwrap();
    let inbound = bob
        .accept_session(&outbound.session_id, &outbound.ciphertext, &bob_key.key_id)
        .unwrap();

    assert_eq!(outbound.symmetric_key(), inbound.symmetric_key());
    assert!(outbound.key_binding_holds());

    let sealed = bob.seal(&inbound.session_id, b"reply").unwrap();
    assert_eq!(alice.open(&outbound.session_id, &sealed).unwrap().as_slice(), b"reply");

    // a different session id never decrypts the same payload
    let other = alice
        .establish_session(&bob_key.public_key, None, None)
        .unwrap();
    assert!(alice.open(&other.session_id, &sealed).is_err());
}

#[test]
fn test_audit_trail_for_session_lifecycle() {
    let audit = Arc::new(MemoryAuditSink::new());
    let manager = QuantumSecurityManager::builder()
        .registry(fake_registry())
        .audit_sink(audit.clone())
        .build()
        .unwrap();

    let session = manager.establish_session(&[7; 16], None, None).unwrap();
    assert!(manager.revoke_session(&session.session_id));
    assert!(manager
        .establish_session(&[7; 16], Some(Algorithm::Dilithium), None)
        .is_err());

    assert_eq!(
        audit.names(),
        vec![
            events::SESSION_ESTABLISHED,
            events::SESSION_REVOKED,
            events::SESSION_FAILED
        ]
    );
}

#[test]
fn test_concurrent_generate_revoke_cleanup() {
    const THREADS: usize = 8;
    const KEYS_PER_THREAD: usize = 50;
    const SESSIONS_PER_THREAD: usize = 10;

    let clock = Arc::new(ManualClock::starting_now());
    let config = ManagerConfig {
        key_lifetime_days: 1,
        ..Default::default()
    };
    let manager = Arc::new(
        QuantumSecurityManager::builder()
            .config(config)
            .registry(fake_registry())
            .clock(clock.clone())
            .build()
            .unwrap(),
    );

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || {
                let mut revoked = 0;
                for i in 0..KEYS_PER_THREAD {
                    let key = manager.generate_key_pair(Algorithm::Falcon, None).unwrap();
                    if i % 2 == 0 && manager.revoke_key(&key.key_id) {
                        revoked += 1;
                    }
                    if i < SESSIONS_PER_THREAD {
                        manager.establish_session(&[7; 16], None, None).unwrap();
                    }
                    // nothing has expired yet
                    assert_eq!(manager.cleanup().total(), 0);
                }
                revoked
            })
        })
        .collect();
    let revoked: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

    let kept = THREADS * KEYS_PER_THREAD - revoked;
    assert_eq!(revoked, THREADS * KEYS_PER_THREAD / 2);
    let metrics = manager.get_metrics();
    assert_eq!(metrics.active_keys, kept);
    assert_eq!(metrics.active_sessions, THREADS * SESSIONS_PER_THREAD);

    clock.advance(Duration::days(2));
    let sweepers: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || {
                let report = manager.cleanup();
                let metrics = manager.get_metrics();
                assert_eq!(metrics.active_keys, 0);
                assert_eq!(metrics.active_sessions, 0);
                report
            })
        })
        .collect();
    let (keys_removed, sessions_removed) = sweepers
        .into_iter()
        .map(|s| s.join().unwrap())
        .fold((0, 0), |(k, s), r| (k + r.keys_removed, s + r.sessions_removed));

    assert_eq!(keys_removed, kept);
    assert_eq!(sessions_removed, THREADS * SESSIONS_PER_THREAD);
    assert_eq!(manager.cleanup().total(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_altered_message_never_verifies(
        message in proptest::collection::vec(any::<u8>(), 0..256),
        flip in any::<usize>(),
        bit in 0u8..8,
    ) {
        let manager = QuantumSecurityManager::new(ManagerConfig::default()).unwrap();
        let key = manager
            .generate_key_pair(Algorithm::Dilithium, Some(SecurityLevel::Level1))
            .unwrap();
        let sig = manager.sign(&message, &key.key_id).unwrap();
        prop_assert!(manager.verify(&sig, &key.public_key));

        let mut altered = sig.clone();
        if altered.message.is_empty() {
            altered.message.push(1 << bit);
        } else {
            let idx = flip % altered.message.len();
            altered.message[idx] ^= 1 << bit;
        }
        prop_assert!(!manager.verify(&altered, &key.public_key));
    }
}
