//! Volatile tables backed by a locked HashMap
//!
//! Nothing here survives a restart. A durable backend would implement the
//! same `KeyStore` / `SessionStore` contract on top of a key vault.

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::record::{Expiring, KeyPairRecord, SessionRecord};
use crate::{KeyStore, SessionStore, StoreError};

/// Id-keyed table of shared, immutable entries
pub struct MemoryTable<T> {
    entries: RwLock<HashMap<String, Arc<T>>>,
}

pub type MemoryKeyStore = MemoryTable<KeyPairRecord>;
pub type MemorySessionStore = MemoryTable<SessionRecord>;

impl<T> Default for MemoryTable<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Expiring> MemoryTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_entry(&self, entry: T) -> Result<Arc<T>, StoreError> {
        let mut entries = self.entries.write();
        if entries.contains_key(entry.id()) {
            return Err(StoreError::DuplicateId(entry.id().to_string()));
        }
        let entry = Arc::new(entry);
        entries.insert(entry.id().to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    fn get_entry(&self, id: &str) -> Option<Arc<T>> {
        self.entries.read().get(id).cloned()
    }

    /// Returns the entry if live; evicts it if expired.
    fn get_live_entry(&self, id: &str, now: DateTime<Utc>) -> Option<Arc<T>> {
        let entries = self.entries.upgradable_read();
        match entries.get(id) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(Arc::clone(entry)),
            Some(_) => {}
        }
        let mut entries = RwLockUpgradableReadGuard::upgrade(entries);
        entries.remove(id);
        debug!(id, "evicted expired entry on read");
        None
    }

    fn remove_entry(&self, id: &str) -> bool {
        self.entries.write().remove(id).is_some()
    }

    fn purge(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn count_live(&self, now: DateTime<Utc>) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    fn size(&self) -> usize {
        self.entries.read().len()
    }
}

impl KeyStore for MemoryTable<KeyPairRecord> {
    fn insert(&self, record: KeyPairRecord) -> Result<Arc<KeyPairRecord>, StoreError> {
        self.insert_entry(record)
    }

    fn get(&self, key_id: &str) -> Option<Arc<KeyPairRecord>> {
        self.get_entry(key_id)
    }

    fn remove(&self, key_id: &str) -> bool {
        self.remove_entry(key_id)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        self.purge(now)
    }

    fn count_active(&self, now: DateTime<Utc>) -> usize {
        self.count_live(now)
    }

    fn len(&self) -> usize {
        self.size()
    }
}

impl SessionStore for MemoryTable<SessionRecord> {
    fn insert(&self, record: SessionRecord) -> Result<Arc<SessionRecord>, StoreError> {
        self.insert_entry(record)
    }

    fn get(&self, session_id: &str) -> Option<Arc<SessionRecord>> {
        self.get_entry(session_id)
    }

    fn get_live(&self, session_id: &str, now: DateTime<Utc>) -> Option<Arc<SessionRecord>> {
        self.get_live_entry(session_id, now)
    }

    fn remove(&self, session_id: &str) -> bool {
        self.remove_entry(session_id)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        self.purge(now)
    }

    fn count_active(&self, now: DateTime<Utc>) -> usize {
        self.count_live(now)
    }

    fn len(&self) -> usize {
        self.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use warden_crypto::{Algorithm, KeyMaterial, SecurityLevel};
    use zeroize::Zeroizing;

    fn key(id: &str, now: DateTime<Utc>, lifetime: Option<Duration>) -> KeyPairRecord {
        KeyPairRecord::new(
            id.to_string(),
            Algorithm::Dilithium,
            SecurityLevel::Level3,
            KeyMaterial {
                public_key: vec![1; 4],
                private_key: Zeroizing::new(vec![2; 4]),
            },
            now,
            lifetime,
        )
        .unwrap()
    }

    fn session(id: &str, now: DateTime<Utc>) -> SessionRecord {
        SessionRecord::new(
            id.to_string(),
            Algorithm::Kyber,
            SecurityLevel::Level3,
            vec![3; 4],
            Zeroizing::new(vec![4; 32]),
            now,
            Duration::hours(24),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_get_remove() {
        let store = MemoryKeyStore::new();
        let now = Utc::now();
        store.insert(key("pqk_a", now, None)).unwrap();

        assert_eq!(store.get("pqk_a").unwrap().key_id, "pqk_a");
        assert!(store.get("pqk_b").is_none());
        assert!(store.remove("pqk_a"));
        assert!(!store.remove("pqk_a"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = MemoryKeyStore::new();
        let now = Utc::now();
        store.insert(key("pqk_a", now, None)).unwrap();
        let err = store.insert(key("pqk_a", now, None)).unwrap_err();
        assert_eq!(err, StoreError::DuplicateId("pqk_a".into()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_key_get_ignores_expiry() {
        let store = MemoryKeyStore::new();
        let now = Utc::now();
        store.insert(key("pqk_a", now, Some(Duration::days(1)))).unwrap();
        let later = now + Duration::days(2);
        assert!(store.get("pqk_a").is_some());
        assert_eq!(store.count_active(later), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_purge_is_idempotent() {
        let store = MemoryKeyStore::new();
        let now = Utc::now();
        store.insert(key("pqk_short", now, Some(Duration::days(1)))).unwrap();
        store.insert(key("pqk_long", now, Some(Duration::days(30)))).unwrap();
        store.insert(key("pqk_forever", now, None)).unwrap();

        let later = now + Duration::days(2);
        assert_eq!(store.purge_expired(later), 1);
        assert_eq!(store.purge_expired(later), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_session_read_evicts_expired() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        store.insert(session("pqs_a", now)).unwrap();

        assert!(store.get_live("pqs_a", now + Duration::hours(1)).is_some());
        assert!(store.get_live("pqs_a", now + Duration::hours(25)).is_none());
        // gone for good, not just hidden
        assert!(store.get("pqs_a").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_concurrent_inserts() {
        let store = Arc::new(MemorySessionStore::new());
        let now = Utc::now();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.insert(session(&format!("pqs_{t}_{i}"), now)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.count_active(now), 400);
    }
}
