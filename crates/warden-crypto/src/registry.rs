//! Algorithm → provider registry
//!
//! Adding a scheme means registering a provider here; callers dispatch
//! through the registry and never match on the algorithm themselves.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::algorithm::Algorithm;
use crate::pq;
use crate::provider::{KemProvider, SignatureProvider};

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    signers: BTreeMap<Algorithm, Arc<dyn SignatureProvider>>,
    kems: BTreeMap<Algorithm, Arc<dyn KemProvider>>,
}

impl ProviderRegistry {
    /// Empty registry; every lookup fails closed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every scheme the pqcrypto stack provides natively.
    ///
    /// Falcon is deliberately absent: requesting it fails unless a
    /// fallback is configured by the caller.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_signer(Arc::new(pq::sign::dilithium()));
        registry.register_signer(Arc::new(pq::sign::sphincs_plus()));
        registry.register_kem(Arc::new(pq::kem::kyber()));
        registry
    }

    /// Register a signature provider under its own algorithm, returning
    /// any provider it replaced.
    pub fn register_signer(
        &mut self,
        provider: Arc<dyn SignatureProvider>,
    ) -> Option<Arc<dyn SignatureProvider>> {
        let algorithm = provider.algorithm();
        debug!(%algorithm, "registering signature provider");
        self.signers.insert(algorithm, provider)
    }

    pub fn register_kem(&mut self, provider: Arc<dyn KemProvider>) -> Option<Arc<dyn KemProvider>> {
        let algorithm = provider.algorithm();
        debug!(%algorithm, "registering kem provider");
        self.kems.insert(algorithm, provider)
    }

    pub fn signer(&self, algorithm: Algorithm) -> Option<Arc<dyn SignatureProvider>> {
        self.signers.get(&algorithm).cloned()
    }

    pub fn kem(&self, algorithm: Algorithm) -> Option<Arc<dyn KemProvider>> {
        self.kems.get(&algorithm).cloned()
    }

    pub fn supports(&self, algorithm: Algorithm) -> bool {
        self.signers.contains_key(&algorithm) || self.kems.contains_key(&algorithm)
    }

    pub fn signature_algorithms(&self) -> Vec<Algorithm> {
        self.signers.keys().copied().collect()
    }

    pub fn kem_algorithms(&self) -> Vec<Algorithm> {
        self.kems.keys().copied().collect()
    }

    /// Every registered algorithm, sorted.
    pub fn supported(&self) -> Vec<Algorithm> {
        let mut all: Vec<Algorithm> = self
            .signers
            .keys()
            .chain(self.kems.keys())
            .copied()
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("signers", &self.signature_algorithms())
            .field("kems", &self.kem_algorithms())
            .finish()
    }
}
