//! Provider contracts
//!
//! A provider wraps exactly one primitive. The manager never touches
//! key bytes except to hand them to the provider that owns the scheme.

use thiserror::Error;
use zeroize::Zeroizing;

use crate::algorithm::{Algorithm, SecurityLevel};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Invalid {what} length: {len} bytes")]
    InvalidLength { what: &'static str, len: usize },

    #[error("Security level {level} is not available for {algorithm}")]
    LevelUnavailable {
        algorithm: Algorithm,
        level: SecurityLevel,
    },

    #[error("Malformed {0}")]
    Malformed(&'static str),

    #[error("System randomness unavailable")]
    Randomness,

    #[error("Primitive failure: {0}")]
    Primitive(String),
}

/// Freshly generated key pair. Private bytes are scrubbed on drop.
pub struct KeyMaterial {
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

/// Output of a KEM encapsulation
pub struct Encapsulation {
    /// Sent to the holder of the private key
    pub ciphertext: Vec<u8>,
    pub shared_secret: Zeroizing<Vec<u8>>,
}

/// Behaviour shared by every provider.
pub trait AlgorithmProvider: Send + Sync {
    /// The scheme this provider implements.
    fn algorithm(&self) -> Algorithm;

    /// Levels this provider can generate keys for.
    fn levels(&self) -> Vec<SecurityLevel>;

    fn keygen(&self, level: SecurityLevel) -> Result<KeyMaterial, ProviderError>;

    /// Map an encoded public key back to the level that produced it.
    fn level_for_public_key(&self, public_key: &[u8]) -> Option<SecurityLevel>;

    /// Map an encoded private key back to the level that produced it.
    fn level_for_private_key(&self, private_key: &[u8]) -> Option<SecurityLevel>;
}

pub trait SignatureProvider: AlgorithmProvider {
    fn sign(
        &self,
        level: SecurityLevel,
        private_key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, ProviderError>;

    /// `Ok(false)` for a well-formed signature that does not verify,
    /// `Err` when the inputs cannot even be decoded.
    fn verify(
        &self,
        level: SecurityLevel,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, ProviderError>;
}

pub trait KemProvider: AlgorithmProvider {
    fn encapsulate(
        &self,
        level: SecurityLevel,
        public_key: &[u8],
    ) -> Result<Encapsulation, ProviderError>;

    fn decapsulate(
        &self,
        level: SecurityLevel,
        ciphertext: &[u8],
        private_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, ProviderError>;
}
