//! Warden Crypto - Post-quantum algorithm layer
//!
//! This crate provides:
//! - Kyber (ML-KEM) key encapsulation
//! - Dilithium (ML-DSA) digital signatures
//! - SPHINCS+ (SLH-DSA) stateless signatures
//! - A registry mapping algorithms to providers
//! - SHAKE256 session key derivation
//! - ChaCha20-Poly1305 session payload protection
//!
//! Nothing here keeps state; key and session tables live in `warden-store`.

pub mod algorithm;
pub mod cipher;
pub mod ids;
pub mod kdf;
pub mod pq;
pub mod provider;
pub mod registry;

pub use algorithm::{Algorithm, AlgorithmFamily, ParseError, SecurityLevel};
pub use cipher::CipherError;
pub use kdf::{derive_session_key, SESSION_KEY_SIZE};
pub use provider::{
    AlgorithmProvider, Encapsulation, KemProvider, KeyMaterial, ProviderError, SignatureProvider,
};
pub use registry::ProviderRegistry;
