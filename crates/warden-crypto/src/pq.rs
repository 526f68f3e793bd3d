//! Post-quantum cryptography primitives
//!
//! Using the pqcrypto bindings to the NIST reference implementations:
//! - Kyber (ML-KEM, FIPS 203) - Key Encapsulation
//! - Dilithium (ML-DSA, FIPS 204) - Digital Signatures
//! - SPHINCS+ (SLH-DSA, FIPS 205) - Stateless Hash-Based Signatures
//!
//! Each scheme is exposed as a table of parameter sets, one per NIST
//! security level. Key lengths differ between levels, which lets the
//! providers recover the level from an encoded key.

use crate::provider::ProviderError;

fn check_len(what: &'static str, bytes: &[u8], expected: usize) -> Result<(), ProviderError> {
    if bytes.len() != expected {
        return Err(ProviderError::InvalidLength {
            what,
            len: bytes.len(),
        });
    }
    Ok(())
}

pub mod sign {
    //! Digital signatures (Dilithium, SPHINCS+)

    use pqcrypto_dilithium::{dilithium2, dilithium3, dilithium5};
    use pqcrypto_sphincsplus::{
        sphincsshake128fsimple, sphincsshake192fsimple, sphincsshake256fsimple,
    };
    use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};
    use tracing::debug;
    use zeroize::Zeroizing;

    use super::check_len;
    use crate::algorithm::{Algorithm, SecurityLevel};
    use crate::provider::{AlgorithmProvider, KeyMaterial, ProviderError, SignatureProvider};

    /// One parameter set of a signature scheme
    #[derive(Clone, Copy)]
    struct Scheme {
        level: SecurityLevel,
        public_key_bytes: usize,
        secret_key_bytes: usize,
        keypair: fn() -> KeyMaterial,
        sign: fn(&[u8], &[u8]) -> Result<Vec<u8>, ProviderError>,
        verify: fn(&[u8], &[u8], &[u8]) -> Result<bool, ProviderError>,
    }

    macro_rules! scheme {
        ($level:expr, $m:ident) => {
            Scheme {
                level: $level,
                public_key_bytes: $m::public_key_bytes(),
                secret_key_bytes: $m::secret_key_bytes(),
                keypair: || {
                    let (pk, sk) = $m::keypair();
                    KeyMaterial {
                        public_key: pk.as_bytes().to_vec(),
                        private_key: Zeroizing::new(sk.as_bytes().to_vec()),
                    }
                },
                sign: |secret_key, message| {
                    let sk = $m::SecretKey::from_bytes(secret_key)
                        .map_err(|_| ProviderError::Malformed("private key"))?;
                    Ok($m::detached_sign(message, &sk).as_bytes().to_vec())
                },
                verify: |public_key, message, signature| {
                    let pk = $m::PublicKey::from_bytes(public_key)
                        .map_err(|_| ProviderError::Malformed("public key"))?;
                    let sig = $m::DetachedSignature::from_bytes(signature)
                        .map_err(|_| ProviderError::Malformed("signature"))?;
                    Ok($m::verify_detached_signature(&sig, message, &pk).is_ok())
                },
            }
        };
    }

    /// Signature provider backed by one pqcrypto scheme family
    pub struct PqSignatureProvider {
        algorithm: Algorithm,
        schemes: Vec<Scheme>,
    }

    /// CRYSTALS-Dilithium 2 / 3 / 5
    pub fn dilithium() -> PqSignatureProvider {
        PqSignatureProvider {
            algorithm: Algorithm::Dilithium,
            schemes: vec![
                scheme!(SecurityLevel::Level1, dilithium2),
                scheme!(SecurityLevel::Level3, dilithium3),
                scheme!(SecurityLevel::Level5, dilithium5),
            ],
        }
    }

    /// SPHINCS+-SHAKE "fast, simple" parameter sets
    pub fn sphincs_plus() -> PqSignatureProvider {
        PqSignatureProvider {
            algorithm: Algorithm::SphincsPlus,
            schemes: vec![
                scheme!(SecurityLevel::Level1, sphincsshake128fsimple),
                scheme!(SecurityLevel::Level3, sphincsshake192fsimple),
                scheme!(SecurityLevel::Level5, sphincsshake256fsimple),
            ],
        }
    }

    impl PqSignatureProvider {
        fn scheme(&self, level: SecurityLevel) -> Result<&Scheme, ProviderError> {
            self.schemes
                .iter()
                .find(|s| s.level == level)
                .ok_or(ProviderError::LevelUnavailable {
                    algorithm: self.algorithm,
                    level,
                })
        }
    }

    impl AlgorithmProvider for PqSignatureProvider {
        fn algorithm(&self) -> Algorithm {
            self.algorithm
        }

        fn levels(&self) -> Vec<SecurityLevel> {
            self.schemes.iter().map(|s| s.level).collect()
        }

        fn keygen(&self, level: SecurityLevel) -> Result<KeyMaterial, ProviderError> {
            let scheme = self.scheme(level)?;
            let material = (scheme.keypair)();
            debug!(algorithm = %self.algorithm, %level, "signature key pair generated");
            Ok(material)
        }

        fn level_for_public_key(&self, public_key: &[u8]) -> Option<SecurityLevel> {
            self.schemes
                .iter()
                .find(|s| s.public_key_bytes == public_key.len())
                .map(|s| s.level)
        }

        fn level_for_private_key(&self, private_key: &[u8]) -> Option<SecurityLevel> {
            self.schemes
                .iter()
                .find(|s| s.secret_key_bytes == private_key.len())
                .map(|s| s.level)
        }
    }

    impl SignatureProvider for PqSignatureProvider {
        fn sign(
            &self,
            level: SecurityLevel,
            private_key: &[u8],
            message: &[u8],
        ) -> Result<Vec<u8>, ProviderError> {
            let scheme = self.scheme(level)?;
            check_len("private key", private_key, scheme.secret_key_bytes)?;
            (scheme.sign)(private_key, message)
        }

        fn verify(
            &self,
            level: SecurityLevel,
            public_key: &[u8],
            message: &[u8],
            signature: &[u8],
        ) -> Result<bool, ProviderError> {
            let scheme = self.scheme(level)?;
            check_len("public key", public_key, scheme.public_key_bytes)?;
            (scheme.verify)(public_key, message, signature)
        }
    }

}

pub mod kem {
    //! Key Encapsulation Mechanism (Kyber)

    use pqcrypto_kyber::{kyber1024, kyber512, kyber768};
    use pqcrypto_traits::kem::{
        Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
    };
    use tracing::debug;
    use zeroize::Zeroizing;

    use super::check_len;
    use crate::algorithm::{Algorithm, SecurityLevel};
    use crate::provider::{
        AlgorithmProvider, Encapsulation, KemProvider, KeyMaterial, ProviderError,
    };

    #[derive(Clone, Copy)]
    struct Scheme {
        level: SecurityLevel,
        public_key_bytes: usize,
        secret_key_bytes: usize,
        ciphertext_bytes: usize,
        keypair: fn() -> KeyMaterial,
        encapsulate: fn(&[u8]) -> Result<Encapsulation, ProviderError>,
        decapsulate: fn(&[u8], &[u8]) -> Result<Zeroizing<Vec<u8>>, ProviderError>,
    }

    macro_rules! scheme {
        ($level:expr, $m:ident) => {
            Scheme {
                level: $level,
                public_key_bytes: $m::public_key_bytes(),
                secret_key_bytes: $m::secret_key_bytes(),
                ciphertext_bytes: $m::ciphertext_bytes(),
                keypair: || {
                    let (pk, sk) = $m::keypair();
                    KeyMaterial {
                        public_key: pk.as_bytes().to_vec(),
                        private_key: Zeroizing::new(sk.as_bytes().to_vec()),
                    }
                },
                encapsulate: |public_key| {
                    let pk = $m::PublicKey::from_bytes(public_key)
                        .map_err(|_| ProviderError::Malformed("public key"))?;
                    let (ss, ct) = $m::encapsulate(&pk);
                    Ok(Encapsulation {
                        ciphertext: ct.as_bytes().to_vec(),
                        shared_secret: Zeroizing::new(ss.as_bytes().to_vec()),
                    })
                },
                decapsulate: |ciphertext, secret_key| {
                    let ct = $m::Ciphertext::from_bytes(ciphertext)
                        .map_err(|_| ProviderError::Malformed("ciphertext"))?;
                    let sk = $m::SecretKey::from_bytes(secret_key)
                        .map_err(|_| ProviderError::Malformed("private key"))?;
                    let ss = $m::decapsulate(&ct, &sk);
                    Ok(Zeroizing::new(ss.as_bytes().to_vec()))
                },
            }
        };
    }

    /// KEM provider backed by one pqcrypto scheme family
    pub struct PqKemProvider {
        algorithm: Algorithm,
        schemes: Vec<Scheme>,
    }

    /// CRYSTALS-Kyber 512 / 768 / 1024
    pub fn kyber() -> PqKemProvider {
        PqKemProvider {
            algorithm: Algorithm::Kyber,
            schemes: vec![
                scheme!(SecurityLevel::Level1, kyber512),
                scheme!(SecurityLevel::Level3, kyber768),
                scheme!(SecurityLevel::Level5, kyber1024),
            ],
        }
    }

    impl PqKemProvider {
        fn scheme(&self, level: SecurityLevel) -> Result<&Scheme, ProviderError> {
            self.schemes
                .iter()
                .find(|s| s.level == level)
                .ok_or(ProviderError::LevelUnavailable {
                    algorithm: self.algorithm,
                    level,
                })
        }
    }

    impl AlgorithmProvider for PqKemProvider {
        fn algorithm(&self) -> Algorithm {
            self.algorithm
        }

        fn levels(&self) -> Vec<SecurityLevel> {
            self.schemes.iter().map(|s| s.level).collect()
        }

        fn keygen(&self, level: SecurityLevel) -> Result<KeyMaterial, ProviderError> {
            let scheme = self.scheme(level)?;
            let material = (scheme.keypair)();
            debug!(algorithm = %self.algorithm, %level, "kem key pair generated");
            Ok(material)
        }

        fn level_for_public_key(&self, public_key: &[u8]) -> Option<SecurityLevel> {
            self.schemes
                .iter()
                .find(|s| s.public_key_bytes == public_key.len())
                .map(|s| s.level)
        }

        fn level_for_private_key(&self, private_key: &[u8]) -> Option<SecurityLevel> {
            self.schemes
                .iter()
                .find(|s| s.secret_key_bytes == private_key.len())
                .map(|s| s.level)
        }
    }

    impl KemProvider for PqKemProvider {
        fn encapsulate(
            &self,
            level: SecurityLevel,
            public_key: &[u8],
        ) -> Result<Encapsulation, ProviderError> {
            let scheme = self.scheme(level)?;
            check_len("public key", public_key, scheme.public_key_bytes)?;
            (scheme.encapsulate)(public_key)
        }

        fn decapsulate(
            &self,
            level: SecurityLevel,
            ciphertext: &[u8],
            private_key: &[u8],
        ) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
            let scheme = self.scheme(level)?;
            check_len("ciphertext", ciphertext, scheme.ciphertext_bytes)?;
            check_len("private key", private_key, scheme.secret_key_bytes)?;
            (scheme.decapsulate)(ciphertext, private_key)
        }
    }

}
