//! Algorithm identifiers and NIST security levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Invalid security level {0} (expected 1, 3 or 5)")]
    InvalidSecurityLevel(String),
}

/// What an algorithm is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmFamily {
    Signature,
    Kem,
}

impl fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => write!(f, "signature"),
            Self::Kem => write!(f, "kem"),
        }
    }
}

/// Post-quantum schemes the manager knows how to name.
///
/// Naming an algorithm here does not mean a provider exists for it;
/// availability is decided by the `ProviderRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// CRYSTALS-Dilithium (ML-DSA), lattice-based signatures
    Dilithium,
    /// Falcon, compact lattice-based signatures
    Falcon,
    /// SPHINCS+ (SLH-DSA), stateless hash-based signatures
    SphincsPlus,
    /// CRYSTALS-Kyber (ML-KEM), lattice-based key encapsulation
    Kyber,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Dilithium,
        Algorithm::Falcon,
        Algorithm::SphincsPlus,
        Algorithm::Kyber,
    ];

    pub fn family(&self) -> AlgorithmFamily {
        match self {
            Self::Dilithium | Self::Falcon | Self::SphincsPlus => AlgorithmFamily::Signature,
            Self::Kyber => AlgorithmFamily::Kem,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dilithium => "dilithium",
            Self::Falcon => "falcon",
            Self::SphincsPlus => "sphincs-plus",
            Self::Kyber => "kyber",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dilithium" | "ml-dsa" | "mldsa" => Ok(Self::Dilithium),
            "falcon" | "fn-dsa" => Ok(Self::Falcon),
            "sphincs-plus" | "sphincs+" | "sphincsplus" | "slh-dsa" => Ok(Self::SphincsPlus),
            "kyber" | "ml-kem" | "mlkem" => Ok(Self::Kyber),
            _ => Err(ParseError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// NIST security category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SecurityLevel {
    /// 128-bit classical equivalent
    Level1 = 1,
    /// 192-bit classical equivalent
    Level3 = 3,
    /// 256-bit classical equivalent
    Level5 = 5,
}

impl SecurityLevel {
    pub const ALL: [SecurityLevel; 3] = [
        SecurityLevel::Level1,
        SecurityLevel::Level3,
        SecurityLevel::Level5,
    ];

    pub fn classical_bits(&self) -> u16 {
        match self {
            Self::Level1 => 128,
            Self::Level3 => 192,
            Self::Level5 => 256,
        }
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        Self::Level3
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Level1),
            3 => Ok(Self::Level3),
            5 => Ok(Self::Level5),
            other => Err(ParseError::InvalidSecurityLevel(other.to_string())),
        }
    }
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> Self {
        level as u8
    }
}

impl FromStr for SecurityLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidSecurityLevel(s.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}
