//! Random identifiers for keys and sessions

use ring::rand::{SecureRandom, SystemRandom};

use crate::provider::ProviderError;

pub const KEY_ID_PREFIX: &str = "pqk_";
pub const SESSION_ID_PREFIX: &str = "pqs_";

/// 128 bits from the OS CSPRNG
const ID_ENTROPY_BYTES: usize = 16;

fn random_id(prefix: &str) -> Result<String, ProviderError> {
    let mut bytes = [0u8; ID_ENTROPY_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| ProviderError::Randomness)?;
    Ok(format!("{}{}", prefix, hex::encode(bytes)))
}

pub fn new_key_id() -> Result<String, ProviderError> {
    random_id(KEY_ID_PREFIX)
}

pub fn new_session_id() -> Result<String, ProviderError> {
    random_id(SESSION_ID_PREFIX)
}
