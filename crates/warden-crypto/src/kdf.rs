//! Session key derivation
//!
//! symmetric_key = SHAKE256(shared_secret || context || len(session_id) || session_id)
//! truncated to 32 bytes. Binding the session id means the same shared
//! secret never yields the same key for two sessions.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use zeroize::Zeroizing;

/// 256-bit session key
pub const SESSION_KEY_SIZE: usize = 32;

const SESSION_KEY_CONTEXT: &[u8] = b"warden/session-key/v1";

pub fn derive_session_key(
    shared_secret: &[u8],
    session_id: &str,
) -> Zeroizing<[u8; SESSION_KEY_SIZE]> {
    let mut xof = Shake256::default();
    xof.update(shared_secret);
    xof.update(SESSION_KEY_CONTEXT);
    xof.update(&(session_id.len() as u64).to_be_bytes());
    xof.update(session_id.as_bytes());

    let mut key = Zeroizing::new([0u8; SESSION_KEY_SIZE]);
    xof.finalize_xof().read(key.as_mut());
    key
}
