//! ChaCha20-Poly1305 session payload protection
//!
//! Payloads are sealed under a session's derived key with the session id
//! as associated data, so a sealed payload cannot be replayed into a
//! different session even if the keys were somehow equal.
//!
//! Wire format: nonce || ciphertext || tag

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::kdf::SESSION_KEY_SIZE;

/// 96-bit nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;
/// Poly1305 tag (16 bytes)
pub const TAG_SIZE: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed - data may be corrupted or tampered")]
    DecryptionFailed,

    #[error("Sealed payload too short: {0} bytes")]
    Truncated(usize),
}

/// Encrypt `plaintext` for the session identified by `session_id`.
pub fn seal(
    key: &[u8; SESSION_KEY_SIZE],
    session_id: &str,
    plaintext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: session_id.as_bytes(),
            },
        )
        .map_err(|_| CipherError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a payload produced by [`seal`] for the same session.
pub fn open(
    key: &[u8; SESSION_KEY_SIZE],
    session_id: &str,
    sealed: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CipherError::Truncated(sealed.len()));
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);

    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad: session_id.as_bytes(),
            },
        )
        .map_err(|_| CipherError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}
