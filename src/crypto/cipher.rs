//! AES-256-GCM authenticated encryption with associated data.
//!
//! Unlike a nonce-prefixing helper, the caller owns the nonce here: the
//! vault file stores it in its header, and the header bytes themselves are
//! passed as associated data so any change to them fails authentication.
//!
//! Output of `seal`:
//!   [ ciphertext | 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

use super::kdf::fill_random;
use crate::errors::{CaskError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Generate a fresh random nonce.  Call once per encryption.
pub fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    fill_random(&mut nonce)?;
    Ok(nonce)
}

/// Encrypt and authenticate `plaintext`, binding `aad` to the result.
pub fn seal(key: &[u8], nonce: &[u8; NONCE_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CaskError::EncryptionFailed(format!("invalid key length: {e}")))?;

    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|e| CaskError::EncryptionFailed(format!("encryption error: {e}")))
}

/// Verify the tag and decrypt.
///
/// Any bit flip, truncation, wrong key or mismatched `aad` yields
/// `AuthenticationFailed`; no plaintext is ever returned in that case.
pub fn open(key: &[u8], nonce: &[u8; NONCE_LEN], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < TAG_LEN {
        return Err(CaskError::AuthenticationFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CaskError::AuthenticationFailed)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad })
        .map_err(|_| CaskError::AuthenticationFailed)
}
