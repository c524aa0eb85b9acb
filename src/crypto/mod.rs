//! Cryptographic primitives for Cask.
//!
//! This module provides:
//! - AES-256-GCM seal/open with associated data (`cipher`)
//! - Argon2id passphrase-based key derivation (`kdf`)
//! - The zeroizing in-memory key wrapper (`keys`)

pub mod cipher;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive_key, ...};
pub use cipher::{generate_nonce, open, seal, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, generate_salt, Argon2Params, KEY_LEN, SALT_LEN};
pub use keys::VaultKey;
