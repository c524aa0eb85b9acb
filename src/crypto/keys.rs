//! The in-memory vault key.

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf::KEY_LEN;

/// A wrapper around the 32-byte derived key that zeroes its memory when
/// dropped or explicitly wiped.
///
/// Use this to hold the key in memory so it cannot linger after the
/// vault is closed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
}

impl VaultKey {
    /// Create a new `VaultKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to pass to the cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Constant-time comparison against candidate key bytes.
    pub fn matches(&self, other: &[u8; KEY_LEN]) -> bool {
        self.bytes.ct_eq(other).into()
    }

    /// `true` once the key has been wiped.
    pub fn is_wiped(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(..)")
    }
}
