//! Binary vault file format and atomic persistence.
//!
//! A `.cask` file has this layout (all integers little-endian):
//!
//! ```text
//! [CASK: 4][version: u16][memory_kib: u32][iterations: u32][parallelism: u32]
//! [salt: 32][nonce: 12][ciphertext + 16-byte GCM tag]
//! ```
//!
//! - **Magic** (`CASK`) and **version** identify the format.
//! - The **Argon2 params** and **salt** are what the key is derived from.
//! - The **nonce** is regenerated on every save.
//! - The whole fixed header is passed to AES-GCM as associated data, so a
//!   change to any header byte fails authentication just like a change to
//!   the ciphertext.
//!
//! The plaintext is the JSON-serialized `Payload`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::entry::Entry;
use crate::crypto::{self, Argon2Params, VaultKey, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::errors::{CaskError, Result};
use crate::lock::FileLock;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"CASK";

/// Current binary format version.
pub const CURRENT_VERSION: u16 = 1;

/// Size of the fixed header: magic + version + 3 KDF params + salt + nonce.
pub const HEADER_LEN: usize = 4 + 2 + 4 + 4 + 4 + SALT_LEN + NONCE_LEN;

// ---------------------------------------------------------------------------
// VaultHeader
// ---------------------------------------------------------------------------

/// The unencrypted (but authenticated) header of a vault file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHeader {
    pub format_version: u16,
    pub kdf: Argon2Params,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
}

impl VaultHeader {
    /// Serialize into the fixed on-disk layout.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..6].copy_from_slice(&self.format_version.to_le_bytes());
        buf[6..10].copy_from_slice(&self.kdf.memory_kib.to_le_bytes());
        buf[10..14].copy_from_slice(&self.kdf.iterations.to_le_bytes());
        buf[14..18].copy_from_slice(&self.kdf.parallelism.to_le_bytes());
        buf[18..18 + SALT_LEN].copy_from_slice(&self.salt);
        buf[18 + SALT_LEN..].copy_from_slice(&self.nonce);
        buf
    }

    /// Parse the fixed header from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(CaskError::CorruptFormat(
                "file too small to be a valid vault".into(),
            ));
        }
        if &data[0..4] != MAGIC {
            return Err(CaskError::CorruptFormat("missing CASK magic bytes".into()));
        }

        let format_version = u16::from_le_bytes([data[4], data[5]]);
        if format_version != CURRENT_VERSION {
            return Err(CaskError::CorruptFormat(format!(
                "unsupported version {format_version}, expected {CURRENT_VERSION}"
            )));
        }

        let kdf = Argon2Params {
            memory_kib: read_u32(data, 6),
            iterations: read_u32(data, 10),
            parallelism: read_u32(data, 14),
        };

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&data[18..18 + SALT_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&data[18 + SALT_LEN..HEADER_LEN]);

        Ok(Self {
            format_version,
            kdf,
            salt,
            nonce,
        })
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The decrypted contents of a vault file.
#[derive(Debug, Deserialize)]
pub struct Payload {
    /// Vault-wide mutation counter.
    pub version: u64,
    /// When the vault was first created.
    pub created_at: DateTime<Utc>,
    /// All entries, tombstones included, sorted by location.
    pub entries: Vec<Entry>,
}

/// Borrowing twin of `Payload` used when saving, so serializing never
/// makes extra copies of the secrets.
#[derive(Serialize)]
pub struct PayloadRef<'a> {
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<&'a Entry>,
}

// ---------------------------------------------------------------------------
// Seal / open
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` into a complete vault file image.
///
/// A fresh nonce is drawn on every call; the key and salt are reused.
pub fn seal_file(
    key: &VaultKey,
    kdf: &Argon2Params,
    salt: &[u8; SALT_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let header = VaultHeader {
        format_version: CURRENT_VERSION,
        kdf: *kdf,
        salt: *salt,
        nonce: crypto::generate_nonce()?,
    };
    let header_bytes = header.to_bytes();

    let sealed = crypto::seal(key.as_bytes(), &header.nonce, plaintext, &header_bytes)?;

    let mut buf = Vec::with_capacity(HEADER_LEN + sealed.len());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&sealed);
    Ok(buf)
}

/// A vault file that has been authenticated and decrypted.
pub struct OpenedFile {
    pub header: VaultHeader,
    pub key: VaultKey,
    pub plaintext: Zeroizing<Vec<u8>>,
}

/// Parse, derive the key and decrypt a vault file image.
///
/// A wrong passphrase and a tampered file are indistinguishable here:
/// both come back as `UnableToOpen`.
pub fn open_file(data: &[u8], passphrase: &[u8]) -> Result<OpenedFile> {
    let header = VaultHeader::parse(data)?;
    if data.len() < HEADER_LEN + TAG_LEN {
        return Err(CaskError::CorruptFormat("ciphertext is truncated".into()));
    }

    // Out-of-range KDF params can only come from a modified header.
    if header.kdf.validate().is_err() {
        return Err(CaskError::UnableToOpen);
    }

    let key = VaultKey::new(crypto::derive_key(passphrase, &header.salt, &header.kdf)?);

    let (header_bytes, sealed) = data.split_at(HEADER_LEN);
    let plaintext = match crypto::open(key.as_bytes(), &header.nonce, sealed, header_bytes) {
        Ok(p) => Zeroizing::new(p),
        Err(CaskError::AuthenticationFailed) => return Err(CaskError::UnableToOpen),
        Err(e) => return Err(e),
    };

    Ok(OpenedFile {
        header,
        key,
        plaintext,
    })
}

// ---------------------------------------------------------------------------
// Disk I/O
// ---------------------------------------------------------------------------

/// Read a whole vault file.
pub fn read_vault(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(CaskError::VaultNotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}

/// Write a vault file to disk **atomically**.
///
/// 1. Write the image to a fresh temp file in the same directory.
/// 2. Flush it to stable storage.
/// 3. Re-check that `lock` is still ours.
/// 4. Rename the temp file over the target path.
///
/// On any failure the temp file is removed and the previous vault file is
/// left untouched.
pub fn write_vault(path: &Path, image: &[u8], lock: &FileLock) -> Result<()> {
    let tmp_path = temp_path_for(path)?;

    let result = write_temp(&tmp_path, image)
        .and_then(|()| lock.verify())
        .and_then(|()| fs::rename(&tmp_path, path).map_err(CaskError::from));

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    sync_parent_dir(path);
    Ok(())
}

/// Build a unique temp path next to `path`.
///
/// The temp file is in the same directory so rename is guaranteed to be
/// atomic on the same filesystem.
fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut suffix = [0u8; 6];
    crate::crypto::kdf::fill_random(&mut suffix)?;
    let suffix: String = suffix.iter().map(|b| format!("{b:02x}")).collect();

    Ok(parent.join(format!(
        ".{}.{suffix}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    )))
}

fn write_temp(tmp_path: &Path, image: &[u8]) -> Result<()> {
    // Create the file with restrictive permissions atomically (no TOCTOU race).
    #[cfg(unix)]
    let mut file = {
        use std::os::unix::fs::OpenOptionsExt;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(tmp_path)?
    };

    #[cfg(not(unix))]
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp_path)?;

    file.write_all(image)?;
    file.sync_all()?;
    Ok(())
}

/// Persist the rename itself.  Best effort: not every platform lets us
/// open a directory for syncing.
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
            tracing::debug!(error = %e, "could not fsync vault directory");
        }
    }

    #[cfg(not(unix))]
    let _ = path;
}
