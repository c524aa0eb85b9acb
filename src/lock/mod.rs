//! Advisory exclusivity lock for a vault path.
//!
//! A session owns `<vault>` while the sibling marker `<vault>.lck` exists
//! and carries the session's token.  Creation uses create-if-absent
//! semantics, so of any number of concurrent `acquire` calls exactly one
//! wins.  The marker is a cooperative guard only; the vault's
//! authenticated encryption is what protects the data.
//!
//! Stale markers (left behind by a crash) are never removed automatically.
//! The `Locked` error tells the user which file to delete.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::crypto::kdf::fill_random;
use crate::errors::{CaskError, Result};

/// Suffix appended to the vault path to form the marker path.
pub const LOCK_SUFFIX: &str = ".lck";

/// Path of the lock marker guarding `vault_path`.
pub fn marker_path(vault_path: &Path) -> PathBuf {
    let mut marker = OsString::from(vault_path.as_os_str());
    marker.push(LOCK_SUFFIX);
    PathBuf::from(marker)
}

/// A held lock on one vault path.
///
/// `release` is idempotent and only ever removes a marker that still
/// carries this lock's token.  Dropping a held lock releases it on a
/// best-effort basis.
#[derive(Debug)]
pub struct FileLock {
    vault_path: PathBuf,
    marker: PathBuf,
    token: String,
    held: bool,
}

impl FileLock {
    /// Take the lock for `vault_path`, failing with `Locked` if any
    /// marker already exists.
    pub fn acquire(vault_path: &Path) -> Result<Self> {
        let marker = marker_path(vault_path);
        let token = new_token()?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(&marker) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!(marker = %marker.display(), "lock marker already present");
                return Err(CaskError::Locked(vault_path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        // The marker exists now; if stamping it fails, take it back down.
        if let Err(e) = file.write_all(token.as_bytes()).and_then(|()| file.sync_all()) {
            let _ = fs::remove_file(&marker);
            return Err(e.into());
        }

        tracing::debug!(marker = %marker.display(), "lock acquired");

        Ok(Self {
            vault_path: vault_path.to_path_buf(),
            marker,
            token,
            held: true,
        })
    }

    /// Confirm the marker on disk is still ours.
    ///
    /// Called right before a save commits, so a session whose marker was
    /// removed (or replaced by another session) never overwrites the vault.
    pub fn verify(&self) -> Result<()> {
        if !self.held {
            return Err(CaskError::LockLost(self.vault_path.clone()));
        }
        match fs::read_to_string(&self.marker) {
            Ok(content) if content == self.token => Ok(()),
            Ok(_) => Err(CaskError::LockLost(self.vault_path.clone())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(CaskError::LockLost(self.vault_path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the marker.  Releasing an already-released lock is a no-op.
    pub fn release(&mut self) -> Result<()> {
        if !self.held {
            return Ok(());
        }
        self.held = false;

        match fs::read_to_string(&self.marker) {
            Ok(content) if content == self.token => match fs::remove_file(&self.marker) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
            Ok(_) => {
                tracing::warn!(
                    marker = %self.marker.display(),
                    "lock marker belongs to another session, leaving it in place"
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(marker = %self.marker.display(), "lock released");
        Ok(())
    }

    /// The vault path this lock guards.
    pub fn vault_path(&self) -> &Path {
        &self.vault_path
    }

    /// `true` until `release` has run.
    pub fn is_held(&self) -> bool {
        self.held
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "failed to release lock on drop");
        }
    }
}

/// Owner token: process id plus 64 random bits, so two sessions in the
/// same process still get distinct tokens.
fn new_token() -> Result<String> {
    let mut nonce = [0u8; 8];
    fill_random(&mut nonce)?;
    let hex: String = nonce.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("{}:{hex}", std::process::id()))
}
