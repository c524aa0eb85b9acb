//! The in-memory vault: entries, versioning and key material.
//!
//! `Vault` wraps the binary format layer and the crypto layer so that the
//! session and its commands can work with simple method calls like
//! `vault.add("bank", "s3cr3t", meta)`.  Nothing here touches disk except
//! `open`, `create` (lock only) and `save`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{derive_key, generate_salt, Argon2Params, VaultKey, SALT_LEN};
use crate::errors::{CaskError, Result};
use crate::lock::FileLock;

use super::entry::{scrub_all, Entry, EntrySummary};
use super::format::{self, Payload, PayloadRef};

/// Longest accepted location name.
const MAX_LOCATION_LEN: usize = 256;

/// The main vault handle.  Create one with `Vault::new`, `Vault::create`
/// or `Vault::open`, then use its methods to manage entries.
pub struct Vault {
    /// Every entry by location, tombstones included.
    pub(super) entries: BTreeMap<String, Entry>,

    /// Vault-wide mutation counter.
    pub(super) version: u64,

    /// When this vault was first created.
    created_at: DateTime<Utc>,

    /// Argon2 salt (persisted, never secret).
    salt: [u8; SALT_LEN],

    /// Argon2 params the key was derived with.
    kdf: Argon2Params,

    /// The derived key (zeroized on close and on drop).
    key: VaultKey,

    /// Exclusive lock on the vault path, once one is known.
    lock: Option<FileLock>,

    closed: bool,
}

impl Vault {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create an empty vault in memory.
    ///
    /// Generates a random salt and derives the key from the passphrase.
    /// Nothing is written until `save` is called.
    pub fn new(passphrase: &[u8], params: &Argon2Params) -> Result<Self> {
        let salt = generate_salt()?;
        let mut key_bytes = derive_key(passphrase, &salt, params)?;
        let key = VaultKey::new(key_bytes);
        key_bytes.zeroize();

        Ok(Self {
            entries: BTreeMap::new(),
            version: 0,
            created_at: Utc::now(),
            salt,
            kdf: *params,
            key,
            lock: None,
            closed: false,
        })
    }

    /// Create an empty vault destined for `path` and take its lock.
    ///
    /// Fails if a vault file already exists there.  The caller decides
    /// when to `save`.
    pub fn create(path: &Path, passphrase: &[u8], params: &Argon2Params) -> Result<Self> {
        if path.exists() {
            return Err(CaskError::VaultAlreadyExists(path.to_path_buf()));
        }

        let lock = FileLock::acquire(path)?;
        let mut vault = Self::new(passphrase, params)?;
        vault.lock = Some(lock);

        tracing::info!(path = %path.display(), "vault created");
        Ok(vault)
    }

    /// Open an existing vault file.
    ///
    /// Takes the lock first (so a second session fails fast with `Locked`
    /// before paying for key derivation), then reads, derives and
    /// authenticates.  If anything after the lock fails, the lock is
    /// released again on the way out.
    pub fn open(path: &Path, passphrase: &[u8]) -> Result<Self> {
        if !path.exists() {
            return Err(CaskError::VaultNotFound(path.to_path_buf()));
        }

        // 1. Exclusive access.
        let lock = FileLock::acquire(path)?;

        // 2. Read, derive and authenticate.
        let data = format::read_vault(path)?;
        let opened = format::open_file(&data, passphrase).map_err(|e| {
            tracing::debug!(path = %path.display(), "vault failed to open");
            e
        })?;

        // 3. Deserialize.  The tag already vouched for these bytes, so a
        //    parse failure means a format bug rather than tampering.
        let payload: Payload = serde_json::from_slice(&opened.plaintext)
            .map_err(|e| CaskError::CorruptFormat(format!("payload JSON: {e}")))?;

        let mut entries = BTreeMap::new();
        for entry in payload.entries {
            let location = entry.location.clone();
            if entries.insert(location.clone(), entry).is_some() {
                return Err(CaskError::CorruptFormat(format!(
                    "duplicate location '{location}' in payload"
                )));
            }
        }

        tracing::info!(
            path = %path.display(),
            entries = entries.len(),
            version = payload.version,
            "vault opened"
        );

        Ok(Self {
            entries,
            version: payload.version,
            created_at: payload.created_at,
            salt: opened.header.salt,
            kdf: opened.header.kdf,
            key: opened.key,
            lock: Some(lock),
            closed: false,
        })
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Add a new location.
    ///
    /// Adding over a tombstone brings the location back with a version
    /// higher than the tombstone's, so the re-add survives a merge.
    pub fn add(
        &mut self,
        location: &str,
        secret: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        self.ensure_open()?;
        validate_location(location)?;

        let entry = match self.entries.get(location) {
            Some(existing) if existing.is_live() => {
                return Err(CaskError::DuplicateLocation(location.to_string()));
            }
            Some(tombstone) => {
                let mut entry = Entry::new(location, secret, metadata);
                entry.version = tombstone.version + 1;
                entry
            }
            None => Entry::new(location, secret, metadata),
        };

        self.entries.insert(location.to_string(), entry);
        self.bump();
        Ok(())
    }

    /// Look up a live entry.
    pub fn get(&self, location: &str) -> Result<&Entry> {
        self.ensure_open()?;
        self.entries
            .get(location)
            .filter(|e| e.is_live())
            .ok_or_else(|| CaskError::LocationNotFound(location.to_string()))
    }

    /// Replace the secret of an existing location.
    pub fn edit(&mut self, location: &str, new_secret: &str) -> Result<()> {
        let entry = self.live_mut(location)?;
        entry.secret.zeroize();
        entry.secret = new_secret.to_string();
        entry.touch();
        self.bump();
        Ok(())
    }

    /// Delete a location.  The entry stays behind as a tombstone.
    pub fn delete(&mut self, location: &str) -> Result<()> {
        self.live_mut(location)?.bury();
        self.bump();
        Ok(())
    }

    /// Move an entry to a new location.
    ///
    /// The old location becomes a tombstone; the new one carries the
    /// entry's secret and metadata with a version above anything that
    /// previously lived there.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.ensure_open()?;
        validate_location(to)?;

        let previous_at_target = match self.entries.get(to) {
            Some(existing) if existing.is_live() => {
                return Err(CaskError::DuplicateLocation(to.to_string()));
            }
            Some(tombstone) => tombstone.version,
            None => 0,
        };

        let source = self.live_mut(from)?;
        let mut moved = source.clone();
        source.bury();

        moved.location = to.to_string();
        moved.version = moved.version.max(previous_at_target);
        moved.touch();

        self.entries.insert(to.to_string(), moved);
        self.bump();
        Ok(())
    }

    /// Sorted list of live locations (drives listing and completion).
    pub fn locations(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.is_live())
            .map(|e| e.location.clone())
            .collect()
    }

    /// Listing metadata for every live entry, sorted by location.
    pub fn summaries(&self) -> Vec<EntrySummary> {
        self.entries
            .values()
            .filter(|e| e.is_live())
            .map(EntrySummary::from)
            .collect()
    }

    /// Every entry including tombstones, sorted by location.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Case-insensitive substring search over locations and metadata
    /// values.  Results are ascending by location.
    pub fn search(&self, query: &str) -> Vec<&Entry> {
        let needle = query.to_lowercase();
        self.entries
            .values()
            .filter(|e| e.is_live())
            .filter(|e| {
                e.location.to_lowercase().contains(&needle)
                    || e.metadata
                        .values()
                        .any(|v| v.to_lowercase().contains(&needle))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Metadata operations
    // ------------------------------------------------------------------

    /// Insert or overwrite one metadata value.
    pub fn set_metadata(&mut self, location: &str, key: &str, value: &str) -> Result<()> {
        let entry = self.live_mut(location)?;
        if let Some(mut old) = entry.metadata.insert(key.to_string(), value.to_string()) {
            old.zeroize();
        }
        entry.touch();
        self.bump();
        Ok(())
    }

    /// Add a metadata key that must not exist yet.
    pub fn add_metadata(&mut self, location: &str, key: &str, value: &str) -> Result<()> {
        if self.get(location)?.metadata.contains_key(key) {
            return Err(CaskError::MetadataExists {
                location: location.to_string(),
                key: key.to_string(),
            });
        }
        self.set_metadata(location, key, value)
    }

    /// Change a metadata key that must already exist.
    pub fn edit_metadata(&mut self, location: &str, key: &str, value: &str) -> Result<()> {
        if !self.get(location)?.metadata.contains_key(key) {
            return Err(CaskError::MetadataNotFound {
                location: location.to_string(),
                key: key.to_string(),
            });
        }
        self.set_metadata(location, key, value)
    }

    /// Remove one metadata key.
    pub fn delete_metadata(&mut self, location: &str, key: &str) -> Result<()> {
        let entry = self.live_mut(location)?;
        match entry.metadata.remove(key) {
            Some(mut old) => old.zeroize(),
            None => {
                return Err(CaskError::MetadataNotFound {
                    location: location.to_string(),
                    key: key.to_string(),
                });
            }
        }
        entry.touch();
        self.bump();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Key management
    // ------------------------------------------------------------------

    /// Re-key the vault under a new passphrase.
    ///
    /// `old` is checked by re-deriving it and comparing in constant time
    /// with the held key.  A fresh salt is generated; entries are
    /// untouched, and the next `save` encrypts under the new key.
    pub fn change_passphrase(&mut self, old: &[u8], new: &[u8]) -> Result<()> {
        self.ensure_open()?;

        let mut candidate = derive_key(old, &self.salt, &self.kdf)?;
        let matches = self.key.matches(&candidate);
        candidate.zeroize();
        if !matches {
            return Err(CaskError::WrongPassphrase);
        }

        let salt = generate_salt()?;
        let mut key_bytes = derive_key(new, &salt, &self.kdf)?;
        self.key = VaultKey::new(key_bytes);
        key_bytes.zeroize();
        self.salt = salt;

        tracing::info!("vault passphrase changed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Encrypt the vault and write it to `path` atomically.
    ///
    /// Takes the lock for `path` first if this vault does not hold it yet
    /// (a fresh `new`, or saving under a different name).  In-memory state
    /// is never modified, so a failed save can simply be retried.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.ensure_open()?;
        self.ensure_lock(path)?;

        let payload = PayloadRef {
            version: self.version,
            created_at: self.created_at,
            entries: self.entries.values().collect(),
        };
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&payload)
                .map_err(|e| CaskError::SerializationError(format!("payload: {e}")))?,
        );

        let image = format::seal_file(&self.key, &self.kdf, &self.salt, &plaintext)?;

        let lock = self
            .lock
            .as_ref()
            .ok_or_else(|| CaskError::LockLost(path.to_path_buf()))?;
        format::write_vault(path, &image, lock)?;

        tracing::info!(
            path = %path.display(),
            entries = self.entries.len(),
            version = self.version,
            "vault saved"
        );
        Ok(())
    }

    /// Wipe all secret material and release the lock.
    ///
    /// Entries are scrubbed in place and the key is zeroized.  Calling
    /// `close` twice is harmless.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        scrub_all(&mut self.entries);
        self.entries.clear();
        self.key.zeroize();

        tracing::debug!("vault key material wiped");

        match self.lock.as_mut() {
            Some(lock) => lock.release(),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Vault-wide mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When this vault was first created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The Argon2 params the key was derived with.
    pub fn kdf_params(&self) -> &Argon2Params {
        &self.kdf
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.is_live()).count()
    }

    /// `true` if there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The path this vault currently holds a lock on, if any.
    pub fn locked_path(&self) -> Option<&Path> {
        self.lock
            .as_ref()
            .filter(|l| l.is_held())
            .map(FileLock::vault_path)
    }

    /// `true` after `close`.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(super) fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(CaskError::VaultClosed);
        }
        Ok(())
    }

    fn ensure_lock(&mut self, path: &Path) -> Result<()> {
        if let Some(lock) = &self.lock {
            if lock.is_held() && lock.vault_path() == path {
                return Ok(());
            }
        }

        let lock = FileLock::acquire(path)?;
        if let Some(mut previous) = self.lock.replace(lock) {
            previous.release()?;
        }
        Ok(())
    }

    fn live_mut(&mut self, location: &str) -> Result<&mut Entry> {
        self.ensure_open()?;
        self.entries
            .get_mut(location)
            .filter(|e| e.is_live())
            .ok_or_else(|| CaskError::LocationNotFound(location.to_string()))
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close vault cleanly on drop");
        }
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("entries", &self.entries.len())
            .field("version", &self.version)
            .field("locked_path", &self.locked_path())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Validate that a location name is usable.
///
/// Must be non-empty, at most 256 characters, and free of whitespace
/// and control characters (the interactive session splits on whitespace).
pub fn validate_location(location: &str) -> Result<()> {
    if location.is_empty() {
        return Err(CaskError::InvalidLocation(
            "location cannot be empty".into(),
        ));
    }
    if location.chars().count() > MAX_LOCATION_LEN {
        return Err(CaskError::InvalidLocation(format!(
            "location cannot exceed {MAX_LOCATION_LEN} characters"
        )));
    }
    if location
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(CaskError::InvalidLocation(format!(
            "location '{}' contains whitespace or control characters",
            location.escape_debug()
        )));
    }
    Ok(())
}
