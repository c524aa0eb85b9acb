//! The `Entry` record stored under each location.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// One secret record.
///
/// `version` is bumped on every mutation of this entry and drives merge
/// resolution.  A deleted entry stays in the vault as a tombstone (with its
/// secret and metadata scrubbed) so that merges can propagate the deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique, case-sensitive identifier (e.g. "bank").
    pub location: String,

    /// The secret itself.
    pub secret: String,

    /// Free-form key/value pairs ("username", "url", ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Per-entry mutation counter.
    pub version: u64,

    /// `true` once the entry has been deleted.
    #[serde(default)]
    pub tombstone: bool,

    /// When this entry was last mutated.
    pub modified_at: DateTime<Utc>,
}

impl Entry {
    /// A fresh live entry at version 1.
    pub fn new(location: &str, secret: &str, metadata: BTreeMap<String, String>) -> Self {
        Self {
            location: location.to_string(),
            secret: secret.to_string(),
            metadata,
            version: 1,
            tombstone: false,
            modified_at: Utc::now(),
        }
    }

    /// `true` if the entry has not been deleted.
    pub fn is_live(&self) -> bool {
        !self.tombstone
    }

    /// Same secret, metadata and deletion state, ignoring bookkeeping.
    pub fn same_content(&self, other: &Entry) -> bool {
        self.tombstone == other.tombstone
            && self.secret == other.secret
            && self.metadata == other.metadata
    }

    /// Record a mutation: bump the version and the timestamp.
    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.modified_at = Utc::now();
    }

    /// Turn this entry into a tombstone, wiping its contents.
    pub(crate) fn bury(&mut self) {
        self.scrub();
        self.tombstone = true;
        self.touch();
    }

    /// Overwrite the secret and metadata values in place.
    pub(crate) fn scrub(&mut self) {
        self.secret.zeroize();
        for value in self.metadata.values_mut() {
            value.zeroize();
        }
        self.metadata.clear();
    }
}

/// Scrub every entry of a map in place.  The caller drops or clears it.
pub(crate) fn scrub_all(entries: &mut BTreeMap<String, Entry>) {
    for entry in entries.values_mut() {
        entry.scrub();
    }
}

/// Lightweight view of an entry for listings (no secret).
#[derive(Debug, Clone)]
pub struct EntrySummary {
    pub location: String,
    pub version: u64,
    pub metadata_keys: Vec<String>,
    pub modified_at: DateTime<Utc>,
}

impl From<&Entry> for EntrySummary {
    fn from(entry: &Entry) -> Self {
        Self {
            location: entry.location.clone(),
            version: entry.version,
            metadata_keys: entry.metadata.keys().cloned().collect(),
            modified_at: entry.modified_at,
        }
    }
}
