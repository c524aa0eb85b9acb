//! Reconciliation of two independently edited copies of a vault.
//!
//! Merging works purely on decrypted entries and never touches disk.
//! Each location is resolved on its own:
//!
//! | local            | remote           | result                               |
//! |------------------|------------------|--------------------------------------|
//! | present          | absent           | local                                |
//! | absent           | present          | remote                               |
//! | same content     | same content     | higher version (then newer mtime)    |
//! | tombstone        | live             | tombstone if its version ≥ live's    |
//! | tombstone        | tombstone        | higher version                       |
//! | live             | live, different  | higher version, then greater secret, |
//! |                  |                  | then greater metadata; loser reported|
//!
//! Every rule depends only on the two entries, never on which argument
//! they came from, so `merge(a, b)` and `merge(b, a)` agree.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::entry::{scrub_all, Entry};
use super::store::Vault;
use crate::errors::Result;

/// A location where both sides had different live content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub location: String,
    /// The variant that made it into the merged vault.
    pub kept: Entry,
    /// The variant that lost and was dropped from the merged vault.
    pub discarded: Entry,
}

/// All conflicts found by one merge, ordered by location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    /// `true` if the merge resolved without any conflicting edits.
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Wipe the secrets held by every conflict.
    pub fn scrub(&mut self) {
        for conflict in &mut self.conflicts {
            conflict.kept.scrub();
            conflict.discarded.scrub();
        }
    }
}

impl Drop for ConflictReport {
    fn drop(&mut self) {
        self.scrub();
    }
}

/// Result of merging two entry maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub entries: BTreeMap<String, Entry>,
    pub report: ConflictReport,
}

/// Merge two entry maps.
pub fn merge_entries(
    local: &BTreeMap<String, Entry>,
    remote: &BTreeMap<String, Entry>,
) -> MergeOutcome {
    let mut entries = BTreeMap::new();
    let mut conflicts = Vec::new();

    let mut locations: Vec<&String> = local.keys().chain(remote.keys()).collect();
    locations.sort();
    locations.dedup();

    for location in locations {
        let merged = match (local.get(location), remote.get(location)) {
            (Some(only), None) | (None, Some(only)) => only.clone(),
            (Some(a), Some(b)) => {
                let (kept, discarded) = resolve(a, b);
                if let Some(discarded) = discarded {
                    conflicts.push(Conflict {
                        location: location.clone(),
                        kept: kept.clone(),
                        discarded: discarded.clone(),
                    });
                }
                kept.clone()
            }
            (None, None) => continue,
        };
        entries.insert(location.clone(), merged);
    }

    MergeOutcome {
        entries,
        report: ConflictReport { conflicts },
    }
}

/// Pick the winner between two copies of one location.
///
/// Returns the winner plus, for a genuine live/live conflict, the loser.
fn resolve<'a>(a: &'a Entry, b: &'a Entry) -> (&'a Entry, Option<&'a Entry>) {
    if a.same_content(b) {
        let newer = match a
            .version
            .cmp(&b.version)
            .then_with(|| a.modified_at.cmp(&b.modified_at))
        {
            Ordering::Less => b,
            _ => a,
        };
        return (newer, None);
    }

    match (a.tombstone, b.tombstone) {
        // A deletion only wins over an edit it has seen.
        (true, false) => (if a.version >= b.version { a } else { b }, None),
        (false, true) => (if b.version >= a.version { b } else { a }, None),
        (true, true) => {
            let order = a
                .version
                .cmp(&b.version)
                .then_with(|| a.modified_at.cmp(&b.modified_at))
                .then_with(|| a.secret.cmp(&b.secret))
                .then_with(|| a.metadata.cmp(&b.metadata));
            (if order == Ordering::Less { b } else { a }, None)
        }
        (false, false) => {
            let order = a
                .version
                .cmp(&b.version)
                .then_with(|| a.secret.cmp(&b.secret))
                .then_with(|| a.metadata.cmp(&b.metadata));
            match order {
                Ordering::Less => (b, Some(a)),
                _ => (a, Some(b)),
            }
        }
    }
}

impl Vault {
    /// Merge `other` into this vault.
    ///
    /// The result's version is one above the larger of the two.  Conflicts
    /// are returned as data; they are never errors.
    pub fn merge(&mut self, other: &Vault) -> Result<ConflictReport> {
        self.ensure_open()?;
        other.ensure_open()?;

        let outcome = merge_entries(&self.entries, &other.entries);
        let mut replaced = std::mem::replace(&mut self.entries, outcome.entries);
        scrub_all(&mut replaced);
        self.version = self.version.max(other.version) + 1;

        tracing::info!(
            version = self.version,
            conflicts = outcome.report.len(),
            "vaults merged"
        );
        Ok(outcome.report)
    }
}
