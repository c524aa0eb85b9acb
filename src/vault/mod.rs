//! Vault module: encrypted secret storage.
//!
//! This module provides:
//! - The `Entry` record type (`entry`)
//! - Binary vault file format and atomic writes (`format`)
//! - The in-memory `Vault` with CRUD, query and persistence (`store`)
//! - Random secret generation (`generate`)
//! - Two-way reconciliation of diverged vaults (`merge`)

pub mod entry;
pub mod format;
pub mod generate;
pub mod merge;
pub mod store;

// Re-export the most commonly used items.
pub use entry::{Entry, EntrySummary};
pub use format::{VaultHeader, CURRENT_VERSION};
pub use generate::{generate, CharsetPolicy};
pub use merge::{merge_entries, Conflict, ConflictReport, MergeOutcome};
pub use store::{validate_location, Vault};
