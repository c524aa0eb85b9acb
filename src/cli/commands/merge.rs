//! `merge`: fold another copy of the vault into this one.
//!
//! The other file is opened (and locked) only for the duration of the
//! merge.  Conflicts are listed with the discarded secret so nothing is
//! lost silently.

use std::path::Path;

use comfy_table::{ContentArrangement, Table};

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::{CaskError, Result};
use crate::vault::{ConflictReport, Vault};

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Merge, args, 1, 1)?;
    let other_path = Path::new(&args[0]);

    if same_file(other_path, ctx.vault_path) {
        return Err(CaskError::Usage("cannot merge a vault with itself".into()));
    }
    if !other_path.exists() {
        return Err(CaskError::VaultNotFound(other_path.to_path_buf()));
    }

    let passphrase = ctx
        .prompt
        .secret(&format!("Passphrase for {}", other_path.display()))?;
    let mut other = Vault::open(other_path, passphrase.as_bytes())?;

    let merged = ctx.vault.merge(&other);
    other.close()?;
    let report = merged?;

    Ok(Reply::Message(describe(other_path, &report)))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn describe(other_path: &Path, report: &ConflictReport) -> String {
    if report.is_empty() {
        return format!("Merged {} with no conflicts", other_path.display());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Location", "Kept version", "Discarded version", "Discarded secret"]);
    for c in &report.conflicts {
        table.add_row(vec![
            c.location.clone(),
            c.kept.version.to_string(),
            c.discarded.version.to_string(),
            c.discarded.secret.clone(),
        ]);
    }

    format!(
        "Merged {} with {} conflict(s):\n{table}",
        other_path.display(),
        report.len()
    )
}
