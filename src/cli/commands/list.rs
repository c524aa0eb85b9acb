//! `list`: show every live location in a table.

use comfy_table::{ContentArrangement, Table};

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::Result;
use crate::vault::EntrySummary;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::List, args, 0, 0)?;

    let summaries = ctx.vault.summaries();
    if summaries.is_empty() {
        return Ok(Reply::message(
            "No locations in this vault yet. Run `add <location>` or `gen <location>` to create one.",
        ));
    }

    Ok(Reply::message(format!(
        "{}\n{} location(s)",
        summaries_table(&summaries),
        summaries.len()
    )))
}

/// Table of entry summaries (Location, Metadata, Version, Modified).
pub(crate) fn summaries_table(summaries: &[EntrySummary]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Location", "Metadata", "Version", "Modified"]);

    for s in summaries {
        table.add_row(vec![
            s.location.clone(),
            s.metadata_keys.join(", "),
            s.version.to_string(),
            s.modified_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    table
}
