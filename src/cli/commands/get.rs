//! `get`: print a location's secret and metadata.

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::Result;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Get, args, 1, 1)?;
    let entry = ctx.vault.get(&args[0])?;

    let width = entry
        .metadata
        .keys()
        .map(String::len)
        .chain(["location".len(), "secret".len()])
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "{:<width$}  {}\n{:<width$}  {}",
        "location", entry.location, "secret", entry.secret
    );
    for (key, value) in &entry.metadata {
        out.push_str(&format!("\n{key:<width$}  {value}"));
    }

    Ok(Reply::Message(out))
}
