//! `delete`: remove a location.

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::Result;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Delete, args, 1, 1)?;
    ctx.vault.delete(&args[0])?;
    Ok(Reply::message(format!(
        "Deleted '{}' ({} location(s) remaining)",
        args[0],
        ctx.vault.len()
    )))
}
