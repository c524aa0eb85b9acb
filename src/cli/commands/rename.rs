//! `rename`: move an entry to a new location.

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::Result;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Rename, args, 2, 2)?;
    ctx.vault.rename(&args[0], &args[1])?;
    Ok(Reply::message(format!("Renamed '{}' to '{}'", args[0], args[1])))
}
