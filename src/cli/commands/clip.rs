//! `clip`: copy a location's secret to the clipboard.

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::Result;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Clip, args, 1, 1)?;
    let entry = ctx.vault.get(&args[0])?;
    ctx.clipboard.write(&entry.secret)?;

    Ok(Reply::message(format!(
        "Copied the secret for '{}' to the clipboard (cleared after {}s)",
        args[0], ctx.settings.clipboard_clear_secs
    )))
}
