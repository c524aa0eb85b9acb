//! `save`: write the vault to disk now.

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::Result;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Save, args, 0, 0)?;
    ctx.vault.save(ctx.vault_path)?;
    Ok(Reply::message(format!(
        "Saved {} location(s) to {}",
        ctx.vault.len(),
        ctx.vault_path.display()
    )))
}
