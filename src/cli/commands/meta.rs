//! Metadata commands: `addmeta`, `editmeta` and `deletemeta`.
//!
//! Values may contain spaces: everything after the key is joined back
//! together with single spaces.

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::Result;

/// `addmeta <location> <key> <value...>`
pub fn add(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    let (location, key, value) = split_value(CommandKind::AddMeta, args)?;
    ctx.vault.add_metadata(location, key, &value)?;
    Ok(Reply::message(format!("Added '{key}' to '{location}'")))
}

/// `editmeta <location> <key> <value...>`
pub fn edit(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    let (location, key, value) = split_value(CommandKind::EditMeta, args)?;
    ctx.vault.edit_metadata(location, key, &value)?;
    Ok(Reply::message(format!("Updated '{key}' on '{location}'")))
}

/// `deletemeta <location> <key>`
pub fn delete(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::DeleteMeta, args, 2, 2)?;
    ctx.vault.delete_metadata(&args[0], &args[1])?;
    Ok(Reply::message(format!(
        "Removed '{}' from '{}'",
        args[1], args[0]
    )))
}

fn split_value(kind: CommandKind, args: &[String]) -> Result<(&str, &str, String)> {
    match args {
        [location, key, value @ ..] if !value.is_empty() => {
            Ok((location.as_str(), key.as_str(), value.join(" ")))
        }
        _ => Err(kind.usage_error()),
    }
}
