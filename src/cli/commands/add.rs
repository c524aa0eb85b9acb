//! `add`: create a new location.

use std::collections::BTreeMap;

use zeroize::Zeroizing;

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::{CaskError, Result};
use crate::vault::validate_location;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Add, args, 1, 2)?;
    let location = &args[0];

    // Validate before prompting so a typo doesn't cost a secret entry.
    validate_location(location)?;
    if ctx.vault.get(location).is_ok() {
        return Err(CaskError::DuplicateLocation(location.clone()));
    }

    let secret = match args.get(1) {
        Some(s) => Zeroizing::new(s.clone()),
        None => ctx.prompt.secret(&format!("Secret for {location}"))?,
    };

    ctx.vault.add(location, &secret, BTreeMap::new())?;
    Ok(Reply::message(format!(
        "Added '{location}' ({} location(s) total)",
        ctx.vault.len()
    )))
}
