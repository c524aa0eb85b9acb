//! `gen`: store a freshly generated random secret.
//!
//! Creates the location if it doesn't exist, otherwise replaces its
//! secret.  The secret itself is never printed; use `clip` or `get`.

use std::collections::BTreeMap;

use super::{CommandContext, CommandKind, Reply};
use crate::errors::Result;
use crate::vault::{generate, validate_location};

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    let (location, rest) = args
        .split_first()
        .ok_or_else(|| CommandKind::Gen.usage_error())?;
    validate_location(location)?;

    let mut policy = ctx.settings.charset_policy();
    let mut length = ctx.settings.generate_length;
    for arg in rest {
        match arg.as_str() {
            "--no-symbols" => policy.include_symbols = false,
            "--no-digits" => policy.include_digits = false,
            n => length = n.parse().map_err(|_| CommandKind::Gen.usage_error())?,
        }
    }

    let secret = generate(length, &policy)?;
    let verb = if ctx.vault.get(location).is_ok() {
        ctx.vault.edit(location, &secret)?;
        "Replaced"
    } else {
        ctx.vault.add(location, &secret, BTreeMap::new())?;
        "Generated"
    };

    Ok(Reply::message(format!(
        "{verb} a {}-character secret for '{location}'. Run `clip {location}` to copy it.",
        secret.chars().count()
    )))
}
