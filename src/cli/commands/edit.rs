//! `edit`: replace a location's secret.

use zeroize::Zeroizing;

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::Result;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Edit, args, 1, 2)?;
    let location = &args[0];

    // Fail on a missing location before asking for anything.
    ctx.vault.get(location)?;

    let secret = match args.get(1) {
        Some(s) => Zeroizing::new(s.clone()),
        None => ctx.prompt.secret(&format!("New secret for {location}"))?,
    };

    ctx.vault.edit(location, &secret)?;
    Ok(Reply::message(format!("Updated '{location}'")))
}
