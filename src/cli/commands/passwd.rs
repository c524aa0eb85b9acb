//! `passwd`: change the vault passphrase.
//!
//! The vault is re-keyed in memory; the next save (explicit or on stop)
//! writes it under the new passphrase.

use super::{expect_args, CommandContext, CommandKind, Reply};
use crate::errors::{CaskError, Result};

/// Shortest passphrase accepted for a vault.
pub const MIN_PASSPHRASE_LEN: usize = 8;

pub fn execute(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<Reply> {
    expect_args(CommandKind::Passwd, args, 0, 0)?;

    let current = ctx.prompt.secret("Current passphrase")?;
    let new = ctx.prompt.new_secret("New passphrase")?;
    check_passphrase(&new)?;

    ctx.vault
        .change_passphrase(current.as_bytes(), new.as_bytes())?;

    Ok(Reply::message(
        "Passphrase changed. The vault is re-encrypted on the next `save` or when the session ends.",
    ))
}

/// Reject passphrases shorter than `MIN_PASSPHRASE_LEN` characters.
pub fn check_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(CaskError::Usage(format!(
            "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
        )));
    }
    Ok(())
}
