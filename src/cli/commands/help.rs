//! `help`: list the session commands.

use super::{CommandContext, CommandKind, Reply};
use crate::errors::Result;

pub fn execute(_ctx: &mut CommandContext<'_>, _args: &[String]) -> Result<Reply> {
    let width = CommandKind::ALL
        .iter()
        .map(|k| k.usage().len())
        .max()
        .unwrap_or(0);

    let lines: Vec<String> = CommandKind::ALL
        .iter()
        .map(|k| format!("  {:<width$}  {}", k.usage(), k.summary()))
        .collect();

    Ok(Reply::Message(format!("Commands:\n{}", lines.join("\n"))))
}
