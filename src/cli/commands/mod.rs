//! Session commands.
//!
//! Each command lives in its own file and exposes
//! `execute(ctx, args) -> Result<Reply>`.  `CommandKind` is the tag stored
//! in the session registry; `execute` below routes a tag to its handler.

pub mod add;
pub mod clip;
pub mod delete;
pub mod edit;
pub mod env_parser;
pub mod gen;
pub mod get;
pub mod help;
pub mod import;
pub mod list;
pub mod merge;
pub mod meta;
pub mod passwd;
pub mod rename;
pub mod save;
pub mod search;

#[cfg(test)]
mod testing;

use std::path::Path;

use crate::clipboard::Clipboard;
use crate::config::Settings;
use crate::errors::{CaskError, Result};
use crate::session::{Prompt, Registry};
use crate::vault::Vault;

/// Everything a command may touch.
pub struct CommandContext<'a> {
    pub vault: &'a mut Vault,
    pub vault_path: &'a Path,
    pub settings: &'a Settings,
    pub clipboard: &'a mut dyn Clipboard,
    pub prompt: &'a mut dyn Prompt,
}

/// What a command hands back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text to show the user.
    Message(String),
    /// Nothing to show.
    Nothing,
    /// Stop the session.
    Quit,
}

impl Reply {
    pub fn message(text: impl Into<String>) -> Self {
        Reply::Message(text.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommandKind {
    List,
    Get,
    Add,
    Gen,
    Edit,
    Rename,
    Delete,
    Clip,
    Search,
    AddMeta,
    EditMeta,
    DeleteMeta,
    Save,
    Passwd,
    Merge,
    Import,
    Help,
    Quit,
}

impl CommandKind {
    pub const ALL: [CommandKind; 18] = [
        CommandKind::List,
        CommandKind::Get,
        CommandKind::Add,
        CommandKind::Gen,
        CommandKind::Edit,
        CommandKind::Rename,
        CommandKind::Delete,
        CommandKind::Clip,
        CommandKind::Search,
        CommandKind::AddMeta,
        CommandKind::EditMeta,
        CommandKind::DeleteMeta,
        CommandKind::Save,
        CommandKind::Passwd,
        CommandKind::Merge,
        CommandKind::Import,
        CommandKind::Help,
        CommandKind::Quit,
    ];

    /// Names the command is registered under.
    pub fn names(self) -> &'static [&'static str] {
        match self {
            CommandKind::List => &["list"],
            CommandKind::Get => &["get"],
            CommandKind::Add => &["add"],
            CommandKind::Gen => &["gen"],
            CommandKind::Edit => &["edit"],
            CommandKind::Rename => &["rename"],
            CommandKind::Delete => &["delete"],
            CommandKind::Clip => &["clip"],
            CommandKind::Search => &["search"],
            CommandKind::AddMeta => &["addmeta"],
            CommandKind::EditMeta => &["editmeta"],
            CommandKind::DeleteMeta => &["deletemeta"],
            CommandKind::Save => &["save"],
            CommandKind::Passwd => &["passwd"],
            CommandKind::Merge => &["merge"],
            CommandKind::Import => &["import"],
            CommandKind::Help => &["help"],
            CommandKind::Quit => &["quit", "exit"],
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            CommandKind::List => "list",
            CommandKind::Get => "get <location>",
            CommandKind::Add => "add <location> [secret]",
            CommandKind::Gen => "gen <location> [length] [--no-symbols] [--no-digits]",
            CommandKind::Edit => "edit <location> [secret]",
            CommandKind::Rename => "rename <location> <new-location>",
            CommandKind::Delete => "delete <location>",
            CommandKind::Clip => "clip <location>",
            CommandKind::Search => "search <text>",
            CommandKind::AddMeta => "addmeta <location> <key> <value>",
            CommandKind::EditMeta => "editmeta <location> <key> <value>",
            CommandKind::DeleteMeta => "deletemeta <location> <key>",
            CommandKind::Save => "save",
            CommandKind::Passwd => "passwd",
            CommandKind::Merge => "merge <vault-file>",
            CommandKind::Import => "import <file> [env|json]",
            CommandKind::Help => "help",
            CommandKind::Quit => "quit",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            CommandKind::List => "List all locations",
            CommandKind::Get => "Show a location's secret and metadata",
            CommandKind::Add => "Add a new location",
            CommandKind::Gen => "Generate a random secret for a location",
            CommandKind::Edit => "Change a location's secret",
            CommandKind::Rename => "Rename a location",
            CommandKind::Delete => "Delete a location",
            CommandKind::Clip => "Copy a location's secret to the clipboard",
            CommandKind::Search => "Find locations by name or metadata",
            CommandKind::AddMeta => "Add a metadata field",
            CommandKind::EditMeta => "Change a metadata field",
            CommandKind::DeleteMeta => "Remove a metadata field",
            CommandKind::Save => "Write the vault to disk",
            CommandKind::Passwd => "Change the vault passphrase",
            CommandKind::Merge => "Merge another copy of the vault into this one",
            CommandKind::Import => "Import secrets from a .env or JSON file",
            CommandKind::Help => "Show this help",
            CommandKind::Quit => "Save and leave the session",
        }
    }

    /// Whether the first argument is a location (and gets completions).
    pub fn takes_location(self) -> bool {
        matches!(
            self,
            CommandKind::Get
                | CommandKind::Edit
                | CommandKind::Rename
                | CommandKind::Delete
                | CommandKind::Clip
                | CommandKind::AddMeta
                | CommandKind::EditMeta
                | CommandKind::DeleteMeta
        )
    }

    /// Usage error for this command.
    pub fn usage_error(self) -> CaskError {
        CaskError::Usage(self.usage().to_string())
    }
}

/// Build the session registry with every command.
pub fn build_registry(locations: &[String]) -> Registry<CommandKind> {
    let mut registry = Registry::new();
    for kind in CommandKind::ALL {
        let candidates = if kind.takes_location() {
            locations.to_vec()
        } else {
            Vec::new()
        };
        for name in kind.names() {
            registry.register(name, candidates.clone(), kind);
        }
    }
    registry
}

/// Point every location-taking command at the current locations.
pub fn refresh_candidates(registry: &mut Registry<CommandKind>, locations: &[String]) {
    for kind in CommandKind::ALL.into_iter().filter(|k| k.takes_location()) {
        for name in kind.names() {
            registry.set_candidates(name, locations.to_vec());
        }
    }
}

/// Run one command.
pub fn execute(kind: CommandKind, args: &[String], ctx: &mut CommandContext<'_>) -> Result<Reply> {
    match kind {
        CommandKind::List => list::execute(ctx, args),
        CommandKind::Get => get::execute(ctx, args),
        CommandKind::Add => add::execute(ctx, args),
        CommandKind::Gen => gen::execute(ctx, args),
        CommandKind::Edit => edit::execute(ctx, args),
        CommandKind::Rename => rename::execute(ctx, args),
        CommandKind::Delete => delete::execute(ctx, args),
        CommandKind::Clip => clip::execute(ctx, args),
        CommandKind::Search => search::execute(ctx, args),
        CommandKind::AddMeta => meta::add(ctx, args),
        CommandKind::EditMeta => meta::edit(ctx, args),
        CommandKind::DeleteMeta => meta::delete(ctx, args),
        CommandKind::Save => save::execute(ctx, args),
        CommandKind::Passwd => passwd::execute(ctx, args),
        CommandKind::Merge => merge::execute(ctx, args),
        CommandKind::Import => import::execute(ctx, args),
        CommandKind::Help => help::execute(ctx, args),
        CommandKind::Quit => Ok(Reply::Quit),
    }
}

/// Fail with the command's usage unless `min..=max` arguments were given.
pub(crate) fn expect_args(kind: CommandKind, args: &[String], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(kind.usage_error());
    }
    Ok(())
}
