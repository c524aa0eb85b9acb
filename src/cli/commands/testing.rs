//! Shared fixtures for command unit tests.

use std::collections::VecDeque;
use std::path::PathBuf;

use tempfile::TempDir;
use zeroize::Zeroizing;

use super::{execute, CommandContext, CommandKind, Reply};
use crate::clipboard::Clipboard;
use crate::config::Settings;
use crate::crypto::Argon2Params;
use crate::errors::{CaskError, Result};
use crate::session::Prompt;
use crate::vault::Vault;

pub const PASSPHRASE: &str = "correct horse battery";

pub fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

#[derive(Default)]
pub struct FakeClipboard {
    pub contents: Option<String>,
    pub clears: usize,
}

impl Clipboard for FakeClipboard {
    fn write(&mut self, secret: &str) -> Result<()> {
        self.contents = Some(secret.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.contents = None;
        self.clears += 1;
        Ok(())
    }
}

/// Answers prompts from a queue; an empty queue means the user cancelled.
#[derive(Default)]
pub struct FakePrompt {
    pub answers: VecDeque<String>,
}

impl Prompt for FakePrompt {
    fn secret(&mut self, _label: &str) -> Result<Zeroizing<String>> {
        self.answers
            .pop_front()
            .map(Zeroizing::new)
            .ok_or(CaskError::UserCancelled)
    }

    fn new_secret(&mut self, label: &str) -> Result<Zeroizing<String>> {
        self.secret(label)
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub path: PathBuf,
    pub vault: Vault,
    pub settings: Settings,
    pub clipboard: FakeClipboard,
    pub prompt: FakePrompt,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.cask");
        let vault = Vault::new(PASSPHRASE.as_bytes(), &fast_params()).unwrap();
        let settings = Settings {
            argon2_memory_kib: 8_192,
            argon2_iterations: 1,
            argon2_parallelism: 1,
            ..Settings::default()
        };
        Self {
            dir,
            path,
            vault,
            settings,
            clipboard: FakeClipboard::default(),
            prompt: FakePrompt::default(),
        }
    }

    /// Queue answers for upcoming prompts.
    pub fn answer(&mut self, answers: &[&str]) {
        self.prompt
            .answers
            .extend(answers.iter().map(|a| a.to_string()));
    }

    pub fn run(&mut self, kind: CommandKind, args: &[&str]) -> Result<Reply> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let mut ctx = CommandContext {
            vault: &mut self.vault,
            vault_path: &self.path,
            settings: &self.settings,
            clipboard: &mut self.clipboard,
            prompt: &mut self.prompt,
        };
        execute(kind, &args, &mut ctx)
    }

    /// Run a command and return its message text.
    pub fn text(&mut self, kind: CommandKind, args: &[&str]) -> String {
        match self.run(kind, args).unwrap() {
            Reply::Message(text) => text,
            other => panic!("expected a message, got {other:?}"),
        }
    }
}
