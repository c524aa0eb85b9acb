//! The interactive session: a state machine around one open vault.
//!
//! A `Session` owns everything with a lifetime tied to "the vault is open":
//! the `Vault` (and through it the lock file and derived key), the
//! clipboard collaborator, the prompt collaborator and the command
//! registry.  Line reading is abstracted behind `LineSource` so the idle
//! timeout can be driven by any input, interactive or scripted.
//!
//! ```text
//!   Idle ──line──▶ Dispatching ──reply──▶ Idle
//!     │                 │
//!     │ timeout / EOF   │ quit
//!     │ interrupt       ▼
//!     └─────────────▶ Stopped  (teardown runs exactly once)
//! ```
//!
//! Teardown, in order: clear the clipboard, save the vault, close the
//! vault (scrubs entries, zeroes the key, releases the lock).  Every step
//! runs even if an earlier one fails; failures are collected in the
//! `StopReport`.

pub mod registry;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use console::style;
use zeroize::Zeroizing;

use crate::clipboard::Clipboard;
use crate::cli::commands::{self, CommandContext, CommandKind, Reply};
use crate::config::Settings;
use crate::errors::{CaskError, Result};
use crate::vault::Vault;

pub use registry::{split_line, Invocation, Registry};

// ---------------------------------------------------------------------------
// Collaborator contracts
// ---------------------------------------------------------------------------

/// One result of waiting for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Eof,
    TimedOut,
    Interrupted,
}

/// Source of command lines.
pub trait LineSource {
    /// Wait at most `timeout` for the next line.
    fn next_line(&mut self, timeout: Duration) -> Result<Input>;
}

/// Interactive prompts used by commands that need a secret the user did
/// not pass on the command line.
pub trait Prompt {
    /// Ask for a secret once.
    fn secret(&mut self, label: &str) -> Result<Zeroizing<String>>;

    /// Ask for a new secret, with confirmation.
    fn new_secret(&mut self, label: &str) -> Result<Zeroizing<String>>;
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    EndOfInput,
    IdleTimeout,
    Interrupted,
    InputFailed,
    /// The session value was dropped without an explicit stop.
    Dropped,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StopReason::Quit => "quit",
            StopReason::EndOfInput => "end of input",
            StopReason::IdleTimeout => "idle timeout",
            StopReason::Interrupted => "interrupted",
            StopReason::InputFailed => "input failed",
            StopReason::Dropped => "dropped",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle { last_activity: Instant },
    Dispatching,
    Stopped(StopReason),
}

/// What teardown did.
#[derive(Debug)]
pub struct StopReport {
    pub reason: StopReason,
    /// Teardown steps that failed (clipboard, save, close).
    pub errors: Vec<CaskError>,
}

impl StopReport {
    /// `true` if every teardown step succeeded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session {
    vault: Vault,
    path: PathBuf,
    settings: Settings,
    clipboard: Box<dyn Clipboard>,
    prompt: Box<dyn Prompt>,
    registry: Registry<CommandKind>,
    idle_timeout: Duration,
    state: SessionState,
    /// Vault version the completion candidates were built from.
    candidates_version: u64,
}

impl Session {
    /// Start a session on an opened vault.
    ///
    /// `path` is where the vault is saved, on `save` and on stop.
    pub fn new(
        vault: Vault,
        path: &Path,
        settings: Settings,
        clipboard: Box<dyn Clipboard>,
        prompt: Box<dyn Prompt>,
    ) -> Self {
        let registry = commands::build_registry(&vault.locations());
        let idle_timeout = settings.idle_timeout();
        let candidates_version = vault.version();

        tracing::info!(path = %path.display(), "session started");

        Self {
            vault,
            path: path.to_path_buf(),
            settings,
            clipboard,
            prompt,
            registry,
            idle_timeout,
            state: SessionState::Idle {
                last_activity: Instant::now(),
            },
            candidates_version,
        }
    }

    /// Override the idle timeout from the settings.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.state, SessionState::Stopped(_))
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn registry(&self) -> &Registry<CommandKind> {
        &self.registry
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Completions for a partially typed line.
    pub fn complete(&self, line: &str) -> Vec<String> {
        self.registry.complete(line)
    }

    /// Run one command line.
    ///
    /// A blank line yields `Reply::Nothing`.  Accepted commands reset the
    /// idle clock once they finish, whether they succeed or fail.
    pub fn dispatch(&mut self, line: &str) -> Result<Reply> {
        if self.is_stopped() {
            return Err(CaskError::VaultClosed);
        }
        let Some(invocation) = self.registry.resolve(line)? else {
            return Ok(Reply::Nothing);
        };

        tracing::debug!(command = %invocation.name, "dispatching");
        self.state = SessionState::Dispatching;

        let result = {
            let mut ctx = CommandContext {
                vault: &mut self.vault,
                vault_path: &self.path,
                settings: &self.settings,
                clipboard: self.clipboard.as_mut(),
                prompt: self.prompt.as_mut(),
            };
            commands::execute(invocation.kind, &invocation.args, &mut ctx)
        };

        self.state = SessionState::Idle {
            last_activity: Instant::now(),
        };
        self.refresh_candidates();
        result
    }

    /// Read and dispatch lines until the session stops.
    ///
    /// Replies go to `out`; command errors are reported there too and do
    /// not end the session.
    pub fn run(&mut self, input: &mut dyn LineSource, out: &mut dyn Write) -> Result<StopReport> {
        if self.is_stopped() {
            return Err(CaskError::VaultClosed);
        }

        loop {
            let last_activity = match self.state {
                SessionState::Idle { last_activity } => last_activity,
                SessionState::Dispatching => Instant::now(),
                SessionState::Stopped(reason) => {
                    return Ok(StopReport {
                        reason,
                        errors: Vec::new(),
                    })
                }
            };

            let elapsed = last_activity.elapsed();
            if elapsed >= self.idle_timeout {
                return Ok(self.finish(StopReason::IdleTimeout));
            }

            let line = match input.next_line(self.idle_timeout - elapsed) {
                Ok(Input::Line(line)) => line,
                Ok(Input::TimedOut) => continue,
                Ok(Input::Eof) => return Ok(self.finish(StopReason::EndOfInput)),
                Ok(Input::Interrupted) => return Ok(self.finish(StopReason::Interrupted)),
                Err(e) => {
                    tracing::warn!(error = %e, "reading input failed");
                    return Ok(self.finish(StopReason::InputFailed));
                }
            };

            let written = match self.dispatch(&line) {
                Ok(Reply::Quit) => return Ok(self.finish(StopReason::Quit)),
                Ok(Reply::Nothing) => Ok(()),
                Ok(Reply::Message(text)) => writeln!(out, "{text}"),
                Err(e) => writeln!(out, "{} {e}", style("\u{2717}").red().bold()),
            };
            if let Err(e) = written {
                tracing::warn!(error = %e, "writing reply failed");
            }
        }
    }

    /// Enter `Stopped` and run teardown.
    ///
    /// Returns `None` if the session had already stopped; teardown never
    /// runs twice.
    pub fn stop(&mut self, reason: StopReason) -> Option<StopReport> {
        if self.is_stopped() {
            return None;
        }
        self.state = SessionState::Stopped(reason);
        tracing::info!(%reason, "session stopping");

        let mut errors = Vec::new();

        // 1. Scrub the clipboard.
        if let Err(e) = self.clipboard.clear() {
            tracing::warn!(error = %e, "clipboard clear failed during stop");
            errors.push(e);
        }

        // 2. Persist.
        if let Err(e) = self.vault.save(&self.path) {
            tracing::warn!(error = %e, "save failed during stop");
            errors.push(e);
        }

        // 3. Wipe keys and entries, release the lock.
        if let Err(e) = self.vault.close() {
            tracing::warn!(error = %e, "close failed during stop");
            errors.push(e);
        }

        Some(StopReport { reason, errors })
    }

    fn finish(&mut self, reason: StopReason) -> StopReport {
        self.stop(reason).unwrap_or(StopReport {
            reason,
            errors: Vec::new(),
        })
    }

    fn refresh_candidates(&mut self) {
        if self.vault.is_closed() || self.vault.version() == self.candidates_version {
            return;
        }
        commands::refresh_candidates(&mut self.registry, &self.vault.locations());
        self.candidates_version = self.vault.version();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(report) = self.stop(StopReason::Dropped) {
            for e in &report.errors {
                tracing::warn!(error = %e, "teardown on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}
