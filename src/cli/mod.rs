//! CLI module: Clap argument parser, passphrase prompts, terminal input
//! and the startup sequence that hands an open vault to a `Session`.

pub mod commands;
pub mod input;
pub mod output;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use zeroize::Zeroizing;

use crate::clipboard::SystemClipboard;
use crate::config::{parse_duration, Settings};
use crate::errors::{CaskError, Result};
use crate::session::{Prompt, Session, StopReason, StopReport};
use crate::vault::Vault;

use self::commands::passwd::{check_passphrase, MIN_PASSPHRASE_LEN};
use self::input::StdinSource;

/// Environment variable consulted for the vault passphrase before prompting.
pub const PASSWORD_ENV: &str = "CASK_PASSWORD";

/// Cask: an encrypted secret vault with an interactive session.
#[derive(Parser, Debug)]
#[command(
    name = "cask",
    about = "Encrypted secret vault with an interactive session",
    version
)]
pub struct Cli {
    /// Vault file to open (or create with --new)
    pub vault: PathBuf,

    /// Create a new, empty vault at the given path
    #[arg(long)]
    pub new: bool,

    /// Idle time before the session saves and exits (e.g. 90s, 5m, 1h)
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Settings file to use instead of ./.cask.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_timeout(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Open (or create) the vault and run an interactive session on it.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let idle_timeout = cli.timeout.unwrap_or_else(|| settings.idle_timeout());

    // Prompts come first: nothing is locked yet, so Ctrl-C may kill them.
    let passphrase = if cli.new {
        if cli.vault.exists() {
            return Err(CaskError::VaultAlreadyExists(cli.vault.clone()));
        }
        prompt_new_passphrase()?
    } else {
        prompt_passphrase(&cli.vault)?
    };

    // From here on the lock file exists, so signals must not kill us.
    let interrupted = install_interrupt_flag()?;

    let vault = if cli.new {
        create_vault(&cli.vault, passphrase.as_bytes(), &settings)?
    } else {
        Vault::open(&cli.vault, passphrase.as_bytes())?
    };
    drop(passphrase);
    let vault = abandon_if_interrupted(vault, &interrupted)?;

    output::info(&format!(
        "{} is open — {} location(s). Type `help` for commands.",
        cli.vault.display(),
        vault.len()
    ));

    let clipboard = SystemClipboard::new(settings.clipboard_clear_after());
    let mut session = Session::new(
        vault,
        &cli.vault,
        settings,
        Box::new(clipboard),
        Box::new(DialoguerPrompt),
    )
    .with_idle_timeout(idle_timeout);

    let mut input = StdinSource::new("cask> ", interrupted);
    let report = session.run(&mut input, &mut io::stdout())?;

    report_stop(&cli.vault, idle_timeout, &report)
}

/// Route SIGINT, SIGTERM and SIGHUP to a flag the session polls.
fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|e| CaskError::CommandFailed(format!("failed to install signal handler: {e}")))?;
    Ok(interrupted)
}

/// Close `vault` and fail if a signal arrived while it was being opened.
fn abandon_if_interrupted(mut vault: Vault, interrupted: &AtomicBool) -> Result<Vault> {
    if !interrupted.load(Ordering::SeqCst) {
        return Ok(vault);
    }
    tracing::info!("interrupted during startup, closing vault");
    vault.close()?;
    Err(CaskError::Interrupted)
}

fn create_vault(path: &Path, passphrase: &[u8], settings: &Settings) -> Result<Vault> {
    let mut vault = Vault::create(path, passphrase, &settings.argon2_params())?;
    vault.save(path)?;

    output::success(&format!("Created vault at {}", path.display()));
    Ok(vault)
}

fn report_stop(path: &Path, idle_timeout: Duration, report: &StopReport) -> Result<()> {
    match report.reason {
        StopReason::IdleTimeout => output::warning(&format!(
            "No activity for {}s — cleared clipboard and closed the vault",
            idle_timeout.as_secs()
        )),
        StopReason::Interrupted => output::warning("Interrupted — cleared clipboard and closed the vault"),
        _ => {}
    }

    if report.is_clean() {
        output::success(&format!("Saved {}", path.display()));
        return Ok(());
    }

    for e in &report.errors {
        output::error(&e.to_string());
    }
    Err(CaskError::CommandFailed(format!(
        "{} was not closed cleanly",
        path.display()
    )))
}

/// Load settings from `--config` or `./.cask.toml`.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    match &cli.config {
        Some(path) => Settings::load_file(path),
        None => Settings::load(&std::env::current_dir()?),
    }
}

// ---------------------------------------------------------------------------
// Passphrases
// ---------------------------------------------------------------------------

fn passphrase_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Get the passphrase for an existing vault: `CASK_PASSWORD`, else a prompt.
pub fn prompt_passphrase(path: &Path) -> Result<Zeroizing<String>> {
    if let Some(pw) = passphrase_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(format!("Passphrase for {}", path.display()))
        .interact()
        .map_err(|e| CaskError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Choose a passphrase for a new vault, with confirmation.
///
/// `CASK_PASSWORD` is honoured for scripted use; either way the minimum
/// length is enforced.
pub fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    if let Some(pw) = passphrase_from_env() {
        check_passphrase(&pw)?;
        return Ok(pw);
    }

    loop {
        let pw = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose vault passphrase")
                .with_confirmation(
                    "Confirm vault passphrase",
                    "Passphrases do not match, try again",
                )
                .interact()
                .map_err(|e| CaskError::CommandFailed(format!("passphrase prompt: {e}")))?,
        );

        if check_passphrase(&pw).is_err() {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }
        return Ok(pw);
    }
}

/// `Prompt` backed by hidden terminal input.
pub struct DialoguerPrompt;

impl Prompt for DialoguerPrompt {
    fn secret(&mut self, label: &str) -> Result<Zeroizing<String>> {
        dialoguer::Password::new()
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(|e| CaskError::CommandFailed(format!("prompt: {e}")))
    }

    fn new_secret(&mut self, label: &str) -> Result<Zeroizing<String>> {
        dialoguer::Password::new()
            .with_prompt(label)
            .with_confirmation(format!("Confirm {}", label.to_lowercase()), "Entries do not match")
            .interact()
            .map(Zeroizing::new)
            .map_err(|e| CaskError::CommandFailed(format!("prompt: {e}")))
    }
}
