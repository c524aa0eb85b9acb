//! Session state machine: dispatch, idle timeout and single teardown.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cask::clipboard::Clipboard;
use cask::cli::commands::Reply;
use cask::config::Settings;
use cask::crypto::Argon2Params;
use cask::errors::{CaskError, Result};
use cask::lock::marker_path;
use cask::session::{Input, LineSource, Prompt, Session, SessionState, StopReason};
use cask::vault::Vault;
use tempfile::TempDir;
use zeroize::Zeroizing;

fn fast() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ClipState {
    buffer: Vec<u8>,
    writes: usize,
    clears: usize,
}

/// Records clipboard traffic; `clear` overwrites the buffer in place so
/// tests can inspect it afterwards.
#[derive(Clone, Default)]
struct RecordingClipboard(Arc<Mutex<ClipState>>);

impl Clipboard for RecordingClipboard {
    fn write(&mut self, secret: &str) -> Result<()> {
        let mut state = self.0.lock().unwrap();
        state.buffer = secret.as_bytes().to_vec();
        state.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut state = self.0.lock().unwrap();
        state.buffer.iter_mut().for_each(|b| *b = 0);
        state.clears += 1;
        Ok(())
    }
}

struct NoPrompt;

impl Prompt for NoPrompt {
    fn secret(&mut self, _label: &str) -> Result<Zeroizing<String>> {
        Err(CaskError::UserCancelled)
    }

    fn new_secret(&mut self, _label: &str) -> Result<Zeroizing<String>> {
        Err(CaskError::UserCancelled)
    }
}

/// Replays scripted input, then reports end of input.
struct Script(VecDeque<Input>);

impl Script {
    fn lines(lines: &[&str]) -> Self {
        Script(lines.iter().map(|l| Input::Line(l.to_string())).collect())
    }
}

impl LineSource for Script {
    fn next_line(&mut self, _timeout: Duration) -> Result<Input> {
        Ok(self.0.pop_front().unwrap_or(Input::Eof))
    }
}

/// Never produces a line: waits out every timeout.
struct Silence {
    waits: usize,
}

impl LineSource for Silence {
    fn next_line(&mut self, timeout: Duration) -> Result<Input> {
        self.waits += 1;
        thread::sleep(timeout);
        Ok(Input::TimedOut)
    }
}

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
    clipboard: RecordingClipboard,
    session: Session,
}

fn fixture() -> Fixture {
    fixture_with_timeout(Settings::default().idle_timeout())
}

fn fixture_with_timeout(idle_timeout: Duration) -> Fixture {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.cask");

    let mut vault = Vault::create(&path, b"pw", &fast()).unwrap();
    vault.add("bank", "s3cr3t", BTreeMap::new()).unwrap();
    vault.save(&path).unwrap();

    let clipboard = RecordingClipboard::default();
    let session = Session::new(
        vault,
        &path,
        Settings::default(),
        Box::new(clipboard.clone()),
        Box::new(NoPrompt),
    )
    .with_idle_timeout(idle_timeout);

    Fixture {
        _dir: dir,
        path,
        clipboard,
        session,
    }
}

fn run_script(fx: &mut Fixture, lines: &[&str]) -> (cask::session::StopReport, String) {
    let mut out = Vec::new();
    let report = fx.session.run(&mut Script::lines(lines), &mut out).unwrap();
    (report, String::from_utf8(out).unwrap())
}

// ---------------------------------------------------------------------------
// Idle timeout and teardown
// ---------------------------------------------------------------------------

#[test]
fn idle_timeout_stops_exactly_once() {
    let mut fx = fixture_with_timeout(Duration::from_millis(50));

    let mut input = Silence { waits: 0 };
    let report = fx.session.run(&mut input, &mut Vec::new()).unwrap();

    assert_eq!(report.reason, StopReason::IdleTimeout);
    assert!(report.is_clean());
    assert!(input.waits >= 1);
    assert_eq!(
        fx.session.state(),
        SessionState::Stopped(StopReason::IdleTimeout)
    );

    // Teardown ran: clipboard cleared once, lock released, vault closed.
    assert_eq!(fx.clipboard.0.lock().unwrap().clears, 1);
    assert!(!marker_path(&fx.path).exists());
    assert!(fx.session.vault().is_closed());

    // It never runs again, neither on an explicit stop nor on drop.
    assert!(fx.session.stop(StopReason::Quit).is_none());
    fs::remove_file(&fx.path).unwrap();
    let Fixture {
        session, clipboard, path, ..
    } = fx;
    drop(session);
    assert!(!path.exists(), "vault was saved a second time");
    assert_eq!(clipboard.0.lock().unwrap().clears, 1);
}

#[test]
fn activity_postpones_idle_timeout() {
    let mut fx = fixture_with_timeout(Duration::from_millis(200));

    // Each line arrives after 120ms: well past half the timeout, but the
    // clock restarts after every accepted command.
    struct Slow(VecDeque<&'static str>);
    impl LineSource for Slow {
        fn next_line(&mut self, timeout: Duration) -> Result<Input> {
            match self.0.pop_front() {
                Some(line) => {
                    thread::sleep(Duration::from_millis(120).min(timeout));
                    Ok(Input::Line(line.to_string()))
                }
                None => {
                    thread::sleep(timeout);
                    Ok(Input::TimedOut)
                }
            }
        }
    }

    let mut input = Slow(VecDeque::from(["list", "list", "add mail hunter2"]));
    let report = fx.session.run(&mut input, &mut Vec::new()).unwrap();
    assert_eq!(report.reason, StopReason::IdleTimeout);

    let reopened = Vault::open(&fx.path, b"pw").unwrap();
    assert_eq!(reopened.get("mail").unwrap().secret, "hunter2");
}

#[test]
fn teardown_saves_changes_made_in_session() {
    let mut fx = fixture();
    let (report, _) = run_script(&mut fx, &["add mail hunter2", "delete bank"]);
    assert_eq!(report.reason, StopReason::EndOfInput);

    let reopened = Vault::open(&fx.path, b"pw").unwrap();
    assert_eq!(reopened.locations(), vec!["mail".to_string()]);
}

#[test]
fn interrupt_runs_teardown() {
    let mut fx = fixture();
    let mut input = Script(VecDeque::from([
        Input::Line("add mail hunter2".into()),
        Input::Interrupted,
    ]));
    let report = fx.session.run(&mut input, &mut Vec::new()).unwrap();

    assert_eq!(report.reason, StopReason::Interrupted);
    assert_eq!(fx.clipboard.0.lock().unwrap().clears, 1);
    assert!(!marker_path(&fx.path).exists());
    assert!(Vault::open(&fx.path, b"pw").unwrap().get("mail").is_ok());
}

#[test]
fn clipboard_buffer_is_scrubbed_on_quit() {
    let mut fx = fixture();
    let (report, out) = run_script(&mut fx, &["clip bank", "quit"]);

    assert_eq!(report.reason, StopReason::Quit);
    assert!(!out.contains("s3cr3t"));

    let state = fx.clipboard.0.lock().unwrap();
    assert_eq!(state.writes, 1);
    assert_eq!(state.clears, 1);
    assert_eq!(state.buffer.len(), "s3cr3t".len());
    assert!(state.buffer.iter().all(|&b| b == 0));
}

#[test]
fn run_after_stop_is_rejected() {
    let mut fx = fixture();
    run_script(&mut fx, &["quit"]);
    assert!(fx
        .session
        .run(&mut Script::lines(&["list"]), &mut Vec::new())
        .is_err());
    assert!(matches!(
        fx.session.dispatch("list"),
        Err(CaskError::VaultClosed)
    ));
}

#[test]
fn teardown_reports_save_failure_and_still_closes() {
    let mut fx = fixture();
    fs::remove_file(marker_path(&fx.path)).unwrap();

    let report = fx.session.stop(StopReason::Quit).unwrap();
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors[0], CaskError::LockLost(_)));
    assert!(fx.session.vault().is_closed());
    assert_eq!(fx.clipboard.0.lock().unwrap().clears, 1);
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn errors_are_reported_and_session_continues() {
    let mut fx = fixture();
    let (report, out) = run_script(
        &mut fx,
        &["frobnicate", "get nope", "", "add mail hunter2", "get mail", "exit"],
    );

    assert_eq!(report.reason, StopReason::Quit);
    assert!(out.contains("Unknown command 'frobnicate'"));
    assert!(out.contains("Location 'nope' not found"));
    assert!(out.contains("hunter2"));
}

#[test]
fn dispatch_returns_replies() {
    let mut fx = fixture();
    assert_eq!(fx.session.dispatch("   ").unwrap(), Reply::Nothing);
    assert_eq!(fx.session.dispatch("quit").unwrap(), Reply::Quit);
    assert!(matches!(
        fx.session.dispatch("get bank").unwrap(),
        Reply::Message(text) if text.contains("s3cr3t")
    ));
    assert!(matches!(
        fx.session.dispatch("nope"),
        Err(CaskError::UnknownCommand(_))
    ));
    assert!(matches!(
        fx.session.state(),
        SessionState::Idle { .. }
    ));
}

#[test]
fn completions_follow_vault_changes() {
    let mut fx = fixture();
    assert_eq!(fx.session.complete("get "), vec!["bank".to_string()]);

    fx.session.dispatch("add mail hunter2").unwrap();
    fx.session.dispatch("rename bank savings").unwrap();

    assert_eq!(
        fx.session.complete("get "),
        vec!["mail".to_string(), "savings".to_string()]
    );
    assert_eq!(fx.session.complete("clip s"), vec!["savings".to_string()]);
    assert_eq!(fx.session.complete("ren"), vec!["rename".to_string()]);
}
