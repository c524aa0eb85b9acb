//! Line input from stdin with an idle deadline.
//!
//! Reading stdin blocks, so a helper thread does the reading.  It only
//! reads when asked (one request, one line), which keeps it away from the
//! terminal while a command is showing its own prompt.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use console::Term;

use crate::errors::Result;
use crate::session::{Input, LineSource};

/// How often a waiting read checks the interrupt flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct StdinSource {
    requests: Sender<()>,
    lines: Receiver<io::Result<Option<String>>>,
    interrupted: Arc<AtomicBool>,
    /// A read has been requested and its line not yet received.
    pending: bool,
}

impl StdinSource {
    /// `prompt` is shown before each read when stdout is a terminal.
    pub fn new(prompt: &str, interrupted: Arc<AtomicBool>) -> Self {
        let prompt = prompt.to_string();
        let show_prompt = Term::stdout().is_term();

        Self::spawn(interrupted, move |line| {
            if show_prompt {
                print!("{prompt}");
                let _ = io::stdout().flush();
            }
            io::stdin().lock().read_line(line)
        })
    }

    /// Read lines from `reader` instead of stdin, without a prompt.
    pub fn from_reader<R>(mut reader: R, interrupted: Arc<AtomicBool>) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self::spawn(interrupted, move |line| reader.read_line(line))
    }

    fn spawn<F>(interrupted: Arc<AtomicBool>, mut read_line: F) -> Self
    where
        F: FnMut(&mut String) -> io::Result<usize> + Send + 'static,
    {
        let (requests, request_rx) = mpsc::channel::<()>();
        let (line_tx, lines) = mpsc::channel();

        thread::spawn(move || {
            while request_rx.recv().is_ok() {
                let mut line = String::new();
                let result = match read_line(&mut line) {
                    Ok(0) => Ok(None),
                    Ok(_) => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
                    Err(e) => Err(e),
                };
                let finished = !matches!(result, Ok(Some(_)));
                if line_tx.send(result).is_err() || finished {
                    break;
                }
            }
        });

        Self {
            requests,
            lines,
            interrupted,
            pending: false,
        }
    }
}

impl LineSource for StdinSource {
    fn next_line(&mut self, timeout: Duration) -> Result<Input> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Ok(Input::Interrupted);
        }
        if !self.pending {
            if self.requests.send(()).is_err() {
                return Ok(Input::Eof);
            }
            self.pending = true;
        }

        // `None` when the timeout is beyond what `Instant` can represent.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                return Ok(Input::Interrupted);
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Input::TimedOut);
                    }
                    (deadline - now).min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };

            match self.lines.recv_timeout(wait) {
                Ok(result) => {
                    self.pending = false;
                    return match result? {
                        Some(line) => Ok(Input::Line(line)),
                        None => Ok(Input::Eof),
                    };
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(Input::Eof),
            }
        }
    }
}
