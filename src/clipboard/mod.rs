//! Clipboard collaborator.
//!
//! The session only relies on the `Clipboard` contract: `write` places a
//! secret where the user can paste it, and `clear` scrubs it again.  The
//! session calls `clear` on every stop path.
//!
//! `SystemClipboard` is the `arboard` adapter.  Each copied secret is
//! owned by a worker thread that keeps the clipboard selection alive
//! (needed on X11/Wayland) and wipes it after `clear_after`, or sooner when
//! `clear` is called.  The clipboard is only blanked if it still holds our
//! secret, so something the user copied in the meantime survives.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use zeroize::Zeroizing;

use crate::errors::{CaskError, Result};

/// Write-then-scrub clipboard contract.
pub trait Clipboard {
    /// Copy `secret` for an external paste.
    fn write(&mut self, secret: &str) -> Result<()>;

    /// Scrub whatever secret `write` placed.  Must be safe to call when
    /// nothing was written.
    fn clear(&mut self) -> Result<()>;
}

struct Worker {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

/// System clipboard with scheduled auto-clear.
pub struct SystemClipboard {
    clear_after: Duration,
    worker: Option<Worker>,
}

impl SystemClipboard {
    pub fn new(clear_after: Duration) -> Self {
        Self {
            clear_after,
            worker: None,
        }
    }

    /// Delay before a copied secret is wiped automatically.
    pub fn clear_after(&self) -> Duration {
        self.clear_after
    }
}

impl Clipboard for SystemClipboard {
    fn write(&mut self, secret: &str) -> Result<()> {
        // Only one secret on the clipboard at a time.
        self.clear()?;

        let secret = Zeroizing::new(secret.to_string());
        let clear_after = self.clear_after;
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let mut board = match arboard::Clipboard::new() {
                Ok(board) => board,
                Err(e) => {
                    let _ = ready_tx.send(Err(CaskError::Clipboard(e.to_string())));
                    return;
                }
            };
            if let Err(e) = board.set_text(secret.as_str()) {
                let _ = ready_tx.send(Err(CaskError::Clipboard(e.to_string())));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            // Timeout, explicit clear and a dropped handle all end up here.
            let _ = cancel_rx.recv_timeout(clear_after);

            let current = Zeroizing::new(board.get_text().unwrap_or_default());
            if *current == *secret {
                if let Err(e) = board.set_text(String::new()) {
                    tracing::warn!(error = %e, "failed to clear clipboard");
                } else {
                    tracing::debug!("clipboard cleared");
                }
            }
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(Worker {
                    cancel: cancel_tx,
                    handle,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaskError::Clipboard("clipboard worker exited".into()))
            }
        }
    }

    fn clear(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            let _ = worker.cancel.send(());
            worker
                .handle
                .join()
                .map_err(|_| CaskError::Clipboard("clipboard worker panicked".into()))?;
        }
        Ok(())
    }
}

impl Drop for SystemClipboard {
    fn drop(&mut self) {
        if let Err(e) = self.clear() {
            tracing::warn!(error = %e, "failed to clear clipboard on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_without_write_is_a_no_op() {
        let mut clip = SystemClipboard::new(Duration::from_secs(30));
        clip.clear().unwrap();
        clip.clear().unwrap();
        assert_eq!(clip.clear_after(), Duration::from_secs(30));
    }
}
