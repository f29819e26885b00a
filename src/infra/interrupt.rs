// ============================================================
// Layer 6 — Interrupt Handling
// ============================================================
// Ctrl-C cancels cooperatively:
//
//   1st SIGINT → token is cancelled; training finishes the
//                current example, prediction the current line
//   2nd SIGINT → process exits at once with FORCED_EXIT_CODE
//
// The token is handed to the loops explicitly and polled at
// example, line and epoch boundaries.

use anyhow::{Context, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Exit status after a second interrupt (128 + SIGINT).
pub const FORCED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Registers the process-wide SIGINT handler and returns the token it
/// cancels. Can only be installed once per process.
pub fn install_interrupt_handler() -> Result<CancellationToken> {
    let token   = CancellationToken::new();
    let handler = token.clone();

    ctrlc::set_handler(move || {
        if handler.is_cancelled() {
            eprintln!("Second interrupt, exiting immediately.");
            std::process::exit(FORCED_EXIT_CODE);
        }
        eprintln!("Interrupt received, stopping at the next safe point (Ctrl-C again to force).");
        handler.cancel();
    })
    .context("Cannot install the Ctrl-C handler")?;

    Ok(token)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_cancellation() {
        let token = CancellationToken::new();
        let seen_by_loop = token.clone();
        assert!(!seen_by_loop.is_cancelled());
        token.cancel();
        assert!(seen_by_loop.is_cancelled());
    }
}
