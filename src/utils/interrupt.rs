//! Ctrl+C handling shared by long-running commands.
//!
//! The handler only records the interrupt. Child processes receive the
//! signal themselves and fail, so callers unwind through `?` and every
//! scoped guard still runs.

use crate::log;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};

static INSTALLED: AtomicBool = AtomicBool::new(false);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the process-wide Ctrl+C handler. Later calls are no-ops.
pub fn install_handler() -> Result<()> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    ctrlc::set_handler(|| {
        log!("signal"; "interrupted, cleaning up...");
        INTERRUPTED.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")
}

/// Whether Ctrl+C has been pressed since the handler was installed.
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
