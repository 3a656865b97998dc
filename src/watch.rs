//! File watcher for rebuild-on-change.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  event   ┌───────────────────────┐  poll 500ms  ┌─────────────┐
//! │ notify       │─────────▶│ Debouncer             │◀─────────────│ watch loop  │
//! │ (own thread) │          │ Mutex<Option<Instant>>│   take_due   │ build_book  │
//! └──────────────┘          └───────────────────────┘              └─────────────┘
//! ```
//!
//! The first event after idle schedules a rebuild 250ms later. Events that
//! arrive while a rebuild is pending do not move the deadline.

use crate::{config::BookConfig, log};
use anyhow::Result;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

// =============================================================================
// Constants
// =============================================================================

#[cfg_attr(not(feature = "watch"), allow(dead_code))]
const DEBOUNCE: Duration = Duration::from_millis(250);
#[cfg(feature = "watch")]
const POLL_INTERVAL: Duration = Duration::from_millis(500);

// =============================================================================
// Debounce State
// =============================================================================

/// Single-slot rebuild schedule shared by the observer thread and the loop.
#[cfg_attr(not(feature = "watch"), allow(dead_code))]
#[derive(Debug, Default)]
pub struct Debouncer {
    scheduled: Mutex<Option<Instant>>,
}

#[cfg_attr(not(feature = "watch"), allow(dead_code))]
impl Debouncer {
    /// Record an event seen at `now`. Only schedules when idle.
    pub fn notify(&self, now: Instant) {
        let mut scheduled = self.scheduled.lock();
        if scheduled.is_none() {
            *scheduled = Some(now + DEBOUNCE);
        }
    }

    /// Clear the schedule and return `true` if its deadline has passed.
    pub fn take_due(&self, now: Instant) -> bool {
        let mut scheduled = self.scheduled.lock();
        match *scheduled {
            Some(deadline) if now >= deadline => {
                *scheduled = None;
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// Watch Loop
// =============================================================================

/// Rebuild the book whenever the text or static directory changes.
///
/// Blocks until Ctrl+C.
#[cfg(feature = "watch")]
pub fn watch_book(config: &BookConfig) -> Result<()> {
    use crate::utils::interrupt;
    use notify::{Event, EventKind, RecursiveMode, Watcher};
    use std::sync::Arc;

    let debouncer = Arc::new(Debouncer::default());
    let observer_side = Arc::clone(&debouncer);
    let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if !matches!(event.kind, EventKind::Access(_)) => {
            observer_side.notify(Instant::now());
        }
        Ok(_) => {}
        Err(err) => log!("watch"; "error: {err}"),
    });
    let mut watcher = match watcher {
        Ok(watcher) => watcher,
        Err(err) => {
            log!("watch"; "cannot watch files on this system: {err}");
            log!("watch"; "run `bookpress build` after each edit instead");
            return Ok(());
        }
    };

    let mut watched = Vec::new();
    for dir in [config.text_dir(), config.static_dir()] {
        if dir.is_dir() {
            watcher.watch(&dir, RecursiveMode::Recursive)?;
            watched.push(dir.display().to_string());
        }
    }
    if watched.is_empty() {
        log!("watch"; "nothing to watch: {} does not exist", config.text_dir().display());
        return Ok(());
    }

    interrupt::install_handler()?;
    log!("watch"; "watching {}, press Ctrl+C to stop", watched.join(", "));

    while !interrupt::is_interrupted() {
        std::thread::sleep(POLL_INTERVAL);
        if debouncer.take_due(Instant::now()) {
            rebuild(config);
        }
    }

    // Stops and joins the observer thread.
    drop(watcher);
    log!("watch"; "stopped");
    Ok(())
}

#[cfg(not(feature = "watch"))]
pub fn watch_book(_config: &BookConfig) -> Result<()> {
    log!("watch"; "file watching is not available in this build");
    log!("watch"; "reinstall with `cargo install bookpress --features watch`, or run `bookpress build` after each edit");
    Ok(())
}

/// Full rebuild. Failures are logged and turn tracing on for good.
#[cfg(feature = "watch")]
fn rebuild(config: &BookConfig) {
    log!("watch"; "change detected, rebuilding...");
    if let Err(err) = crate::build::build_book(config) {
        log!("watch"; "build failed");
        log!("error"; "{err:#}");
        crate::logger::enable_trace();
    }
}

// ============================================================================
// Tests
// ============================================================================
