//! Logging utilities with colored output and build tracing.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `trace!` macro for `$ `-prefixed diagnostic lines on stderr
//! - the process-wide trace flag, which can be switched on but never off
//!
//! # Example
//!
//! ```ignore
//! log!("build"; "rendering {}", text.display());
//! trace!("merge_copy({:?}, {:?})", src, dst);
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{Write, stderr, stdout},
    sync::{
        OnceLock,
        atomic::{AtomicBool, Ordering},
    },
};

/// Environment variable that turns build tracing on at startup.
pub const TRACE_ENV: &str = "BOOKPRESS_TRACE";

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Whether trace lines are emitted. Only ever goes from false to true.
static TRACE: AtomicBool = AtomicBool::new(false);

// ============================================================================
// Layout Constants
// ============================================================================

/// Length of brackets around module name: "[]"
const BRACKET_LEN: usize = 2;
/// Space after prefix: "[module] " <- this space
const SPACE_AFTER_PREFIX: usize = 1;

/// Calculate total prefix length for a module name.
///
/// Returns: `module.len() + 3` (for `[`, `]`, and trailing space)
#[inline]
const fn calc_prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

/// Get terminal width, cached after first call.
/// Falls back to 120 columns if detection fails.
fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

// ============================================================================
// Macros
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Emit a diagnostic line on stderr when tracing is enabled.
///
/// Arguments are only formatted when the flag is on.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {{
        if $crate::logger::trace_enabled() {
            $crate::logger::trace_line(&format!($($arg)*))
        }
    }};
}

// ============================================================================
// Trace Flag
// ============================================================================

/// Interpret a boolean-like environment value.
///
/// Unset or empty is off, as are `0`, `false`, `no` and `off`.
fn parse_trace_value(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"),
    }
}

/// Read [`TRACE_ENV`] and switch tracing on if requested.
pub fn init_trace_from_env() {
    let value = std::env::var(TRACE_ENV).ok();
    if parse_trace_value(value.as_deref()) {
        enable_trace();
    }
}

/// Switch tracing on for the rest of the process.
pub fn enable_trace() {
    TRACE.store(true, Ordering::SeqCst);
}

#[inline]
pub fn trace_enabled() -> bool {
    TRACE.load(Ordering::SeqCst)
}

/// Write a single `$ `-prefixed line to stderr.
pub fn trace_line(message: &str) {
    let mut stderr = stderr().lock();
    writeln!(stderr, "{} {}", "$".dimmed(), message).ok();
    stderr.flush().ok();
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix.
///
/// Automatically truncates long single-line messages to fit terminal width.
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);
    let width = get_terminal_width() as usize;

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();

    if message.contains('\n') {
        // Multiline output (error chains) is never truncated
        writeln!(stdout, "{prefix} {message}").ok();
    } else {
        let prefix_len = calc_prefix_len(module.len());
        let max_msg_len = width.saturating_sub(prefix_len);
        writeln!(stdout, "{prefix} {}", truncate_str(message, max_msg_len)).ok();
    }

    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "publish" | "git" => prefix.bright_blue().bold(),
        "watch" => prefix.bright_green().bold(),
        "error" | "warn" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate a string to fit within `max_len` bytes.
///
/// Ensures the result is valid UTF-8 by finding the nearest character boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Tests
// ============================================================================
