//! External command execution utilities.
//!
//! Provides macros and functions for running external programs (the book
//! renderer, `git`, the platform opener) with tracing and error reporting.

use crate::{log, trace};
use anyhow::{Context, Result, bail};
use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Stdio},
};

// ============================================================================
// Macros
// ============================================================================

/// Run an external command with inherited stdio, failing on non-zero exit.
///
/// # Examples
/// ```ignore
/// // Without working directory
/// exec!(["git"]; "status", "-s")?;
///
/// // With working directory
/// exec!(root; &config.build.renderer; text)?;
/// ```
#[macro_export]
macro_rules! exec {
    ($cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::command::exec(
            None,
            &$crate::utils::command::to_cmd_vec($cmd),
            &[$($crate::utils::command::to_os($arg)),*],
        )
    }};
    ($root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::command::exec(
            Some($root),
            &$crate::utils::command::to_cmd_vec($cmd),
            &[$($crate::utils::command::to_os($arg)),*],
        )
    }};
}

/// Run an external command and return its stdout as text.
///
/// Output is trimmed unless `trim=false;` is given first.
///
/// # Examples
/// ```ignore
/// let head = exec_capture!(root; ["git"]; "rev-parse", "HEAD")?;
/// let raw = exec_capture!(trim=false; root; ["git"]; "log", "-1")?;
/// ```
#[macro_export]
macro_rules! exec_capture {
    (trim=$trim:expr; $($rest:tt)*) => {
        $crate::exec_capture_internal!($trim; $($rest)*)
    };
    ($($rest:tt)*) => {
        $crate::exec_capture_internal!(true; $($rest)*)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! exec_capture_internal {
    ($trim:expr; $cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::command::exec_capture(
            None,
            &$crate::utils::command::to_cmd_vec($cmd),
            &[$($crate::utils::command::to_os($arg)),*],
            $trim,
        )
    }};
    ($trim:expr; $root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::command::exec_capture(
            Some($root),
            &$crate::utils::command::to_cmd_vec($cmd),
            &[$($crate::utils::command::to_os($arg)),*],
            $trim,
        )
    }};
}

// ============================================================================
// Argument Conversion
// ============================================================================

/// Convert to `OsString`.
#[inline]
pub fn to_os<S: Into<OsString>>(s: S) -> OsString {
    s.into()
}

/// Trait for converting to command vector.
pub trait ToCmd {
    fn to_cmd(self) -> Vec<OsString>;
}

impl<const N: usize> ToCmd for [&str; N] {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.into_iter().map(OsString::from).collect()
    }
}

impl ToCmd for &[String] {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.iter().map(OsString::from).collect()
    }
}

impl ToCmd for &Vec<String> {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.iter().map(OsString::from).collect()
    }
}

/// Convert command to `Vec<OsString>`.
#[inline]
pub fn to_cmd_vec<C: ToCmd>(cmd: C) -> Vec<OsString> {
    cmd.to_cmd()
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute a command with inherited stdio.
///
/// # Errors
/// Returns error if the command cannot be started or exits non-zero.
pub fn exec(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<()> {
    let (name, mut command) = prepare(root, cmd, args)?;

    let status = command
        .status()
        .with_context(|| format!("Failed to execute `{name}`"))
        .inspect_err(|_| trace!("FAILED!"))?;

    if !status.success() {
        trace!("FAILED!");
        bail!("Command `{name}` failed with {status}");
    }
    Ok(())
}

/// Execute a command and return its stdout decoded as UTF-8.
///
/// Stderr of a successful run is forwarded to the log.
///
/// # Errors
/// Returns error if the command cannot be started, exits non-zero, or
/// prints invalid UTF-8.
pub fn exec_capture(
    root: Option<&Path>,
    cmd: &[OsString],
    args: &[OsString],
    trim: bool,
) -> Result<String> {
    let (name, mut command) = prepare(root, cmd, args)?;

    let output = command
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))
        .inspect_err(|_| trace!("FAILED!"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();

    if !output.status.success() {
        trace!("FAILED!");
        if stderr.is_empty() {
            bail!("Command `{name}` failed with {}", output.status);
        }
        bail!("Command `{name}` failed with {}\n{stderr}", output.status);
    }

    for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
        log!(&name; "{line}");
    }

    let stdout = String::from_utf8(output.stdout)
        .with_context(|| format!("Invalid UTF-8 in stdout of `{name}`"))?;

    Ok(if trim { stdout.trim().to_owned() } else { stdout })
}

/// Prepare a Command from components and trace the invocation.
fn prepare(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<(String, Command)> {
    let name = cmd
        .first()
        .and_then(|s| s.to_str())
        .context("Empty command")?
        .to_owned();

    trace!("{}", render_command_line(cmd.iter().chain(args)));

    let mut command = Command::new(&cmd[0]);
    command.args(&cmd[1..]).args(args);

    if let Some(dir) = root {
        command.current_dir(dir);
    }

    Ok((name, command))
}

/// Join escaped arguments into a single human-readable line.
fn render_command_line<'a>(parts: impl Iterator<Item = &'a OsString>) -> String {
    parts
        .map(|part| escape_argument(&part.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Escaping
// ============================================================================

/// Characters `cmd.exe` treats as syntax rather than text.
const CMD_META_CHARS: &[char] = &['(', ')', '%', '!', '^', '"', '<', '>', '&', '|'];

/// Escape an argument for `CommandLineToArgvW` and then for `cmd.exe`.
///
/// Arguments that are empty or contain whitespace or quotes are wrapped in
/// quotes (inner quotes backslash-escaped). Every `cmd.exe` metacharacter is
/// then caret-escaped so the interpreter passes it through literally.
pub fn escape_argument(arg: &str) -> String {
    let quoted = if arg.is_empty() || arg.contains(|c: char| c == '"' || c.is_whitespace()) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_owned()
    };
    escape_for_cmd_exe(&quoted)
}

/// Caret-escape `cmd.exe` metacharacters in an already-quoted argument.
fn escape_for_cmd_exe(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len());
    for c in arg.chars() {
        if CMD_META_CHARS.contains(&c) {
            out.push('^');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Undo `cmd.exe` caret escaping, then split like `CommandLineToArgvW`.
    fn parse_like_cmd_exe(line: &str) -> Vec<String> {
        let mut unescaped = String::new();
        let mut chars = line.chars();
        while let Some(c) = chars.next() {
            if c == '^' {
                if let Some(next) = chars.next() {
                    unescaped.push(next);
                }
            } else {
                unescaped.push(c);
            }
        }

        let mut args = Vec::new();
        let mut current = String::new();
        let mut in_arg = false;
        let mut in_quotes = false;
        let mut backslashes = 0usize;
        for c in unescaped.chars() {
            match c {
                '\\' => {
                    backslashes += 1;
                    in_arg = true;
                }
                '"' => {
                    current.extend(std::iter::repeat_n('\\', backslashes / 2));
                    if backslashes % 2 == 1 {
                        current.push('"');
                    } else {
                        in_quotes = !in_quotes;
                    }
                    backslashes = 0;
                    in_arg = true;
                }
                c if c.is_whitespace() && !in_quotes => {
                    current.extend(std::iter::repeat_n('\\', backslashes));
                    backslashes = 0;
                    if in_arg {
                        args.push(std::mem::take(&mut current));
                        in_arg = false;
                    }
                }
                c => {
                    current.extend(std::iter::repeat_n('\\', backslashes));
                    backslashes = 0;
                    current.push(c);
                    in_arg = true;
                }
            }
        }
        current.extend(std::iter::repeat_n('\\', backslashes));
        if in_arg {
            args.push(current);
        }
        args
    }

    #[test]
    fn test_escape_plain_argument_unchanged() {
        assert_eq!(escape_argument("hello"), "hello");
        assert_eq!(escape_argument("text/ch01.md"), "text/ch01.md");
    }

    #[test]
    fn test_escape_quotes_and_spaces() {
        assert_eq!(
            escape_argument(r#"he said "hi""#),
            r#"^"he said \^"hi\^"^""#
        );
    }

    #[test]
    fn test_escape_meta_chars() {
        assert_eq!(escape_argument("a&b|c"), "a^&b^|c");
        assert_eq!(escape_argument("100%"), "100^%");
        assert_eq!(escape_argument("(x)<y>!^"), "^(x^)^<y^>^!^^");
    }

    #[test]
    fn test_escape_empty_argument() {
        assert_eq!(escape_argument(""), "^\"^\"");
        assert_eq!(parse_like_cmd_exe(&escape_argument("")), vec![String::new()]);
    }

    #[test]
    fn test_escape_round_trips_through_cmd_exe_rules() {
        for arg in [r#"he said "hi""#, "two words", "a&b", "50% (off)", "plain"] {
            let parsed = parse_like_cmd_exe(&escape_argument(arg));
            assert_eq!(parsed, vec![arg.to_string()], "round trip of {arg:?}");
        }
    }

    #[test]
    fn test_render_command_line() {
        let parts = [OsString::from("git"), OsString::from("commit"), OsString::from("-m"), OsString::from("a b")];
        assert_eq!(render_command_line(parts.iter()), r#"git commit -m ^"a b^""#);
    }

    #[test]
    fn test_to_cmd_vec() {
        let cmd = to_cmd_vec(["git", "status"]);
        assert_eq!(cmd, vec![OsString::from("git"), OsString::from("status")]);

        let v = vec!["rustbook".to_string(), "build".to_string()];
        assert_eq!(to_cmd_vec(&v).len(), 2);
    }

    #[test]
    fn test_prepare_empty() {
        assert!(prepare(None, &[], &[]).is_err());
    }

    #[test]
    fn test_prepare_valid() {
        let (name, _) = prepare(None, &to_cmd_vec(["echo"]), &[OsString::from("hi")]).unwrap();
        assert_eq!(name, "echo");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_status() {
        assert!(crate::exec!(["true"];).is_ok());

        let err = crate::exec!(["false"];).unwrap_err();
        assert!(err.to_string().contains("`false` failed"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_capture_trims_by_default() {
        let out = crate::exec_capture!(["sh"]; "-c", "printf '  hi  \n'").unwrap();
        assert_eq!(out, "hi");

        let raw = crate::exec_capture!(trim=false; ["sh"]; "-c", "printf '  hi  \n'").unwrap();
        assert_eq!(raw, "  hi  \n");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_capture_in_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let out = crate::exec_capture!(dir.path(); ["ls"];).unwrap();
        assert_eq!(out, "marker.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_capture_failure_includes_stderr() {
        let err = crate::exec_capture!(["sh"]; "-c", "echo broken >&2; exit 3").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`sh` failed"));
        assert!(msg.contains("broken"));
    }
}
