//! Legacy URL redirects.
//!
//! Reads `[old, new]` pairs from the redirect list and writes a small HTML
//! page at `<old>.html` that forwards to `<new>.html`, relative to the page.

use crate::{
    config::{BookConfig, ConfigError, defaults},
    log, trace,
};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Redirect page template (embedded at compile time)
const REDIRECT_TEMPLATE: &str = include_str!("embed/redirect.html");

/// One entry of the redirect list: a moved page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct Redirect {
    /// Old location, relative to the book root, without `.html`
    pub old: String,
    /// New location, relative to the book root, without `.html`
    pub new: String,
}

impl From<(String, String)> for Redirect {
    fn from((old, new): (String, String)) -> Self {
        Self { old, new }
    }
}

impl Redirect {
    /// File this redirect is written to, under `book_dir`.
    pub fn page_path(&self, book_dir: &Path) -> PathBuf {
        book_dir.join(format!("{}.html", self.old))
    }

    /// Render the HTML page for this redirect.
    pub fn render(&self) -> String {
        let old = split_path(&self.old);
        let from_dir = &old[..old.len().saturating_sub(1)];
        let root = relative_path(from_dir, &[]);
        let target = format!("{}.html", relative_path(from_dir, &split_path(&self.new)));

        REDIRECT_TEMPLATE
            .replace("{{ root }}", &root)
            .replace("{{ target }}", &target)
    }
}

/// Read the redirect list.
pub fn load_redirects(path: &Path) -> Result<Vec<Redirect>> {
    let content =
        fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
    let redirects = serde_json::from_str(&content)
        .map_err(|err| ConfigError::Redirects(path.to_path_buf(), err))?;
    Ok(redirects)
}

/// Write one page per redirect under `book_dir`, in list order.
///
/// Later entries with the same old path overwrite earlier ones.
pub fn write_redirects(redirects: &[Redirect], book_dir: &Path) -> Result<()> {
    for redirect in redirects {
        let page = redirect.page_path(book_dir);
        trace!("redirect {:?} -> {:?}", redirect.old, redirect.new);

        if let Some(parent) = page.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&page, redirect.render())
            .with_context(|| format!("Failed to write redirect {}", page.display()))?;
    }
    Ok(())
}

/// Generate the configured redirects into `book_dir`.
///
/// Returns the number of pages written. A missing redirect list is not an
/// error; the step is skipped.
pub fn generate_redirects(config: &BookConfig, book_dir: &Path) -> Result<usize> {
    let list = config.redirects_file();
    if !list.exists() {
        if config.build.redirects != defaults::build::redirects() {
            bail!("redirect list {} not found", list.display());
        }
        log!("redirect"; "no {}, skipping", config.build.redirects.display());
        return Ok(0);
    }

    let redirects = load_redirects(&list)?;
    write_redirects(&redirects, book_dir)?;
    log!("redirect"; "wrote {} pages", redirects.len());
    Ok(redirects.len())
}

// ============================================================================
// Path Helpers
// ============================================================================

/// Split a relative path on either separator, resolving `.` and `..`.
fn split_path(path: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." if parts.last().is_some_and(|p| *p != "..") => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    parts
}

/// Relative path from directory `from` to `to`, joined with `/`.
fn relative_path(from: &[&str], to: &[&str]) -> String {
    let common = from.iter().zip(to).take_while(|(a, b)| a == b).count();

    let parts: Vec<&str> = std::iter::repeat_n("..", from.len() - common)
        .chain(to[common..].iter().copied())
        .collect();

    if parts.is_empty() {
        ".".to_owned()
    } else {
        parts.join("/")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn redirect(old: &str, new: &str) -> Redirect {
        Redirect {
            old: old.into(),
            new: new.into(),
        }
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("a/b/c"), vec!["a", "b", "c"]);
        assert_eq!(split_path("a\\b"), vec!["a", "b"]);
        assert_eq!(split_path("./a//b/../c"), vec!["a", "c"]);
        assert_eq!(split_path("../a"), vec!["..", "a"]);
        assert!(split_path("").is_empty());
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path(&["old"], &["new", "dir", "page"]), "../new/dir/page");
        assert_eq!(relative_path(&[], &["page"]), "page");
        assert_eq!(relative_path(&["a", "b"], &["a", "c"]), "../c");
        assert_eq!(relative_path(&["a"], &[]), "..");
        assert_eq!(relative_path(&[], &[]), ".");
    }

    #[test]
    fn test_render_nested() {
        let html = redirect("old/page", "new/dir/page").render();
        assert!(html.contains(r#"<meta http-equiv="refresh" content="0; url=../new/dir/page.html">"#));
        assert!(html.contains(r#"<a href="../new/dir/page.html">"#));
        assert!(html.contains(r#"href="../book.css""#));
    }

    #[test]
    fn test_render_at_book_root() {
        let html = redirect("intro", "chapters/intro").render();
        assert!(html.contains("url=chapters/intro.html"));
        assert!(html.contains(r#"href="./book.css""#));
    }

    #[test]
    fn test_render_backslash_paths() {
        let html = redirect("old\\page", "new\\page").render();
        assert!(html.contains("url=../new/page.html"));
    }

    #[test]
    fn test_generate_writes_pages() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("redirects.json"),
            r#"[["old/page", "new/dir/page"], ["legacy", "modern"]]"#,
        )
        .unwrap();
        let config = BookConfig::default().with_root(dir.path());
        let book = dir.path().join("_book");

        let count = generate_redirects(&config, &book).unwrap();
        assert_eq!(count, 2);

        let page = fs::read_to_string(book.join("old/page.html")).unwrap();
        assert!(page.contains("../new/dir/page.html"));
        assert!(book.join("legacy.html").exists());
    }

    #[test]
    fn test_duplicate_old_path_last_wins() {
        let dir = TempDir::new().unwrap();
        let redirects = [redirect("a", "first"), redirect("a", "second")];
        write_redirects(&redirects, dir.path()).unwrap();

        let page = fs::read_to_string(dir.path().join("a.html")).unwrap();
        assert!(page.contains("second.html"));
        assert!(!page.contains("first.html"));
    }

    #[test]
    fn test_missing_list_is_skipped() {
        let dir = TempDir::new().unwrap();
        let config = BookConfig::default().with_root(dir.path());
        assert_eq!(generate_redirects(&config, dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_missing_configured_list_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = BookConfig::default().with_root(dir.path());
        config.build.redirects = "redirect.json".into();

        let err = generate_redirects(&config, dir.path()).unwrap_err();
        assert!(err.to_string().contains("redirect.json"));
    }

    #[test]
    fn test_malformed_list_fails() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("redirects.json");

        fs::write(&list, r#"[["only-one"]]"#).unwrap();
        let err = load_redirects(&list).unwrap_err();
        assert!(err.to_string().contains("redirects.json"));

        fs::write(&list, "not json").unwrap();
        assert!(load_redirects(&list).is_err());
    }
}
