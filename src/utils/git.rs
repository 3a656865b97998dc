//! Git operations for publishing.
//!
//! Repository state (current branch, HEAD commit, branch existence) is read
//! with `gix`. Everything that changes a repository (clone, commit, push) goes
//! through the `git` binary so the user's credentials and hooks apply.

use crate::{exec, exec_capture, log};
use anyhow::{Context, Result};
use gix::Repository;
use std::path::Path;

/// Length of abbreviated commit ids in publish messages.
const SHORT_ID_LEN: usize = 7;

// ============================================================================
// Repository Queries
// ============================================================================

/// The commit a publish is made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadCommit {
    pub id: String,
    pub short_id: String,
    /// First line of the commit message
    pub summary: String,
}

/// Open an existing git repository
pub fn open_repo(root: &Path) -> Result<Repository> {
    gix::open(root).with_context(|| format!("`{}` is not a git repository", root.display()))
}

/// Short name of the checked-out branch, `None` when HEAD is detached.
pub fn current_branch(root: &Path) -> Result<Option<String>> {
    let repo = open_repo(root)?;
    let name = repo.head_name()?;
    Ok(name.map(|name| name.shorten().to_string()))
}

/// Id and summary of the HEAD commit.
pub fn head_commit(root: &Path) -> Result<HeadCommit> {
    let repo = open_repo(root)?;
    let commit = repo.head_commit().context("Repository has no commits yet")?;
    let summary = commit.message()?.summary().to_string();

    Ok(HeadCommit {
        id: commit.id.to_string(),
        short_id: commit.id.to_hex_with_len(SHORT_ID_LEN).to_string(),
        summary,
    })
}

/// Whether `refs/heads/<branch>` exists.
pub fn local_branch_exists(root: &Path, branch: &str) -> Result<bool> {
    reference_exists(&open_repo(root)?, &format!("refs/heads/{branch}"))
}

/// Whether `refs/remotes/<remote>/<branch>` exists.
pub fn remote_branch_exists(root: &Path, remote: &str, branch: &str) -> Result<bool> {
    reference_exists(&open_repo(root)?, &format!("refs/remotes/{remote}/{branch}"))
}

fn reference_exists(repo: &Repository, name: &str) -> Result<bool> {
    Ok(repo.try_find_reference(name)?.is_some())
}

// ============================================================================
// Repository Mutations
// ============================================================================

/// Clone `branch` of the repository at `source` into `dest`.
pub fn clone_branch(source: &Path, branch: &str, dest: &Path) -> Result<()> {
    log!("git"; "cloning {branch}");
    exec!(["git"]; "clone", "--quiet", "--branch", branch, source, dest)
}

/// Create local `branch` pointing at `start` (e.g. `origin/gh-pages`).
pub fn create_branch(root: &Path, branch: &str, start: &str) -> Result<()> {
    exec!(root; ["git"]; "branch", "--quiet", branch, start)
}

/// Switch the work tree to a new branch with no history and no files.
pub fn checkout_empty_orphan(root: &Path, branch: &str) -> Result<()> {
    exec!(root; ["git"]; "checkout", "--quiet", "--orphan", branch)?;
    exec!(root; ["git"]; "rm", "-r", "-f", "--quiet", "--ignore-unmatch", ".")
}

/// Stage every change in the work tree, deletions included.
pub fn add_all(root: &Path) -> Result<()> {
    exec!(root; ["git"]; "add", "--all")
}

/// Whether the index or work tree differs from HEAD.
pub fn has_changes(root: &Path) -> Result<bool> {
    let status = exec_capture!(root; ["git"]; "status", "--porcelain")?;
    Ok(!status.is_empty())
}

/// Record a commit; `allow_empty` permits a commit without changes.
pub fn commit(root: &Path, message: &str, allow_empty: bool) -> Result<()> {
    if allow_empty {
        exec!(root; ["git"]; "commit", "--quiet", "--allow-empty", "-m", message)
    } else {
        exec!(root; ["git"]; "commit", "--quiet", "-m", message)
    }
}

/// Push `branches` to `remote`.
pub fn push(root: &Path, remote: &str, branches: &[&str]) -> Result<()> {
    log!("git"; "pushing {} to {remote}", branches.join(", "));
    let mut cmd = vec!["git".to_owned(), "push".to_owned(), remote.to_owned()];
    cmd.extend(branches.iter().map(|b| (*b).to_owned()));
    exec!(root; &cmd;)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    pub(crate) fn git_available() -> bool {
        which::which("git").is_ok()
    }

    /// Commit identity for repositories the code under test clones itself.
    pub(crate) fn set_identity_env() {
        static IDENTITY: std::sync::Once = std::sync::Once::new();
        IDENTITY.call_once(|| {
            for (key, value) in [
                ("GIT_AUTHOR_NAME", "Book Author"),
                ("GIT_AUTHOR_EMAIL", "author@example.com"),
                ("GIT_COMMITTER_NAME", "Book Author"),
                ("GIT_COMMITTER_EMAIL", "author@example.com"),
            ] {
                // SAFETY: every reader in this binary goes through `std::env`
                // or `Command`, which share std's environment lock.
                unsafe { std::env::set_var(key, value) };
            }
        });
    }

    /// Repository on `master` with one commit and a local identity.
    pub(crate) fn init_repo(dir: &Path) {
        exec!(dir; ["git"]; "init", "--quiet").unwrap();
        exec!(dir; ["git"]; "symbolic-ref", "HEAD", "refs/heads/master").unwrap();
        exec!(dir; ["git"]; "config", "user.name", "Book Author").unwrap();
        exec!(dir; ["git"]; "config", "user.email", "author@example.com").unwrap();
        fs::write(dir.join("README.md"), "book\n").unwrap();
        add_all(dir).unwrap();
        commit(dir, "Add readme\n\nLonger description.", false).unwrap();
    }

    #[test]
    fn test_current_branch_and_head() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());

        assert_eq!(current_branch(dir.path()).unwrap().as_deref(), Some("master"));

        let head = head_commit(dir.path()).unwrap();
        assert_eq!(head.summary, "Add readme");
        assert_eq!(head.short_id.len(), SHORT_ID_LEN);
        assert!(head.id.starts_with(&head.short_id));
    }

    #[test]
    fn test_branch_existence() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());

        assert!(local_branch_exists(dir.path(), "master").unwrap());
        assert!(!local_branch_exists(dir.path(), "gh-pages").unwrap());
        assert!(!remote_branch_exists(dir.path(), "origin", "gh-pages").unwrap());

        create_branch(dir.path(), "gh-pages", "master").unwrap();
        assert!(local_branch_exists(dir.path(), "gh-pages").unwrap());
    }

    #[test]
    fn test_staged_changes() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        assert!(!has_changes(dir.path()).unwrap());

        fs::write(dir.path().join("new.md"), "x").unwrap();
        add_all(dir.path()).unwrap();
        assert!(has_changes(dir.path()).unwrap());
    }

    #[test]
    fn test_clone_branch() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        fs::create_dir(&source).unwrap();
        init_repo(&source);

        let dest = dir.path().join("clone");
        clone_branch(&source, "master", &dest).unwrap();
        assert!(dest.join("README.md").exists());
        assert!(remote_branch_exists(&dest, "origin", "master").unwrap());
    }

    #[test]
    fn test_open_non_repo_fails() {
        let dir = TempDir::new().unwrap();
        assert!(current_branch(dir.path()).is_err());
    }
}
