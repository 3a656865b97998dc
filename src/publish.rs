//! Publishing the built book to the hosting branch.
//!
//! # Flow
//!
//! ```text
//! publish_book()
//!     │
//!     ├── check: on <primary_branch>
//!     ├── ensure <hosting_branch> exists (local, remote-tracking, or new orphan)
//!     ├── clone <primary_branch>  ──► scratch dir
//!     ├── clone <hosting_branch>  ──► scratch dir
//!     ├── build_book() in the primary clone
//!     ├── merge_copy(output ──► hosting clone), commit, push to origin
//!     └── git push <remote> <primary_branch> <hosting_branch>
//! ```
//!
//! Scratch directories are removed on every exit path, hosting clone first.

use crate::{
    build::build_book,
    config::BookConfig,
    log, trace,
    utils::{
        fs::{ScopedDir, merge_copy},
        git::{self, HeadCommit},
        interrupt,
    },
};
use anyhow::Result;
use thiserror::Error;

/// Commit message of the first commit on a freshly created hosting branch.
const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publishing must start from `{expected}`, but `{actual}` is checked out")]
    WrongBranch { expected: String, actual: String },

    #[error("HEAD is detached; check out `{0}` to publish")]
    DetachedHead(String),

    #[error("publish interrupted")]
    Interrupted,
}

/// Build the book from a clean clone and push it to the hosting branch.
pub fn publish_book(config: &BookConfig) -> Result<()> {
    let root = config.root.as_path();
    let publish = &config.publish;

    ensure_on_primary(config)?;
    interrupt::install_handler()?;

    ensure_hosting_branch(config)?;
    check_interrupted()?;

    let head = git::head_commit(root)?;
    trace!("publishing commit {}", head.id);
    log!("publish"; "publishing {} {}", head.short_id, head.summary);

    // Dropped in reverse order: hosting clone, then primary clone.
    let primary_scratch = ScopedDir::new("bookpress-primary-")?;
    let hosting_scratch = ScopedDir::new("bookpress-hosting-")?;

    let primary_tree = primary_scratch.join("repo");
    git::clone_branch(root, &publish.primary_branch, &primary_tree)?;
    let hosting_tree = hosting_scratch.join("repo");
    git::clone_branch(root, &publish.hosting_branch, &hosting_tree)?;
    check_interrupted()?;

    let clone_config = config.with_root(&primary_tree);
    build_book(&clone_config)?;
    check_interrupted()?;

    merge_copy(&clone_config.output_dir(), &hosting_tree)?;
    git::add_all(&hosting_tree)?;
    if git::has_changes(&hosting_tree)? {
        git::commit(&hosting_tree, &publish_message(&head), false)?;
        git::push(&hosting_tree, "origin", &[publish.hosting_branch.as_str()])?;
    } else {
        log!("publish"; "{} is up to date", publish.hosting_branch);
    }
    check_interrupted()?;

    git::push(
        root,
        &publish.remote,
        &[publish.primary_branch.as_str(), publish.hosting_branch.as_str()],
    )?;

    log!("publish"; "done");
    Ok(())
}

fn ensure_on_primary(config: &BookConfig) -> Result<()> {
    let expected = &config.publish.primary_branch;
    match git::current_branch(&config.root)? {
        Some(actual) if &actual == expected => Ok(()),
        Some(actual) => Err(PublishError::WrongBranch {
            expected: expected.clone(),
            actual,
        }
        .into()),
        None => Err(PublishError::DetachedHead(expected.clone()).into()),
    }
}

/// Make sure a local hosting branch exists in the project repository.
fn ensure_hosting_branch(config: &BookConfig) -> Result<()> {
    let root = config.root.as_path();
    let publish = &config.publish;
    let hosting = publish.hosting_branch.as_str();

    if git::local_branch_exists(root, hosting)? {
        return Ok(());
    }

    if git::remote_branch_exists(root, &publish.remote, hosting)? {
        log!("publish"; "tracking {}/{hosting}", publish.remote);
        return git::create_branch(root, hosting, &format!("{}/{hosting}", publish.remote));
    }

    log!("publish"; "creating empty {hosting} branch");
    let scratch = ScopedDir::new("bookpress-init-")?;
    let tree = scratch.join("repo");
    git::clone_branch(root, &publish.primary_branch, &tree)?;
    git::checkout_empty_orphan(&tree, hosting)?;
    git::commit(&tree, INITIAL_COMMIT_MESSAGE, true)?;
    git::push(&tree, "origin", &[hosting])
}

fn publish_message(head: &HeadCommit) -> String {
    format!("Publish {}: {}", head.short_id, head.summary)
}

fn check_interrupted() -> Result<()> {
    if interrupt::is_interrupted() {
        return Err(PublishError::Interrupted.into());
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
