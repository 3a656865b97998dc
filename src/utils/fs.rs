//! Filesystem helpers for assembling and tearing down output trees.
//!
//! - [`merge_copy`]: union-copy one tree into another, overwriting files
//! - [`remove_dir_resilient`]: best-effort tree removal with bounded retry
//! - [`ScopedDir`]: temporary directory removed on every exit path

use crate::{log, trace};
use anyhow::{Context, Result};
use std::{
    fs::{self, File, FileTimes, Metadata},
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Delay between whole-tree removal attempts.
const REMOVE_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Whole-tree removal attempts before giving up with a warning.
const REMOVE_MAX_TRIES: usize = 10;

// ============================================================================
// Merge Copy
// ============================================================================

/// Recursively copy `src` into `dst`, overwriting files with the same name.
///
/// Files only present in `dst` are left alone. File and directory metadata
/// (permissions and timestamps) follow the source; a platform that cannot
/// set directory timestamps is tolerated.
pub fn merge_copy(src: &Path, dst: &Path) -> Result<()> {
    trace!("merge_copy({:?}, {:?})", src, dst);
    merge_copy_dir(src, dst)
}

fn merge_copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("Failed to create {}", dst.display()))?;

    for entry in fs::read_dir(src).with_context(|| format!("Failed to read {}", src.display()))? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            merge_copy_dir(&src_path, &dst_path)?;
        } else {
            copy_file(&src_path, &dst_path)?;
        }
    }

    match copy_stat(src, dst) {
        Err(err) if is_unsupported(&err) => {
            trace!("skipping metadata of {:?}: {}", dst, err);
            Ok(())
        }
        other => other.with_context(|| format!("Failed to copy metadata to {}", dst.display())),
    }
}

/// Copy file content, permissions and timestamps.
fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    let meta = fs::metadata(src)?;
    set_times(&meta, dst)
        .with_context(|| format!("Failed to copy timestamps to {}", dst.display()))
}

/// Copy permissions and timestamps from one directory onto another.
fn copy_stat(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::metadata(src)?;
    set_times(&meta, dst)?;
    fs::set_permissions(dst, meta.permissions())
}

fn set_times(meta: &Metadata, dst: &Path) -> io::Result<()> {
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    open_for_times(dst)?.set_times(times)
}

#[cfg(unix)]
fn open_for_times(path: &Path) -> io::Result<File> {
    // Owner may set timestamps through a read-only handle, dirs included.
    File::open(path)
}

#[cfg(windows)]
fn open_for_times(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;
    const FILE_WRITE_ATTRIBUTES: u32 = 0x100;
    const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;

    fs::OpenOptions::new()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
        .open(path)
}

#[cfg(not(any(unix, windows)))]
fn open_for_times(_path: &Path) -> io::Result<File> {
    Err(io::Error::from(ErrorKind::Unsupported))
}

/// Metadata copy failures that only mean "this platform can't do it".
fn is_unsupported(err: &io::Error) -> bool {
    err.kind() == ErrorKind::Unsupported || (cfg!(windows) && err.kind() == ErrorKind::PermissionDenied)
}

// ============================================================================
// Resilient Removal
// ============================================================================

/// Remove a directory tree, tolerating read-only entries and transient locks.
///
/// Permission errors on a single entry are healed by clearing the read-only
/// bit and retrying once. Lock-style failures of the whole attempt are
/// retried after a fixed delay; once retries run out a warning is logged and
/// the call still succeeds. Other errors propagate.
pub fn remove_dir_resilient(path: &Path) -> Result<()> {
    remove_dir_with_retry(path, REMOVE_MAX_TRIES, REMOVE_RETRY_DELAY, remove_tree)
}

/// Run `attempt` on `path` until it succeeds, retrying transient failures.
fn remove_dir_with_retry(
    path: &Path,
    max_tries: usize,
    delay: Duration,
    mut attempt: impl FnMut(&Path) -> io::Result<()>,
) -> Result<()> {
    for n in 1..=max_tries {
        trace!("remove_dir_all({:?}) attempt {}", path, n);
        match attempt(path) {
            Ok(()) => return Ok(()),
            Err(err) if is_transient(&err) => {
                trace!("transient failure: {}", err);
                if n < max_tries {
                    thread::sleep(delay);
                }
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to remove {}", path.display()));
            }
        }
    }

    log!("warn"; "failed to remove directory {}", path.display());
    Ok(())
}

/// One removal attempt, deepest entries first.
fn remove_tree(root: &Path) -> io::Result<()> {
    if fs::symlink_metadata(root).is_err() {
        return Ok(());
    }

    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            remove_with_heal(root, entry.path(), |p| fs::remove_dir(p))?;
        } else {
            remove_with_heal(root, entry.path(), |p| fs::remove_file(p))?;
        }
    }
    Ok(())
}

/// Run `remove`, clearing read-only bits and retrying once on permission errors.
///
/// Only entries inside `root` have their permissions changed. If clearing
/// the bits fails, the original error is returned.
fn remove_with_heal(
    root: &Path,
    path: &Path,
    remove: impl Fn(&Path) -> io::Result<()>,
) -> io::Result<()> {
    match remove(path) {
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            trace!("clearing read-only bit on {:?}", path);
            let healed = make_writable(path).and_then(|()| match path.parent() {
                Some(parent) if parent.starts_with(root) => make_writable(parent),
                _ => Ok(()),
            });
            if healed.is_err() {
                return Err(err);
            }
            remove(path)
        }
        other => other,
    }
}

#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) -> io::Result<()> {
    let mut perms = fs::symlink_metadata(path)?.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Errors caused by another process holding something in the tree.
fn is_transient(err: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION, ERROR_DIR_NOT_EMPTY
    const WINDOWS_LOCK_CODES: [i32; 3] = [32, 33, 145];

    matches!(err.kind(), ErrorKind::DirectoryNotEmpty | ErrorKind::ResourceBusy)
        || (cfg!(windows) && err.raw_os_error().is_some_and(|c| WINDOWS_LOCK_CODES.contains(&c)))
}

// ============================================================================
// Scoped Directory
// ============================================================================

/// A temporary directory removed with [`remove_dir_resilient`] on drop.
///
/// Guards drop in reverse declaration order, so nested scopes clean up
/// innermost first.
pub struct ScopedDir {
    dir: TempDir,
}

impl ScopedDir {
    /// Create a fresh temporary directory whose name starts with `prefix`.
    pub fn new(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .context("Failed to create temporary directory")?;
        trace!("created temporary directory {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a child entry, e.g. a clone target that must not exist yet.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path().join(name)
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        if let Err(err) = remove_dir_resilient(self.path()) {
            log!("warn"; "{err:#}");
        }
        // TempDir's own cleanup finds nothing left and ignores that.
    }
}

// ============================================================================
// Tests
// ============================================================================
