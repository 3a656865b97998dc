//! Book build orchestration.
//!
//! # Pipeline
//!
//! ```text
//! build_book()
//!     │
//!     ├── renderer <text>            ──► <renderer_output>/
//!     ├── generate_redirects()       ──► <renderer_output>/<old>.html
//!     ├── remove <output>/           (only after both steps succeeded)
//!     ├── merge_copy(renderer_output ──► <output>/book/)
//!     └── merge_copy(static          ──► <output>/)
//! ```

use crate::{
    config::{BookConfig, defaults},
    exec, log,
    redirect::generate_redirects,
    utils::fs::{merge_copy, remove_dir_resilient},
};
use anyhow::{Context, Result, bail};

/// Render the book and assemble the output tree.
///
/// Any failing step aborts the build. The previous output is only removed
/// once the renderer and the redirect pages have succeeded.
pub fn build_book(config: &BookConfig) -> Result<()> {
    check_static_dir(config)?;
    render(config)?;

    let rendered = config.renderer_output_dir();
    generate_redirects(config, &rendered)?;

    let output = config.output_dir();
    if output.exists() {
        remove_dir_resilient(&output)?;
    }

    merge_copy(&rendered, &config.book_output_dir())?;

    let static_dir = config.static_dir();
    if static_dir.is_dir() {
        merge_copy(&static_dir, &output)?;
    } else {
        log!("build"; "no {} directory, skipping static files", config.build.static_dir.display());
    }

    log!("build"; "done: {}", output.display());
    Ok(())
}

/// A static directory set in `bookpress.toml` must exist; the default one may be absent.
fn check_static_dir(config: &BookConfig) -> Result<()> {
    let static_dir = config.static_dir();
    if !static_dir.is_dir() && config.build.static_dir != defaults::build::static_dir() {
        bail!("static directory {} not found", static_dir.display());
    }
    Ok(())
}

/// Run the external renderer on the text directory.
fn render(config: &BookConfig) -> Result<()> {
    let renderer = &config.build.renderer;
    let program = renderer.first().context("No renderer configured")?;
    which::which(program)
        .with_context(|| format!("`{program}` not found. Please install it first."))?;

    log!("build"; "rendering {}", config.build.text.display());
    exec!(config.root.as_path(); renderer; &config.build.text)
        .with_context(|| format!("Rendering {} failed", config.build.text.display()))
}

// ============================================================================
// Tests
// ============================================================================
