//! Open the built book in the platform's default viewer.

use crate::{config::BookConfig, exec, log};
use anyhow::{Result, bail};
use std::path::Path;

/// Entry page of the rendered book.
const INDEX_PAGE: &str = "index.html";

pub fn open_book(config: &BookConfig) -> Result<()> {
    let page = config.book_output_dir().join(INDEX_PAGE);
    if !page.is_file() {
        bail!("{} not found, run `bookpress build` first", page.display());
    }

    log!("open"; "{}", page.display());
    open_in_viewer(&page)
}

#[cfg(target_os = "macos")]
fn open_in_viewer(page: &Path) -> Result<()> {
    exec!(["open"]; page)
}

#[cfg(windows)]
fn open_in_viewer(page: &Path) -> Result<()> {
    // `start` takes the first quoted argument as the window title.
    exec!(["cmd", "/C", "start", ""]; page)
}

#[cfg(not(any(target_os = "macos", windows)))]
fn open_in_viewer(page: &Path) -> Result<()> {
    exec!(["xdg-open"]; page)
}
