//! Project configuration from the optional `bookpress.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                         |
//! |-------------|-------------------------------------------------|
//! | `[build]`   | Renderer command, source and output paths       |
//! | `[publish]` | Primary/hosting branch names and the remote     |
//!
//! Every field has a default, so a project without the file builds with
//! `rustbook build text` into `target/`.

mod build;
pub mod defaults;
mod error;
mod publish;

pub use error::ConfigError;

use build::BuildConfig;
use publish::PublishConfig;

use anyhow::{Context, Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file looked up in the project root.
pub const CONFIG_FILE: &str = "bookpress.toml";

/// Subdirectory of the output root that receives the rendered book.
pub const BOOK_SUBDIR: &str = "book";

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing bookpress.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BookConfig {
    /// Project root every configured path is resolved against
    #[serde(skip)]
    #[educe(Default = PathBuf::from("."))]
    pub root: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Publish settings
    #[serde(default)]
    pub publish: PublishConfig,
}

impl BookConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: BookConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load `bookpress.toml` from `root` if present, defaults otherwise.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let config = if path.exists() {
            Self::from_path(&path)?
        } else {
            Self::default()
        };
        let config = config.with_root(root);
        config.validate()?;
        Ok(config)
    }

    /// Same configuration resolved against another root (e.g. a clone).
    pub fn with_root(&self, root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..self.clone()
        }
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join(&self.build.text)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.build.output)
    }

    /// `<output>/book`, where the rendered book is merged.
    pub fn book_output_dir(&self) -> PathBuf {
        self.output_dir().join(BOOK_SUBDIR)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.root.join(&self.build.static_dir)
    }

    pub fn renderer_output_dir(&self) -> PathBuf {
        self.root.join(&self.build.renderer_output)
    }

    pub fn redirects_file(&self) -> PathBuf {
        self.root.join(&self.build.redirects)
    }

    /// Validate configuration values that serde cannot check
    pub fn validate(&self) -> Result<()> {
        let build = &self.build;
        let publish = &self.publish;

        if build.renderer.is_empty() || build.renderer[0].trim().is_empty() {
            bail!(ConfigError::Validation(
                "[build.renderer] must have at least one element".into()
            ));
        }

        // The output tree is deleted on every build, so no input may live
        // inside it and it may not contain any input.
        for (field, path) in [
            ("text", &build.text),
            ("static_dir", &build.static_dir),
            ("renderer_output", &build.renderer_output),
        ] {
            if path.starts_with(&build.output) || build.output.starts_with(path) {
                bail!(ConfigError::Validation(format!(
                    "[build.output] must not overlap [build.{field}]"
                )));
            }
        }
        if build.redirects.starts_with(&build.output) {
            bail!(ConfigError::Validation(
                "[build.redirects] must not be inside [build.output]".into()
            ));
        }

        if publish.primary_branch.trim().is_empty() || publish.hosting_branch.trim().is_empty() {
            bail!(ConfigError::Validation("[publish] branch names must not be empty".into()));
        }
        if publish.primary_branch == publish.hosting_branch {
            bail!(ConfigError::Validation(
                "[publish.primary_branch] and [publish.hosting_branch] must differ".into()
            ));
        }
        if publish.remote.trim().is_empty() {
            bail!(ConfigError::Validation("[publish.remote] must not be empty".into()));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
