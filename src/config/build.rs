//! `[build]` section configuration.
//!
//! Paths of the renderer input and output, the static assets and the final
//! output tree. All paths are relative to the project root.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in bookpress.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// text = "text"                    # Renderer input
/// output = "target"                # Final output root
/// static_dir = "static"            # Merged over the output root
/// renderer = ["mdbook", "build"]   # Text dir is appended
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Book source directory handed to the renderer.
    #[serde(default = "defaults::build::text")]
    #[educe(Default = defaults::build::text())]
    pub text: PathBuf,

    /// Final output root. The book lands in `<output>/book`.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Static files merged into the output root after the book.
    #[serde(default = "defaults::build::static_dir")]
    #[educe(Default = defaults::build::static_dir())]
    pub static_dir: PathBuf,

    /// Where the renderer writes its HTML.
    #[serde(default = "defaults::build::renderer_output")]
    #[educe(Default = defaults::build::renderer_output())]
    pub renderer_output: PathBuf,

    /// Renderer command line; the text directory is appended as last argument.
    #[serde(default = "defaults::build::renderer")]
    #[educe(Default = defaults::build::renderer())]
    pub renderer: Vec<String>,

    /// JSON list of `[old, new]` redirect pairs.
    #[serde(default = "defaults::build::redirects")]
    #[educe(Default = defaults::build::redirects())]
    pub redirects: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::super::BookConfig;
    use std::path::PathBuf;

    #[test]
    fn test_build_defaults() {
        let config: BookConfig = toml::from_str("").unwrap();
        assert_eq!(config.build.text, PathBuf::from("text"));
        assert_eq!(config.build.output, PathBuf::from("target"));
        assert_eq!(config.build.static_dir, PathBuf::from("static"));
        assert_eq!(config.build.renderer_output, PathBuf::from("_book"));
        assert_eq!(config.build.renderer, vec!["rustbook", "build"]);
        assert_eq!(config.build.redirects, PathBuf::from("redirects.json"));
    }

    #[test]
    fn test_build_overrides() {
        let config = r#"
            [build]
            text = "src"
            output = "public"
            renderer = ["mdbook", "build"]
            renderer_output = "book"
        "#;
        let config: BookConfig = toml::from_str(config).unwrap();
        assert_eq!(config.build.text, PathBuf::from("src"));
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.build.renderer, vec!["mdbook", "build"]);
        assert_eq!(config.build.renderer_output, PathBuf::from("book"));
        // untouched fields keep their defaults
        assert_eq!(config.build.static_dir, PathBuf::from("static"));
    }

    #[test]
    fn test_build_unknown_field() {
        let config = r#"
            [build]
            minify = true
        "#;
        assert!(toml::from_str::<BookConfig>(config).is_err());
    }
}
