//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn text() -> PathBuf {
        "text".into()
    }

    pub fn output() -> PathBuf {
        "target".into()
    }

    pub fn static_dir() -> PathBuf {
        "static".into()
    }

    pub fn renderer_output() -> PathBuf {
        "_book".into()
    }

    pub fn renderer() -> Vec<String> {
        vec!["rustbook".into(), "build".into()]
    }

    pub fn redirects() -> PathBuf {
        "redirects.json".into()
    }
}

// ============================================================================
// [publish] Section Defaults
// ============================================================================

pub mod publish {
    pub fn primary_branch() -> String {
        "master".into()
    }

    pub fn hosting_branch() -> String {
        "gh-pages".into()
    }

    pub fn remote() -> String {
        "origin".into()
    }
}
