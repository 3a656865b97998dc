//! `[publish]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[publish]` section in bookpress.toml - hosting branch settings.
///
/// # Example
/// ```toml
/// [publish]
/// primary_branch = "main"
/// hosting_branch = "gh-pages"
/// remote = "origin"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// Branch the book sources live on; publishing only runs from here.
    #[serde(default = "defaults::publish::primary_branch")]
    #[educe(Default = defaults::publish::primary_branch())]
    pub primary_branch: String,

    /// Long-lived branch holding the built output.
    #[serde(default = "defaults::publish::hosting_branch")]
    #[educe(Default = defaults::publish::hosting_branch())]
    pub hosting_branch: String,

    /// Remote both branches are pushed to.
    #[serde(default = "defaults::publish::remote")]
    #[educe(Default = defaults::publish::remote())]
    pub remote: String,
}
