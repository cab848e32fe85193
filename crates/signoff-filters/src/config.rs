//! Registry configuration
//!
//! Where the approval manifest lives and, optionally, a share of plugin
//! bundles to load once the built-in filters are in place.

use serde::{Deserialize, Serialize};
use signoff_core::config::{get_config_opt, load_environment};
use std::path::PathBuf;

/// Environment variable naming the manifest file
pub const MANIFEST_SOURCE_VAR: &str = "SIGNOFF_MANIFEST_SOURCE";

/// Environment variable naming a directory of plugin bundles
pub const PLUGIN_SHARE_VAR: &str = "SIGNOFF_PLUGIN_SHARE";

/// Filter registry configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Approval manifest; required
    #[serde(default, alias = "ManifestSource")]
    pub manifest_source: Option<PathBuf>,

    /// Directory whose bundles are loaded at construction
    #[serde(default)]
    pub plugin_share: Option<PathBuf>,
}

impl RegistryConfig {
    pub fn new(manifest_source: impl Into<PathBuf>) -> Self {
        Self {
            manifest_source: Some(manifest_source.into()),
            plugin_share: None,
        }
    }

    /// Read `SIGNOFF_MANIFEST_SOURCE` and `SIGNOFF_PLUGIN_SHARE`, after
    /// applying the environment file if there is one
    pub fn from_env() -> Self {
        load_environment();
        Self {
            manifest_source: get_config_opt(MANIFEST_SOURCE_VAR).map(PathBuf::from),
            plugin_share: get_config_opt(PLUGIN_SHARE_VAR).map(PathBuf::from),
        }
    }

    pub fn with_plugin_share(mut self, share: impl Into<PathBuf>) -> Self {
        self.plugin_share = Some(share.into());
        self
    }
}
