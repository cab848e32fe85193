//! Approval manifest gating which plugin types may be registered
//!
//! The manifest is read once when a registry is built. A type exported by a
//! plugin bundle is only registered when its identity appears here; the
//! category recorded for it comes from the matching entry.

use serde::{Deserialize, Serialize};
use signoff_core::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Category used when a manifest entry does not name one
pub const PLUGIN_CATEGORY: &str = "Plugin";

fn default_category() -> String {
    PLUGIN_CATEGORY.to_string()
}

/// One approved plugin type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(alias = "TypeFullName")]
    pub type_name: String,
    #[serde(alias = "FilterCategory", default = "default_category")]
    pub category: String,
}

impl ManifestEntry {
    pub fn new(type_name: &str, category: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            category: category.to_string(),
        }
    }
}

/// Allow-list of plugin type identities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Read a manifest from a JSON file.
    ///
    /// An empty path or a file that does not exist is a configuration error.
    pub fn from_file(source: impl AsRef<Path>) -> Result<Self> {
        let source = source.as_ref();

        if source.as_os_str().is_empty() {
            return Err(Error::configuration("manifest source can not be empty"));
        }
        if !source.is_file() {
            return Err(Error::configuration(format!(
                "manifest not found: {}",
                source.display()
            )));
        }

        let json = fs::read_to_string(source)?;
        let manifest = Self::from_json(&json)?;

        info!(
            path = %source.display(),
            approved = manifest.len(),
            "Loaded filter manifest"
        );
        Ok(manifest)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The entry approving `type_name`, if any
    pub fn approval(&self, type_name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.type_name == type_name)
    }

    pub fn is_approved(&self, type_name: &str) -> bool {
        self.approval(type_name).is_some()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_reference_encoding() {
        let manifest = Manifest::from_json(
            r#"[
                {"Name": "ignored",
                 "TypeFullName": "Plugins.CaptainUnfitForCommandFilter",
                 "FilterCategory": "Medical"},
                {"type_name": "Plugins.RedShirtFilter"}
            ]"#,
        )
        .unwrap();

        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.approval("Plugins.CaptainUnfitForCommandFilter").unwrap().category,
            "Medical"
        );
        assert_eq!(
            manifest.approval("Plugins.RedShirtFilter").unwrap().category,
            PLUGIN_CATEGORY
        );
        assert!(!manifest.is_approved("Plugins.Unlisted"));
    }

    #[test]
    fn test_missing_source_is_configuration_error() {
        assert!(Manifest::from_file("").unwrap_err().is_configuration());
        assert!(Manifest::from_file("/nonexistent/manifest.json")
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"type_name": "Plugins.A", "category": "Audit"}}]"#).unwrap();

        let manifest = Manifest::from_file(file.path()).unwrap();
        assert_eq!(manifest.entries(), [ManifestEntry::new("Plugins.A", "Audit")]);
    }

    #[test]
    fn test_malformed_manifest() {
        let err = Manifest::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
