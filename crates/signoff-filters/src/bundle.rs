//! Plugin bundles - external sources of filter types
//!
//! A bundle exports a set of filter types keyed by a stable type identity.
//! The registry decides which of them to register by checking each identity
//! against its manifest. Bundles come in two shapes:
//!
//! - [`StaticBundle`]: built in process by a host that links extension crates
//! - [`FileBundle`]: a JSON descriptor on disk naming the identities it
//!   exports; the code behind each identity comes from an
//!   [`ExtensionCatalog`] populated when the host starts

use serde::{Deserialize, Serialize};
use signoff_core::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::filter::{BoxedFilter, Filter, FilterFactory};

/// A filter type offered by a bundle
#[derive(Clone)]
pub struct ExportedFilter {
    pub type_name: String,
    /// None when the bundle declares the type but no code is available for it
    pub factory: Option<FilterFactory>,
}

impl ExportedFilter {
    pub fn new(type_name: &str, factory: FilterFactory) -> Self {
        Self {
            type_name: type_name.to_string(),
            factory: Some(factory),
        }
    }

    /// A declared type whose constructor could not be resolved
    pub fn unresolved(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            factory: None,
        }
    }
}

impl std::fmt::Debug for ExportedFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedFilter")
            .field("type_name", &self.type_name)
            .field("resolved", &self.factory.is_some())
            .finish()
    }
}

/// Source of plugin filter types
pub trait PluginBundle {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Every type the bundle offers, approved or not
    fn exports(&self) -> Vec<ExportedFilter>;
}

/// Bundle assembled in code
#[derive(Debug, Clone, Default)]
pub struct StaticBundle {
    name: String,
    exports: Vec<ExportedFilter>,
}

impl StaticBundle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exports: Vec::new(),
        }
    }

    pub fn export(mut self, type_name: &str, factory: FilterFactory) -> Self {
        self.exports.push(ExportedFilter::new(type_name, factory));
        self
    }

    /// Export a filter type with a `Default` constructor
    pub fn export_filter<F>(self, type_name: &str) -> Self
    where
        F: Filter + Default + 'static,
    {
        self.export(type_name, crate::filter::factory_of::<F>())
    }
}

impl PluginBundle for StaticBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn exports(&self) -> Vec<ExportedFilter> {
        self.exports.clone()
    }
}

/// Compiled-in constructors for plugin types, keyed by type identity.
///
/// Registering a constructor here does not make a filter available; a
/// bundle must export the identity and the manifest must approve it.
#[derive(Clone, Default)]
pub struct ExtensionCatalog {
    constructors: HashMap<String, FilterFactory>,
}

impl ExtensionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provide(mut self, type_name: &str, factory: FilterFactory) -> Self {
        self.constructors.insert(type_name.to_string(), factory);
        self
    }

    pub fn provide_filter<F>(self, type_name: &str) -> Self
    where
        F: Filter + Default + 'static,
    {
        self.provide(type_name, crate::filter::factory_of::<F>())
    }

    pub fn resolve(&self, type_name: &str) -> Option<FilterFactory> {
        self.constructors.get(type_name).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl std::fmt::Debug for ExtensionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.constructors.keys().collect();
        types.sort();
        f.debug_struct("ExtensionCatalog")
            .field("types", &types)
            .finish()
    }
}

/// On-disk bundle descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDescriptor {
    #[serde(default)]
    pub bundle: Option<String>,
    pub exports: Vec<String>,
}

/// A bundle read from a descriptor file and resolved against a catalog
#[derive(Debug, Clone)]
pub struct FileBundle {
    name: String,
    source: PathBuf,
    exports: Vec<ExportedFilter>,
}

impl FileBundle {
    /// Read and resolve a descriptor. Unreadable or malformed descriptors
    /// fail with a plugin load error naming the file.
    pub fn open(source: impl AsRef<Path>, catalog: &ExtensionCatalog) -> Result<Self> {
        let source = source.as_ref();
        let display = source.display().to_string();

        let json = fs::read_to_string(source)
            .map_err(|e| Error::plugin_load(&display, format!("unreadable bundle: {}", e)))?;
        let descriptor: BundleDescriptor = serde_json::from_str(&json)
            .map_err(|e| Error::plugin_load(&display, format!("malformed bundle: {}", e)))?;

        let name = descriptor.bundle.clone().unwrap_or_else(|| {
            source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| display.clone())
        });

        let exports = descriptor
            .exports
            .iter()
            .map(|type_name| match catalog.resolve(type_name) {
                Some(factory) => ExportedFilter::new(type_name, factory),
                None => ExportedFilter::unresolved(type_name),
            })
            .collect();

        Ok(Self {
            name,
            source: source.to_path_buf(),
            exports,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl PluginBundle for FileBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn exports(&self) -> Vec<ExportedFilter> {
        self.exports.clone()
    }
}

/// Run a plugin constructor and read the new filter's name. A panic in
/// either becomes a load error.
pub(crate) fn instantiate(bundle: &str, export: &ExportedFilter) -> Result<(BoxedFilter, String)> {
    let factory = export.factory.as_ref().ok_or_else(|| {
        Error::plugin_load(
            bundle,
            format!("no constructor available for '{}'", export.type_name),
        )
    })?;

    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let filter = factory();
        let name = filter.name().to_string();
        (filter, name)
    }))
    .map_err(|_| {
        Error::plugin_load(
            bundle,
            format!("'{}' panicked while being instantiated", export.type_name),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::SaveDataFilter;
    use std::io::Write;

    impl std::fmt::Debug for dyn Filter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("dyn Filter")
        }
    }

    #[test]
    fn test_file_bundle_resolves_against_catalog() {
        let catalog = ExtensionCatalog::new().provide_filter::<SaveDataFilter>("Plugins.Known");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bundle": "Plugins", "exports": ["Plugins.Known", "Plugins.Unknown"]}}"#
        )
        .unwrap();

        let bundle = FileBundle::open(file.path(), &catalog).unwrap();
        let exports = bundle.exports();

        assert_eq!(bundle.name(), "Plugins");
        assert_eq!(exports.len(), 2);
        assert!(exports[0].factory.is_some());
        assert!(exports[1].factory.is_none());
    }

    #[test]
    fn test_malformed_descriptor() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "MZ\u{0090}\u{0000} not a descriptor").unwrap();

        let err = FileBundle::open(file.path(), &ExtensionCatalog::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::PluginLoad { ref reason, .. } if reason.starts_with("malformed")
        ));
    }

    #[test]
    fn test_instantiate_unresolved_fails() {
        let export = ExportedFilter::unresolved("Plugins.Ghost");
        let err = instantiate("Plugins", &export).unwrap_err();
        assert!(matches!(err, Error::PluginLoad { .. }));
    }

    #[test]
    fn test_instantiate_panicking_constructor() {
        let factory: FilterFactory = Arc::new(|| -> BoxedFilter { panic!("constructor exploded") });
        let export = ExportedFilter::new("Plugins.Volatile", factory);

        let err = instantiate("Plugins", &export).unwrap_err();
        assert!(err.to_string().contains("panicked"));
    }

    struct Nameless;

    impl Filter for Nameless {
        fn name(&self) -> &str {
            panic!("name not available")
        }

        fn execute(&self, _step: &mut signoff_core::Step) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_instantiate_panicking_name() {
        let factory: FilterFactory = Arc::new(|| Box::new(Nameless) as BoxedFilter);
        let export = ExportedFilter::new("Plugins.Nameless", factory);

        let err = instantiate("Plugins", &export).unwrap_err();
        assert!(matches!(
            err,
            Error::PluginLoad { ref reason, .. } if reason.contains("Plugins.Nameless")
        ));
    }

    #[test]
    fn test_instantiate_reports_name() {
        let factory = crate::filter::factory_of::<SaveDataFilter>();
        let export = ExportedFilter::new("Plugins.Known", factory);
        let (filter, name) = instantiate("Plugins", &export).unwrap();

        assert_eq!(name, "SaveDataFilter");
        assert_eq!(filter.name(), name);
    }
}
