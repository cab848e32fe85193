//! Filter registry - named filter factories behind a manifest gate
//!
//! The registry starts with the built-in filters and an approval manifest.
//! Plugin bundles add filters afterwards, but only for types the manifest
//! approves. Load every bundle before sharing the registry between
//! pipelines; lookups take `&self` and loading takes `&mut self`.

use sha2::{Digest, Sha256};
use signoff_core::{split_list, Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::builtin::{FetchDataFilter, SaveDataFilter, TriggerStateFilter, ValidParticipantFilter};
use crate::bundle::{instantiate, ExtensionCatalog, FileBundle, PluginBundle};
use crate::config::RegistryConfig;
use crate::definition::FilterDefinition;
use crate::filter::BoxedFilter;
use crate::manifest::Manifest;

/// Catalog mapping filter names to factories
#[derive(Debug)]
pub struct FilterRegistry {
    definitions: Vec<FilterDefinition>,
    index: HashMap<String, usize>,
    manifest: Manifest,
    catalog: ExtensionCatalog,
}

impl FilterRegistry {
    /// Create a registry whose manifest is read from `manifest_source`
    pub fn new(manifest_source: impl AsRef<Path>) -> Result<Self> {
        Self::with_catalog(manifest_source, ExtensionCatalog::new())
    }

    /// Create a registry that resolves on-disk bundles against `catalog`
    pub fn with_catalog(
        manifest_source: impl AsRef<Path>,
        catalog: ExtensionCatalog,
    ) -> Result<Self> {
        let mut registry = Self::empty(catalog);
        registry.manifest = Manifest::from_file(manifest_source)?;
        Ok(registry)
    }

    /// Create a registry around a manifest already held in memory
    pub fn with_manifest(manifest: Manifest, catalog: ExtensionCatalog) -> Self {
        let mut registry = Self::empty(catalog);
        registry.manifest = manifest;
        registry
    }

    /// Build from configuration, loading the plugin share when one is set
    pub fn from_config(config: &RegistryConfig, catalog: ExtensionCatalog) -> Result<Self> {
        let manifest_source = config.manifest_source.as_ref().ok_or_else(|| {
            Error::configuration("FilterRegistry - manifest source can not be empty")
        })?;

        let mut registry = Self::with_catalog(manifest_source, catalog)?;
        if let Some(share) = &config.plugin_share {
            registry.load_plugins_from_share(share)?;
        }
        Ok(registry)
    }

    fn empty(catalog: ExtensionCatalog) -> Self {
        let mut registry = Self {
            definitions: Vec::new(),
            index: HashMap::new(),
            manifest: Manifest::default(),
            catalog,
        };
        registry.register_default_filters();
        registry
    }

    fn register_default_filters(&mut self) {
        let builtins = [
            FilterDefinition::builtin::<FetchDataFilter>(FetchDataFilter::TYPE_NAME),
            FilterDefinition::builtin::<SaveDataFilter>(SaveDataFilter::TYPE_NAME),
            FilterDefinition::builtin::<TriggerStateFilter>(TriggerStateFilter::TYPE_NAME),
            FilterDefinition::builtin::<ValidParticipantFilter>(ValidParticipantFilter::TYPE_NAME),
        ];

        for definition in builtins {
            self.insert(definition);
        }
        debug!(count = self.definitions.len(), "Registered default filters");
    }

    fn insert(&mut self, definition: FilterDefinition) {
        self.index
            .insert(definition.name.clone(), self.definitions.len());
        self.definitions.push(definition);
    }

    /// Add a definition directly, bypassing the manifest.
    ///
    /// Meant for hosts wiring their own first-party filters.
    pub fn register(&mut self, definition: FilterDefinition) -> Result<()> {
        if self.index.contains_key(&definition.name) {
            return Err(Error::DuplicateFilter(definition.name));
        }
        info!(name = %definition.name, category = %definition.category, "Registered filter");
        self.insert(definition);
        Ok(())
    }

    /// Resolve a `;`-delimited name list into fresh filter instances.
    ///
    /// Names with no definition are skipped so shared templates can list
    /// optional filters.
    pub fn get_filters(&self, filter_names: &str) -> Vec<BoxedFilter> {
        split_list(filter_names)
            .filter_map(|name| match self.get_definition(name) {
                Some(definition) => Some(definition.create()),
                None => {
                    warn!(name = %name, "Skipping unknown filter");
                    None
                }
            })
            .collect()
    }

    pub fn get_definition(&self, name: &str) -> Option<&FilterDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Register the manifest-approved types a bundle exports.
    ///
    /// Every approved type is instantiated once to learn its display name
    /// before anything is committed, so a failing bundle leaves the
    /// registry unchanged. Returns the number of filters added.
    pub fn load_bundle(&mut self, bundle: &dyn PluginBundle) -> Result<usize> {
        let bundle_name = bundle.name();
        let mut staged: Vec<FilterDefinition> = Vec::new();

        for export in bundle.exports() {
            let Some(approval) = self.manifest.approval(&export.type_name) else {
                debug!(
                    bundle = %bundle_name,
                    type_name = %export.type_name,
                    "Type not in manifest, ignoring"
                );
                continue;
            };

            let (_, name) = instantiate(bundle_name, &export)?;

            if name.is_empty() {
                return Err(Error::plugin_load(
                    bundle_name,
                    format!("'{}' has an empty filter name", export.type_name),
                ));
            }
            if self.contains(&name) || staged.iter().any(|d| d.name == name) {
                return Err(Error::DuplicateFilter(name));
            }

            if let Some(factory) = export.factory {
                staged.push(FilterDefinition::new(
                    &name,
                    &approval.category,
                    &export.type_name,
                    factory,
                ));
            }
        }

        let added = staged.len();
        for definition in staged {
            info!(
                bundle = %bundle_name,
                name = %definition.name,
                category = %definition.category,
                "Registered plugin filter"
            );
            self.insert(definition);
        }
        Ok(added)
    }

    /// Load one bundle descriptor from disk
    pub fn load_plugin(&mut self, source: impl AsRef<Path>) -> Result<usize> {
        let source = source.as_ref();
        if source.as_os_str().is_empty() {
            return Err(Error::configuration("load_plugin - source can not be empty"));
        }

        let bundle = FileBundle::open(source, &self.catalog)?;
        self.load_bundle(&bundle).map_err(|e| {
            warn!(path = %source.display(), error = %e, "Rejected plugin bundle");
            e
        })
    }

    /// Load every bundle file in a directory, in file-name order.
    ///
    /// A directory that does not exist loads nothing. The first failing
    /// bundle stops the sweep; bundles loaded before it stay registered.
    pub fn load_plugins_from_share(&mut self, share: impl AsRef<Path>) -> Result<usize> {
        let share = share.as_ref();
        if !share.is_dir() {
            debug!(path = %share.display(), "Plugin share not found");
            return Ok(0);
        }

        let mut sources = Vec::new();
        for entry in fs::read_dir(share)? {
            let path = entry?.path();
            if path.is_file() {
                sources.push(path);
            }
        }
        sources.sort();

        let mut added = 0;
        for source in sources {
            added += self.load_plugin(&source)?;
        }

        info!(path = %share.display(), added, "Loaded plugin share");
        Ok(added)
    }

    /// Names of all registered filters, each followed by `;`
    pub fn get_filter_names(&self) -> String {
        self.definitions
            .iter()
            .map(|d| format!("{};", d.name))
            .collect()
    }

    pub fn get_filter_count(&self) -> usize {
        self.definitions.len()
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> &[FilterDefinition] {
        &self.definitions
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The catalog as JSON, in registration order
    pub fn serialize_filter_definitions(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.definitions)?)
    }

    /// SHA-256 of the serialized catalog, for audit trails
    pub fn catalog_hash(&self) -> Result<String> {
        let json = self.serialize_filter_definitions()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}
