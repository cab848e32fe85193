//! signoff-filters: Filter pipeline and manifest-gated filter registry
//!
//! Features:
//! - `Filter` trait and an append-only `Pipeline` of filters
//! - Built-in data and participant-validation filters
//! - `FilterRegistry` resolving `;`-delimited name lists to fresh instances
//! - Plugin bundles whose types are registered only when a manifest approves them

pub mod builtin;
pub mod bundle;
pub mod config;
pub mod definition;
pub mod filter;
pub mod manifest;
pub mod pipeline;
pub mod registry;

pub use bundle::{
    BundleDescriptor, ExportedFilter, ExtensionCatalog, FileBundle, PluginBundle, StaticBundle,
};
pub use config::RegistryConfig;
pub use definition::FilterDefinition;
pub use filter::{
    factory_of, ActionWrapperFilter, BoxedFilter, Filter, FilterFactory, DEFAULT_CATEGORY,
};
pub use manifest::{Manifest, ManifestEntry};
pub use pipeline::Pipeline;
pub use registry::FilterRegistry;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::builtin::{
        FetchDataFilter, SaveDataFilter, TriggerStateFilter, ValidParticipantFilter,
    };
    pub use super::bundle::{ExtensionCatalog, PluginBundle, StaticBundle};
    pub use super::filter::{ActionWrapperFilter, BoxedFilter, Filter};
    pub use super::manifest::{Manifest, ManifestEntry};
    pub use super::pipeline::Pipeline;
    pub use super::registry::FilterRegistry;
}
