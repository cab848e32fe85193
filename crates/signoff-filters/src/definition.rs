//! Registry records for filters

use serde::Serialize;
use std::fmt;

use crate::filter::{factory_of, BoxedFilter, Filter, FilterFactory, DEFAULT_CATEGORY};

/// A catalog entry: logical name, category, type identity and the factory
/// that builds a fresh instance for every pipeline.
#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterDefinition {
    pub name: String,
    #[serde(rename = "FilterCategory")]
    pub category: String,
    #[serde(rename = "TypeFullName")]
    pub type_name: String,
    #[serde(skip)]
    factory: FilterFactory,
}

impl FilterDefinition {
    pub fn new(name: &str, category: &str, type_name: &str, factory: FilterFactory) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            type_name: type_name.to_string(),
            factory,
        }
    }

    /// Definition for a built-in filter type, named after its instances.
    /// `type_name` is the filter's fixed tag, recorded in the serialized
    /// catalog.
    pub fn builtin<F>(type_name: &str) -> Self
    where
        F: Filter + Default + 'static,
    {
        let name = F::default().name().to_string();
        Self::new(&name, DEFAULT_CATEGORY, type_name, factory_of::<F>())
    }

    /// Construct a new, independent filter instance
    pub fn create(&self) -> BoxedFilter {
        (self.factory)()
    }
}

impl fmt::Debug for FilterDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDefinition")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
