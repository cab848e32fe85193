//! Pipeline - an ordered chain of filters run against one step

use signoff_core::{Result, Step};
use tracing::debug;

use crate::filter::BoxedFilter;
use crate::registry::FilterRegistry;

/// Filters executed strictly in registration order.
///
/// Filters can only be appended; there is no reordering, removal or
/// branching.
#[derive(Default)]
pub struct Pipeline {
    filters: Vec<BoxedFilter>,
    names: Vec<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every filter in order. An error from any filter aborts the run
    /// and is returned to the caller.
    pub fn execute(&self, step: &mut Step) -> Result<()> {
        for filter in &self.filters {
            debug!(
                filter = %filter.name(),
                can_process = step.can_process,
                "Executing filter"
            );
            filter.execute(step)?;
        }
        Ok(())
    }

    /// Append a filter to the end of the chain
    pub fn register(&mut self, filter: BoxedFilter) -> &mut Self {
        self.names.push(filter.name().to_string());
        self.filters.push(filter);
        self
    }

    /// Append the filters named in a `;`-delimited list, skipping names the
    /// registry does not know
    pub fn register_from_list(
        &mut self,
        filter_names: &str,
        registry: &FilterRegistry,
    ) -> &mut Self {
        for filter in registry.get_filters(filter_names) {
            self.register(filter);
        }
        self
    }

    pub fn count(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Names of the registered filters in execution order
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("filters", &self.names).finish()
    }
}
