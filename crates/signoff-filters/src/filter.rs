//! Core filter trait and types

use signoff_core::{Result, Step};
use std::sync::Arc;

/// Category assigned to filters that ship with the engine
pub const DEFAULT_CATEGORY: &str = "Default";

/// A named unit of policy or work applied to a [`Step`].
///
/// Filters run in pipeline order and are always invoked; a filter that
/// should do nothing once the step is blocked must check
/// [`Step::can_process`] itself.
pub trait Filter: Send + Sync {
    /// Logical name, unique within one registry
    fn name(&self) -> &str;

    /// Apply this filter to the step.
    ///
    /// Returning an error aborts the pipeline; authorization failures are
    /// recorded on the step instead.
    fn execute(&self, step: &mut Step) -> Result<()>;
}

/// Boxed filter type
pub type BoxedFilter = Box<dyn Filter>;

/// Zero-argument constructor producing a fresh filter on every call
pub type FilterFactory = Arc<dyn Fn() -> BoxedFilter + Send + Sync>;

/// Build a factory for a filter type with a `Default` constructor
pub fn factory_of<F>() -> FilterFactory
where
    F: Filter + Default + 'static,
{
    Arc::new(|| Box::new(F::default()) as BoxedFilter)
}

type StepAction = Box<dyn Fn(&mut Step) -> Result<()> + Send + Sync>;

/// Adapts a closure into a filter so engine code can sit inside an
/// otherwise declarative chain. The action only runs while the step can
/// still be processed.
pub struct ActionWrapperFilter {
    name: String,
    action: StepAction,
}

impl ActionWrapperFilter {
    pub const NAME: &'static str = "ActionWrapperFilter";

    pub fn new<A>(action: A) -> Self
    where
        A: Fn(&mut Step) -> Result<()> + Send + Sync + 'static,
    {
        Self::named(Self::NAME, action)
    }

    pub fn named<A>(name: &str, action: A) -> Self
    where
        A: Fn(&mut Step) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            action: Box::new(action),
        }
    }
}

impl Filter for ActionWrapperFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step: &mut Step) -> Result<()> {
        if step.can_process {
            (self.action)(step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step() -> Step {
        Step::new("13", "Manager Approve", "Approve", "Spock", "Spock;Kirk")
    }

    #[test]
    fn test_action_wrapper_runs_action() {
        let filter = ActionWrapperFilter::new(|step: &mut Step| {
            step.parameters
                .insert("ActionResults".to_string(), json!("ActionFunction fired"));
            Ok(())
        });

        let mut step = step();
        filter.execute(&mut step).unwrap();

        assert_eq!(filter.name(), ActionWrapperFilter::NAME);
        assert_eq!(step.parameters["ActionResults"], json!("ActionFunction fired"));
    }

    #[test]
    fn test_action_wrapper_respects_gate() {
        let filter = ActionWrapperFilter::named("Guarded", |step: &mut Step| {
            step.set_flag("Ran");
            Ok(())
        });

        let mut step = step();
        step.can_process = false;
        filter.execute(&mut step).unwrap();

        assert!(!step.flag("Ran"));
    }

    #[test]
    fn test_action_wrapper_propagates_errors() {
        let filter = ActionWrapperFilter::new(|step: &mut Step| {
            Err(signoff_core::Error::illegal_transition(
                step.state.clone(),
                step.answer.clone(),
            ))
        });

        let mut step = step();
        let err = filter.execute(&mut step).unwrap_err();
        assert!(matches!(err, signoff_core::Error::IllegalTransition { .. }));
    }
}
