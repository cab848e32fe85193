//! signoff-workflows: State-machine workflows driven by filter pipelines
//!
//! Features:
//! - Declarative workflows: states, triggers and a transition table
//! - Flat state machine built per run from the transition table
//! - `WorkflowProcessor` running pre-filters, the trigger, and post-filters

pub mod flow;
pub mod processor;
pub mod state_machine;

pub use flow::{State, StateConfig, Trigger, Workflow};
pub use processor::{WorkflowProcessor, EXECUTE_TRIGGER_FILTER};
pub use state_machine::StateMachine;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::flow::{StateConfig, Workflow};
    pub use super::processor::WorkflowProcessor;
    pub use super::state_machine::StateMachine;
}
