//! Workflow Processor - runs a step through its pipeline and state machine
//!
//! The processor owns one step for one run:
//! - Builds a pipeline of pre-filters, its own trigger-firing filter, and
//!   post-filters
//! - Builds the state machine from the workflow's transition table
//! - Executes the pipeline, firing the step's answer as a trigger when the
//!   step is still processable by the time the trigger filter runs

use signoff_core::{Error, Result, Step};
use signoff_filters::{ActionWrapperFilter, FilterRegistry, Pipeline};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::flow::Workflow;
use crate::state_machine::StateMachine;

/// Name under which the trigger-firing filter appears in the pipeline
pub const EXECUTE_TRIGGER_FILTER: &str = "ExecuteTriggerFilter";

type SharedMachine = Arc<RwLock<Option<StateMachine>>>;

pub struct WorkflowProcessor {
    step: Step,
    registry: Arc<FilterRegistry>,
    workflow: Workflow,
    pipeline: Pipeline,
    state_machine: SharedMachine,
}

impl WorkflowProcessor {
    pub fn new(step: Step, registry: Arc<FilterRegistry>, workflow: Workflow) -> Self {
        Self {
            step,
            registry,
            workflow,
            pipeline: Pipeline::new(),
            state_machine: Arc::new(RwLock::new(None)),
        }
    }

    /// Set up the pipeline from filter names that run before and after the
    /// trigger-firing filter. Both lists are required.
    pub fn configure_pipeline(
        &mut self,
        pre_filter_names: &str,
        post_filter_names: &str,
    ) -> Result<&mut Self> {
        if pre_filter_names.is_empty() {
            return Err(Error::configuration(
                "WorkflowProcessor::configure_pipeline - \
                 pre-process filter names can not be empty",
            ));
        }
        if post_filter_names.is_empty() {
            return Err(Error::configuration(
                "WorkflowProcessor::configure_pipeline - \
                 post-process filter names can not be empty",
            ));
        }

        let mut pipeline = Pipeline::new();
        pipeline
            .register_from_list(pre_filter_names, &self.registry)
            .register(Box::new(self.trigger_filter()))
            .register_from_list(post_filter_names, &self.registry);

        debug!(
            workflow_id = %self.workflow.workflow_id,
            filters = ?pipeline.names(),
            "Configured pipeline"
        );
        self.pipeline = pipeline;
        Ok(self)
    }

    /// Set up the state machine from the workflow's state configs, starting
    /// at the step's current state
    pub fn configure_state_machine(&mut self) -> Result<&mut Self> {
        if self.step.state.is_empty() {
            return Err(Error::configuration(
                "WorkflowProcessor::configure_state_machine - step state can not be empty",
            ));
        }

        let machine = StateMachine::from_workflow(&self.step.state, &self.workflow)?;
        debug!(
            workflow_id = %self.workflow.workflow_id,
            state = %machine.state(),
            permitted = ?machine.permitted_triggers(),
            "Configured state machine"
        );

        *self.machine_mut()? = Some(machine);
        Ok(self)
    }

    /// Execute the pipeline against the step.
    ///
    /// An answer the current state does not permit surfaces as
    /// [`Error::IllegalTransition`].
    pub fn process_answer(&mut self) -> Result<&mut Self> {
        if self.pipeline.is_empty() {
            return Err(Error::configuration(
                "WorkflowProcessor::process_answer - pipeline is not configured",
            ));
        }

        let from = self.step.state.clone();
        self.pipeline.execute(&mut self.step)?;

        info!(
            workflow_id = %self.workflow.workflow_id,
            workflow_instance_id = %self.step.workflow_instance_id,
            answer = %self.step.answer,
            from = %from,
            to = %self.step.state,
            errors = self.step.errors().len(),
            "Processed answer"
        );
        Ok(self)
    }

    /// Names of the filters in the configured pipeline, in execution order
    pub fn get_filter_names(&self) -> &[String] {
        self.pipeline.names()
    }

    /// The state machine's current state
    pub fn get_current_state(&self) -> Result<String> {
        let guard = self
            .state_machine
            .read()
            .map_err(|_| Error::internal("state machine lock poisoned"))?;

        guard
            .as_ref()
            .map(|m| m.state().to_string())
            .ok_or_else(|| Error::configuration("state machine is not configured"))
    }

    /// Errors, if any, encountered while processing the answer
    pub fn get_error_list(&self) -> &[String] {
        self.step.errors()
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Hand the processed step back for persistence
    pub fn into_step(self) -> Step {
        self.step
    }

    fn machine_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, Option<StateMachine>>> {
        self.state_machine
            .write()
            .map_err(|_| Error::internal("state machine lock poisoned"))
    }

    /// Filter that fires the step's answer against the state machine and
    /// records the transition on the step
    fn trigger_filter(&self) -> ActionWrapperFilter {
        let machine = Arc::clone(&self.state_machine);

        ActionWrapperFilter::named(EXECUTE_TRIGGER_FILTER, move |step: &mut Step| {
            let mut guard = machine
                .write()
                .map_err(|_| Error::internal("state machine lock poisoned"))?;
            let machine = guard
                .as_mut()
                .ok_or_else(|| Error::configuration("state machine is not configured"))?;

            let previous = machine.state().to_string();
            let next = machine.fire(&step.answer)?.to_string();

            step.previous_state = previous;
            step.state = next;
            Ok(())
        })
    }
}

impl std::fmt::Debug for WorkflowProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowProcessor")
            .field("workflow_id", &self.workflow.workflow_id)
            .field("step_state", &self.step.state)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use signoff_core::keys;
    use signoff_filters::{ExtensionCatalog, Manifest};

    const PRE: &str = "FetchDataFilter;ValidParticipantFilter;";
    const POST: &str = "SaveDataFilter";

    fn registry() -> Arc<FilterRegistry> {
        Arc::new(FilterRegistry::with_manifest(
            Manifest::default(),
            ExtensionCatalog::new(),
        ))
    }

    fn workflow() -> Workflow {
        Workflow::new("RequestPromotion", "Promotion")
            .with_transition("RequestPromotionForm", "Complete", "ManagerReview")
            .with_transition("ManagerReview", "Approve", "VicePresidentApprove")
            .with_transition("ManagerReview", "Deny", "PromotionDenied")
    }

    fn step(answered_by: &str) -> Step {
        Step::new("13", "ManagerReview", "Approve", answered_by, "Spock;Kirk")
            .with_step_id("12")
            .with_previous_state("RequestPromotionForm")
            .with_parameter(keys::FILTER_ORDER, json!(""))
    }

    fn processor(answered_by: &str) -> WorkflowProcessor {
        WorkflowProcessor::new(step(answered_by), registry(), workflow())
    }

    #[test]
    fn test_configure_pipeline() {
        let mut processor = processor("Spock");
        processor.configure_pipeline(PRE, POST).unwrap();

        assert_eq!(
            processor.get_filter_names(),
            [
                "FetchDataFilter",
                "ValidParticipantFilter",
                EXECUTE_TRIGGER_FILTER,
                "SaveDataFilter"
            ]
        );
    }

    #[test]
    fn test_configure_pipeline_requires_names() {
        let mut processor = processor("Spock");
        assert!(processor.configure_pipeline("", POST).unwrap_err().is_configuration());
        assert!(processor.configure_pipeline(PRE, "").unwrap_err().is_configuration());
    }

    #[test]
    fn test_configure_state_machine() {
        let mut processor = processor("Spock");
        processor.configure_state_machine().unwrap();
        assert_eq!(processor.get_current_state().unwrap(), "ManagerReview");
    }

    #[test]
    fn test_configure_state_machine_requires_state() {
        let mut step = step("Spock");
        step.state.clear();
        let mut processor = WorkflowProcessor::new(step, registry(), workflow());

        assert!(processor.configure_state_machine().unwrap_err().is_configuration());
        assert!(processor.get_current_state().is_err());
    }

    #[test]
    fn test_trigger_changes_state() {
        let mut processor = processor("Spock");
        let state = processor
            .configure_pipeline(PRE, POST)
            .unwrap()
            .configure_state_machine()
            .unwrap()
            .process_answer()
            .unwrap()
            .get_current_state()
            .unwrap();

        assert_eq!(state, "VicePresidentApprove");
        assert!(processor.get_error_list().is_empty());

        let step = processor.step();
        assert_eq!(step.state, "VicePresidentApprove");
        assert_eq!(step.previous_state, "ManagerReview");
        assert_eq!(step.filter_order(), "FetchDataFilter;ValidParticipantFilter;SaveDataFilter;");
    }

    #[test]
    fn test_invalid_participant_keeps_state() {
        let mut processor = processor("Data");
        processor
            .configure_pipeline(PRE, POST)
            .unwrap()
            .configure_state_machine()
            .unwrap()
            .process_answer()
            .unwrap();

        assert_eq!(processor.get_current_state().unwrap(), "ManagerReview");
        assert_eq!(processor.get_error_list(), ["Invalid Participant - Data"]);
        assert_eq!(processor.step().previous_state, "RequestPromotionForm");
        assert!(!processor.step().flag(keys::SAVE_DATA_FIRED));
    }

    #[test]
    fn test_unpermitted_trigger_is_illegal() {
        let mut step = step("Kirk");
        step.answer = "Escalate".to_string();
        let mut processor = WorkflowProcessor::new(step, registry(), workflow());

        processor
            .configure_pipeline(PRE, POST)
            .unwrap()
            .configure_state_machine()
            .unwrap();
        let err = processor.process_answer().unwrap_err();

        assert!(matches!(err, Error::IllegalTransition { .. }));
        assert_eq!(processor.get_current_state().unwrap(), "ManagerReview");
        assert!(!processor.step().flag(keys::SAVE_DATA_FIRED));
    }

    #[test]
    fn test_process_without_pipeline() {
        let mut processor = processor("Spock");
        processor.configure_state_machine().unwrap();
        assert!(processor.process_answer().unwrap_err().is_configuration());
    }

    #[test]
    fn test_process_without_state_machine() {
        let mut processor = processor("Spock");
        processor.configure_pipeline(PRE, POST).unwrap();
        assert!(processor.process_answer().unwrap_err().is_configuration());
    }

    #[test]
    fn test_duplicate_trigger_rejected_at_configure() {
        let workflow = workflow().with_transition("ManagerReview", "Approve", "PromotionDenied");
        let mut processor = WorkflowProcessor::new(step("Spock"), registry(), workflow);

        assert!(processor.configure_state_machine().unwrap_err().is_configuration());
    }

    #[test]
    fn test_into_step_returns_parameters() {
        let mut processor = processor("Kirk");
        processor
            .configure_pipeline(PRE, POST)
            .unwrap()
            .configure_state_machine()
            .unwrap()
            .process_answer()
            .unwrap();

        let step = processor.into_step();
        assert!(step.flag(keys::FETCH_DATA_FIRED));
        assert!(step.flag(keys::VALID_FIRED));
        assert!(step.flag(keys::SAVE_DATA_FIRED));
    }
}
