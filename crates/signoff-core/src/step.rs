//! Step - one pending decision moving through a workflow
//!
//! A Step carries the state of a workflow instance together with the answer
//! a participant supplied. The answer is used as the trigger for the next
//! transition. Filters read and mutate the step in place while a pipeline
//! runs; persisting it afterwards is the caller's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Delimiter for participant lists and filter-name lists
pub const LIST_DELIMITER: char = ';';

/// Well-known keys filters write into [`Step::parameters`]
pub mod keys {
    /// Accumulates `<FilterName>;` for every filter that did work
    pub const FILTER_ORDER: &str = "FilterOrder";
    pub const FETCH_DATA_FIRED: &str = "FetchDataFired";
    pub const SAVE_DATA_FIRED: &str = "SaveDataFired";
    pub const TRIGGER_STATE_FIRED: &str = "TriggerStateFired";
    pub const VALID_FIRED: &str = "ValidFired";
    /// Trigger recorded by the standalone trigger-state filter
    pub const REQUESTED_TRIGGER: &str = "RequestedTrigger";
}

/// A single answer awaiting a workflow transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Step {
    pub workflow_instance_id: String,
    pub workflow_id: String,
    #[serde(default)]
    step_id: String,
    pub state: String,
    #[serde(default)]
    pub previous_state: String,
    /// Trigger name fired against the state machine
    pub answer: String,
    pub created: DateTime<Utc>,
    pub answered_by: String,
    /// `;`-delimited set of actors allowed to answer
    pub participants: String,
    /// Gate honored by filters. Once cleared it stays cleared for the run.
    #[serde(default = "default_can_process")]
    pub can_process: bool,
    #[serde(default)]
    error_list: Vec<String>,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

fn default_can_process() -> bool {
    true
}

impl Default for Step {
    fn default() -> Self {
        Self {
            workflow_instance_id: String::new(),
            workflow_id: String::new(),
            step_id: String::new(),
            state: String::new(),
            previous_state: String::new(),
            answer: String::new(),
            created: Utc::now(),
            answered_by: String::new(),
            participants: String::new(),
            can_process: true,
            error_list: Vec::new(),
            parameters: HashMap::new(),
        }
    }
}

impl Step {
    /// Create a step for an answer given in `state`
    pub fn new(
        workflow_instance_id: &str,
        state: &str,
        answer: &str,
        answered_by: &str,
        participants: &str,
    ) -> Self {
        Self {
            workflow_instance_id: workflow_instance_id.to_string(),
            state: state.to_string(),
            answer: answer.to_string(),
            answered_by: answered_by.to_string(),
            participants: participants.to_string(),
            ..Default::default()
        }
    }

    pub fn with_workflow_id(mut self, workflow_id: &str) -> Self {
        self.workflow_id = workflow_id.to_string();
        self
    }

    /// Use an identifier issued elsewhere (e.g. by the store that owns the step)
    pub fn with_step_id(mut self, step_id: &str) -> Self {
        self.step_id = step_id.to_string();
        self
    }

    pub fn with_previous_state(mut self, previous_state: &str) -> Self {
        self.previous_state = previous_state.to_string();
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn with_parameter(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn with_parameters(mut self, parameters: HashMap<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Generate the step id. Used when a step is first created; a step id
    /// can only be assigned once.
    pub fn create_step_id(&mut self) -> Result<&str> {
        if !self.step_id.is_empty() {
            return Err(Error::StepIdAssigned(self.step_id.clone()));
        }

        self.step_id = uuid::Uuid::new_v4().to_string();
        Ok(&self.step_id)
    }

    /// Diagnostics accumulated during processing, in the order they were added
    pub fn errors(&self) -> &[String] {
        &self.error_list
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.error_list.push(message.into());
    }

    /// Clear the processing gate and record why
    pub fn block(&mut self, reason: impl Into<String>) {
        self.can_process = false;
        self.add_error(reason);
    }

    /// Iterate over the authorized actors
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.participants
            .split(LIST_DELIMITER)
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Determine if the actor who answered is authorized to do so
    pub fn is_user_valid_participant(&self) -> bool {
        let actor = self.answered_by.trim();
        !actor.is_empty() && self.participants().any(|p| p == actor)
    }

    /// Determine if a step has all the information needed to trigger the
    /// next state in a state machine
    pub fn is_valid_for_workflow_transition(&self) -> bool {
        !self.answered_by.is_empty()
            && !self.answer.is_empty()
            && !self.state.is_empty()
            && !self.workflow_instance_id.is_empty()
    }

    /// Append `<name>;` to the `FilterOrder` accumulator, creating it when absent
    pub fn record_filter(&mut self, name: &str) {
        let entry = self
            .parameters
            .entry(keys::FILTER_ORDER.to_string())
            .or_insert_with(|| Value::String(String::new()));

        let mut order = match &mut *entry {
            Value::String(s) => std::mem::take(s),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        order.push_str(name);
        order.push(LIST_DELIMITER);
        *entry = Value::String(order);
    }

    /// The `FilterOrder` accumulator, empty when no filter recorded itself
    pub fn filter_order(&self) -> &str {
        self.parameters
            .get(keys::FILTER_ORDER)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn set_flag(&mut self, key: &str) {
        self.parameters.insert(key.to_string(), Value::Bool(true));
    }

    /// Read a boolean parameter, false when absent or not a boolean
    pub fn flag(&self, key: &str) -> bool {
        self.parameters
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spock_step() -> Step {
        Step::new("13", "ManagerReview", "Approve", "Spock", "Spock;Kirk")
    }

    #[test]
    fn test_defaults() {
        let step = Step::default();
        assert!(step.can_process);
        assert!(step.errors().is_empty());
        assert!(step.step_id().is_empty());
    }

    #[test]
    fn test_create_step_id_only_once() {
        let mut step = spock_step();
        let id = step.create_step_id().unwrap().to_string();
        assert_eq!(id.len(), 36);

        let err = step.create_step_id().unwrap_err();
        assert!(matches!(err, Error::StepIdAssigned(ref existing) if *existing == id));
        assert_eq!(step.step_id(), id);
    }

    #[test]
    fn test_preassigned_step_id_blocks_creation() {
        let mut step = spock_step().with_step_id("12");
        assert!(step.create_step_id().is_err());
    }

    #[test]
    fn test_valid_participant() {
        assert!(spock_step().is_user_valid_participant());

        let mut step = spock_step();
        step.answered_by = "McCoy".to_string();
        assert!(!step.is_user_valid_participant());
    }

    #[test]
    fn test_participant_match_is_exact() {
        let mut step = spock_step();
        step.answered_by = "Spo".to_string();
        assert!(!step.is_user_valid_participant());

        step.answered_by = String::new();
        assert!(!step.is_user_valid_participant());

        step.participants = " Spock ; Kirk ;".to_string();
        step.answered_by = "Kirk".to_string();
        assert!(step.is_user_valid_participant());
        assert_eq!(step.participants().collect::<Vec<_>>(), vec!["Spock", "Kirk"]);
    }

    #[test]
    fn test_valid_for_workflow_transition() {
        assert!(spock_step().is_valid_for_workflow_transition());

        let mut step = spock_step();
        step.answer.clear();
        assert!(!step.is_valid_for_workflow_transition());
    }

    #[test]
    fn test_record_filter_accumulates() {
        let mut step = spock_step().with_parameter(keys::FILTER_ORDER, json!(""));
        step.record_filter("FetchDataFilter");
        step.record_filter("SaveDataFilter");
        assert_eq!(step.filter_order(), "FetchDataFilter;SaveDataFilter;");
    }

    #[test]
    fn test_record_filter_creates_accumulator() {
        let mut step = spock_step();
        assert_eq!(step.filter_order(), "");
        step.record_filter("A");
        assert_eq!(step.filter_order(), "A;");
    }

    #[test]
    fn test_block() {
        let mut step = spock_step();
        step.block("Invalid Participant - Data");
        assert!(!step.can_process);
        assert_eq!(step.errors(), ["Invalid Participant - Data"]);
    }

    #[test]
    fn test_deserialize_pascal_case() {
        let step: Step = serde_json::from_value(json!({
            "WorkflowInstanceId": "13",
            "WorkflowId": "RequestPromotion",
            "StepId": "12",
            "State": "ManagerReview",
            "Answer": "Approve",
            "Created": "2011-04-01T10:00:00Z",
            "AnsweredBy": "Spock",
            "Participants": "Spock;Kirk"
        }))
        .unwrap();

        assert_eq!(step.step_id(), "12");
        assert!(step.can_process);
        assert!(step.parameters.is_empty());
        assert!(step.previous_state.is_empty());
    }
}
