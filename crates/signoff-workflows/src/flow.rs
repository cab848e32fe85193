//! Workflow - declarative states and transitions
//!
//! A Workflow is immutable configuration for one kind of decision. The
//! declared states and triggers are descriptive; the state configs are the
//! transition table the state machine is built from.

use serde::{Deserialize, Serialize};
use signoff_core::{Error, Result};
use std::collections::HashSet;

/// A declared state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct State {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A declared trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Trigger {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Permitted transition: firing `trigger` in `state` moves to `target_state`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateConfig {
    pub state: String,
    pub trigger: String,
    pub target_state: String,
}

impl StateConfig {
    pub fn new(state: &str, trigger: &str, target_state: &str) -> Self {
        Self {
            state: state.to_string(),
            trigger: trigger.to_string(),
            target_state: target_state.to_string(),
        }
    }
}

/// Workflow definition (serializable)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Workflow {
    pub workflow_id: String,
    #[serde(default)]
    pub workflow_type: String,
    #[serde(default)]
    pub states: Vec<State>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub state_configs: Vec<StateConfig>,
}

impl Workflow {
    /// Create a new workflow definition
    pub fn new(workflow_id: &str, workflow_type: &str) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            workflow_type: workflow_type.to_string(),
            ..Default::default()
        }
    }

    /// Parse the reference JSON encoding
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_state(mut self, name: &str) -> Self {
        self.states.push(State {
            name: name.to_string(),
            description: None,
        });
        self
    }

    pub fn with_trigger(mut self, name: &str) -> Self {
        self.triggers.push(Trigger {
            name: name.to_string(),
            description: None,
        });
        self
    }

    /// Add a transition
    pub fn with_transition(mut self, state: &str, trigger: &str, target_state: &str) -> Self {
        self.state_configs
            .push(StateConfig::new(state, trigger, target_state));
        self
    }

    /// Distinct states that have at least one outgoing transition, in the
    /// order they first appear
    pub fn states_reachable(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.state_configs
            .iter()
            .map(|c| c.state.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Transitions leaving `state`, in configuration order
    pub fn transitions_from<'a>(
        &'a self,
        state: &'a str,
    ) -> impl Iterator<Item = &'a StateConfig> + 'a {
        self.state_configs.iter().filter(move |c| c.state == state)
    }

    /// Validate the transition table
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for config in &self.state_configs {
            if config.state.is_empty()
                || config.trigger.is_empty()
                || config.target_state.is_empty()
            {
                return Err(Error::configuration(format!(
                    "Workflow '{}' has an incomplete state config: {:?}",
                    self.workflow_id, config
                )));
            }

            if !seen.insert((config.state.as_str(), config.trigger.as_str())) {
                return Err(Error::configuration(format!(
                    "Workflow '{}' configures trigger '{}' twice for state '{}'",
                    self.workflow_id, config.trigger, config.state
                )));
            }
        }

        Ok(())
    }
}
