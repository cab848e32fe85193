//! Flat deterministic state machine
//!
//! A permit table keyed by state and trigger. There is no history, no
//! nesting and no entry or exit hooks; anything like that belongs in a
//! filter.

use signoff_core::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

use crate::flow::Workflow;

#[derive(Debug, Clone)]
pub struct StateMachine {
    state: String,
    permits: HashMap<String, HashMap<String, String>>,
}

impl StateMachine {
    /// Create a machine sitting in `initial`, which must not be empty
    pub fn new(initial: &str) -> Result<Self> {
        if initial.is_empty() {
            return Err(Error::configuration("state machine initial state can not be empty"));
        }

        Ok(Self {
            state: initial.to_string(),
            permits: HashMap::new(),
        })
    }

    /// Build the permit table from a workflow's state configs
    pub fn from_workflow(initial: &str, workflow: &Workflow) -> Result<Self> {
        let mut machine = Self::new(initial)?;

        for state in workflow.states_reachable() {
            for config in workflow.transitions_from(state) {
                machine.permit(&config.state, &config.trigger, &config.target_state)?;
            }
        }

        Ok(machine)
    }

    /// Allow `trigger` to move `state` to `target`. A second permit for the
    /// same state and trigger is rejected.
    pub fn permit(&mut self, state: &str, trigger: &str, target: &str) -> Result<&mut Self> {
        let triggers = self.permits.entry(state.to_string()).or_default();

        if let Some(existing) = triggers.get(trigger) {
            return Err(Error::configuration(format!(
                "trigger '{}' is already configured for state '{}' (target '{}')",
                trigger, state, existing
            )));
        }

        triggers.insert(trigger.to_string(), target.to_string());
        Ok(self)
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn can_fire(&self, trigger: &str) -> bool {
        self.target_for(trigger).is_some()
    }

    /// Triggers permitted from the current state, sorted
    pub fn permitted_triggers(&self) -> Vec<&str> {
        let mut triggers: Vec<&str> = self
            .permits
            .get(&self.state)
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default();
        triggers.sort_unstable();
        triggers
    }

    fn target_for(&self, trigger: &str) -> Option<&String> {
        self.permits.get(&self.state).and_then(|t| t.get(trigger))
    }

    /// Fire a trigger, returning the new state
    pub fn fire(&mut self, trigger: &str) -> Result<&str> {
        let target = self
            .target_for(trigger)
            .cloned()
            .ok_or_else(|| Error::illegal_transition(&self.state, trigger))?;

        debug!(from = %self.state, trigger = %trigger, to = %target, "Firing transition");
        self.state = target;
        Ok(&self.state)
    }
}
