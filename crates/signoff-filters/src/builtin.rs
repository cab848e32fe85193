//! Built-in filters
//!
//! Reference implementations every custom filter is measured against. The
//! data filters are placeholders for real I/O and only record that they ran.

use signoff_core::{keys, Result, Step};

use crate::filter::Filter;

/// Gather data for a workflow
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchDataFilter;

impl FetchDataFilter {
    pub const NAME: &'static str = "FetchDataFilter";
    pub const TYPE_NAME: &'static str = "signoff.FetchDataFilter";
}

impl Filter for FetchDataFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, step: &mut Step) -> Result<()> {
        if step.can_process {
            step.set_flag(keys::FETCH_DATA_FIRED);
            step.record_filter(Self::NAME);
        }
        Ok(())
    }
}

/// Save the workflow data
#[derive(Debug, Default, Clone, Copy)]
pub struct SaveDataFilter;

impl SaveDataFilter {
    pub const NAME: &'static str = "SaveDataFilter";
    pub const TYPE_NAME: &'static str = "signoff.SaveDataFilter";
}

impl Filter for SaveDataFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, step: &mut Step) -> Result<()> {
        if step.can_process {
            step.set_flag(keys::SAVE_DATA_FIRED);
            step.record_filter(Self::NAME);
        }
        Ok(())
    }
}

/// Marks the answer as a requested transition without owning a state
/// machine. The workflow processor splices in its own firing filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TriggerStateFilter;

impl TriggerStateFilter {
    pub const NAME: &'static str = "TriggerStateFilter";
    pub const TYPE_NAME: &'static str = "signoff.TriggerStateFilter";
}

impl Filter for TriggerStateFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, step: &mut Step) -> Result<()> {
        if step.can_process {
            step.set_flag(keys::TRIGGER_STATE_FIRED);
            let trigger = serde_json::Value::String(step.answer.clone());
            step.parameters
                .insert(keys::REQUESTED_TRIGGER.to_string(), trigger);
            step.record_filter(Self::NAME);
        }
        Ok(())
    }
}

/// Validate that the supplier of the answer has authorization to do so.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidParticipantFilter;

impl ValidParticipantFilter {
    pub const NAME: &'static str = "ValidParticipantFilter";
    pub const TYPE_NAME: &'static str = "signoff.ValidParticipantFilter";
}

impl Filter for ValidParticipantFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, step: &mut Step) -> Result<()> {
        if step.can_process {
            step.set_flag(keys::VALID_FIRED);
            step.record_filter(Self::NAME);

            if !step.is_user_valid_participant() {
                tracing::debug!(answered_by = %step.answered_by, "Participant rejected");
                let reason = format!("Invalid Participant - {}", step.answered_by);
                step.block(reason);
            }
        }
        Ok(())
    }
}
