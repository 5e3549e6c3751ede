// Result envelope returned by workflow-backed services

use serde::{Deserialize, Serialize};

/// Either the triggers that may fire next, or the errors that blocked the
/// last request. Never both.
///
/// `Errors` is tried first when decoding, so a payload carrying both keys
/// reads as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerInfo {
    Errors {
        errors: Vec<String>,
    },
    Available {
        #[serde(rename = "availableTriggers")]
        triggers: Vec<String>,
    },
}

impl TriggerInfo {
    pub fn for_success<I, S>(triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TriggerInfo::Available {
            triggers: triggers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn for_errors<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TriggerInfo::Errors {
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    /// Presence of errors is definitive failure.
    pub fn has_errors(&self) -> bool {
        matches!(self, TriggerInfo::Errors { .. })
    }

    pub fn available_triggers(&self) -> &[String] {
        match self {
            TriggerInfo::Available { triggers } => triggers,
            TriggerInfo::Errors { .. } => &[],
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            TriggerInfo::Available { .. } => &[],
            TriggerInfo::Errors { errors } => errors,
        }
    }
}

/// Trigger info plus the caller's view model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult<V> {
    pub trigger_info: TriggerInfo,
    pub view_model: V,
}

impl<V> WorkflowResult<V> {
    pub fn new(trigger_info: TriggerInfo, view_model: V) -> Self {
        Self {
            trigger_info,
            view_model,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.trigger_info.has_errors()
    }

    pub fn map<W>(self, f: impl FnOnce(V) -> W) -> WorkflowResult<W> {
        WorkflowResult {
            trigger_info: self.trigger_info,
            view_model: f(self.view_model),
        }
    }
}
