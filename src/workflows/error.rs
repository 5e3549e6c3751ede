use thiserror::Error;

/// Message reported when no transition exists for the entity's current state.
pub const TRIGGER_NOT_ALLOWED: &str = "trigger not allowed from current state";

/// Hard failures of the workflow engine.
///
/// Business rejections (illegal transition, guard or action failure) are not
/// errors at this level: they come back inside a successful
/// [`TriggerOutcome`](super::TriggerOutcome) carrying an error list.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Unknown workflow type: {workflow_type}")]
    UnknownWorkflowType { workflow_type: String },
    #[error("Invalid workflow variable '{key}': {source}")]
    Variable {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Mistakes in model or registry setup. These must abort startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Workflow type '{workflow_type}' is already registered")]
    DuplicateWorkflowType { workflow_type: String },
    #[error("Workflow '{workflow_type}' repeats trigger '{trigger}' from state '{from}'")]
    DuplicateTransition {
        workflow_type: String,
        from: String,
        trigger: String,
    },
    #[error("Workflow '{workflow_type}' references undeclared state '{state}'")]
    UndeclaredState { workflow_type: String, state: String },
    #[error("Workflow '{workflow_type}' declares no states")]
    EmptyModel { workflow_type: String },
    #[error("Model for '{model_type}' cannot be registered as '{workflow_type}'")]
    TypeMismatch {
        workflow_type: String,
        model_type: String,
    },
    #[error("Global workflow registry has already been installed")]
    RegistryAlreadyInstalled,
}

impl WorkflowError {
    pub fn unknown_type(workflow_type: impl Into<String>) -> Self {
        WorkflowError::UnknownWorkflowType {
            workflow_type: workflow_type.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, WorkflowError::Configuration(_))
    }
}
