// Microflow Library - trigger-based workflow engine
// This exposes the engine, its collaborators and the sample workflows

pub mod actor;
pub mod config;
pub mod samples;
pub mod store;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use actor::{ActorContext, StaticActor};
pub use config::{config, MicroflowConfig};
pub use store::{EntityStore, InMemoryStore, StoredEntity};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflows::{
    Action, ConfigurationError, EntityWorkflow, Guard, Transition, TriggerInfo, TriggerOutcome,
    TriggerRequest, Variables, WorkflowEngine, WorkflowError, WorkflowModel, WorkflowRegistry,
    WorkflowResult,
};
