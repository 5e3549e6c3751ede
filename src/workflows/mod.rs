// Workflow engine: trigger-based state transitions for any entity type
//
// Models are built and registered once at startup; the engine then fires
// triggers and answers availability queries against the shared registry.

pub mod definition;
pub mod engine;
pub mod entity;
pub mod error;
pub mod model;
pub mod registry;
pub mod result;

pub use definition::{
    ConfigDefinitionCreator, DefinitionCreator, DefinitionOverride, ModelDefinitionCreator,
    WorkflowDefinition,
};
pub use engine::{TriggerCheck, TriggerOutcome, WorkflowEngine};
pub use entity::{AsAny, EntityWorkflow, TriggerRequest, Variables};
pub use error::{ConfigurationError, WorkflowError, TRIGGER_NOT_ALLOWED};
pub use model::{
    Action, ActionContext, ActionResult, Guard, GuardContext, GuardResult, Transition,
    TransitionDescription, WorkflowDescription, WorkflowModel, WorkflowModelBuilder,
};
pub use registry::{install_registry, registry, WorkflowRegistry};
pub use result::{TriggerInfo, WorkflowResult};
