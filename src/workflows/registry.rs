// Workflow registry: workflow type -> model, filled at startup, read-only afterwards

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use super::definition::{DefinitionCreator, WorkflowDefinition};
use super::error::{ConfigurationError, WorkflowError};
use super::model::WorkflowModel;

#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    models: HashMap<String, Arc<WorkflowModel>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `model` under `workflow_type`.
    ///
    /// Fails when the type is taken or the model was built for another type.
    pub fn register(
        &mut self,
        workflow_type: impl Into<String>,
        model: WorkflowModel,
    ) -> Result<(), ConfigurationError> {
        let workflow_type = workflow_type.into();
        if model.workflow_type() != workflow_type {
            return Err(ConfigurationError::TypeMismatch {
                workflow_type,
                model_type: model.workflow_type().to_string(),
            });
        }
        if self.models.contains_key(&workflow_type) {
            return Err(ConfigurationError::DuplicateWorkflowType { workflow_type });
        }

        info!(
            workflow_type = %workflow_type,
            states = model.states().len(),
            transitions = model.transitions().len(),
            "Registered workflow"
        );
        self.models.insert(workflow_type, Arc::new(model));
        Ok(())
    }

    /// Register a model under its own workflow type.
    pub fn register_model(&mut self, model: WorkflowModel) -> Result<(), ConfigurationError> {
        let workflow_type = model.workflow_type().to_string();
        self.register(workflow_type, model)
    }

    pub fn with_model(mut self, model: WorkflowModel) -> Result<Self, ConfigurationError> {
        self.register_model(model)?;
        Ok(self)
    }

    pub fn resolve(&self, workflow_type: &str) -> Result<&WorkflowModel, WorkflowError> {
        match self.models.get(workflow_type) {
            Some(model) => Ok(model.as_ref()),
            None => {
                debug!(workflow_type = %workflow_type, "Workflow type not registered");
                Err(WorkflowError::unknown_type(workflow_type))
            }
        }
    }

    pub fn contains(&self, workflow_type: &str) -> bool {
        self.models.contains_key(workflow_type)
    }

    /// Registered workflow types, sorted.
    pub fn workflow_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.models.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// One definition per registered workflow type, sorted by type.
    pub fn definitions(&self, creator: &dyn DefinitionCreator) -> Vec<WorkflowDefinition> {
        self.workflow_types()
            .into_iter()
            .map(|t| creator.create(t, self.models[t].definition()))
            .collect()
    }
}

/// Process-wide registry, installed once at startup.
static GLOBAL_REGISTRY: OnceLock<Arc<WorkflowRegistry>> = OnceLock::new();

/// Install the process-wide registry. A second install is a configuration error.
pub fn install_registry(
    registry: WorkflowRegistry,
) -> Result<Arc<WorkflowRegistry>, ConfigurationError> {
    let registry = Arc::new(registry);
    GLOBAL_REGISTRY
        .set(Arc::clone(&registry))
        .map_err(|_| ConfigurationError::RegistryAlreadyInstalled)?;
    info!(workflows = registry.len(), "Workflow registry installed");
    Ok(registry)
}

/// The process-wide registry, if one has been installed.
pub fn registry() -> Option<Arc<WorkflowRegistry>> {
    GLOBAL_REGISTRY.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::definition::ModelDefinitionCreator;
    use crate::workflows::model::Transition;

    fn model(workflow_type: &str) -> WorkflowModel {
        WorkflowModel::builder(workflow_type)
            .states(["A", "B"])
            .transition(Transition::new("A", "go", "B"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = WorkflowRegistry::new();
        registry.register("Flow", model("Flow")).unwrap();

        assert_eq!(registry.resolve("Flow").unwrap().workflow_type(), "Flow");
        assert!(registry.contains("Flow"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_type_is_configuration_error() {
        let mut registry = WorkflowRegistry::new();
        registry.register_model(model("Flow")).unwrap();

        let err = registry.register_model(model("Flow")).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateWorkflowType {
                workflow_type: "Flow".to_string()
            }
        );
    }

    #[test]
    fn test_mismatched_type_is_rejected() {
        let mut registry = WorkflowRegistry::new();
        let err = registry.register("Other", model("Flow")).unwrap_err();
        assert!(matches!(err, ConfigurationError::TypeMismatch { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_type() {
        let registry = WorkflowRegistry::new();
        let err = registry.resolve("Bogus").unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::UnknownWorkflowType { ref workflow_type } if workflow_type == "Bogus"
        ));
    }

    #[test]
    fn test_definitions_sorted_by_type() {
        let registry = WorkflowRegistry::new()
            .with_model(model("Zeta"))
            .unwrap()
            .with_model(model("Alpha"))
            .unwrap();

        let defs = registry.definitions(&ModelDefinitionCreator);
        let types: Vec<&str> = defs.iter().map(|d| d.workflow_type.as_str()).collect();
        assert_eq!(types, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_global_registry_installs_once() {
        let installed =
            install_registry(WorkflowRegistry::new().with_model(model("Global")).unwrap());
        // Other tests in this binary never install, so the first call wins.
        let installed = installed.unwrap();
        assert!(registry().unwrap().contains("Global"));
        assert_eq!(installed.len(), 1);

        let err = install_registry(WorkflowRegistry::new()).unwrap_err();
        assert_eq!(err, ConfigurationError::RegistryAlreadyInstalled);
    }
}
