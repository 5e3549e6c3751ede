// Workflow definition catalog: what callers show when listing workflow types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Presentation metadata for one workflow type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    #[serde(rename = "type")]
    pub workflow_type: String,
    pub title: String,
    pub description: String,
    pub route: String,
}

/// Produces the definition shown for a registered workflow type.
pub trait DefinitionCreator {
    fn create(&self, workflow_type: &str, fallback: &WorkflowDefinition) -> WorkflowDefinition;
}

/// Uses the metadata declared on each model as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelDefinitionCreator;

impl DefinitionCreator for ModelDefinitionCreator {
    fn create(&self, _workflow_type: &str, fallback: &WorkflowDefinition) -> WorkflowDefinition {
        fallback.clone()
    }
}

/// Partial override for a workflow's definition, usually read from config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionOverride {
    pub title: Option<String>,
    pub description: Option<String>,
    pub route: Option<String>,
}

/// Applies configured overrides on top of the model metadata.
#[derive(Debug, Clone, Default)]
pub struct ConfigDefinitionCreator {
    overrides: HashMap<String, DefinitionOverride>,
}

impl ConfigDefinitionCreator {
    /// Workflow types are matched case-insensitively.
    pub fn new(overrides: HashMap<String, DefinitionOverride>) -> Self {
        Self {
            overrides: overrides
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }
}

impl DefinitionCreator for ConfigDefinitionCreator {
    fn create(&self, workflow_type: &str, fallback: &WorkflowDefinition) -> WorkflowDefinition {
        let Some(o) = self.overrides.get(&workflow_type.to_lowercase()) else {
            return fallback.clone();
        };
        WorkflowDefinition {
            workflow_type: workflow_type.to_string(),
            title: o.title.clone().unwrap_or_else(|| fallback.title.clone()),
            description: o
                .description
                .clone()
                .unwrap_or_else(|| fallback.description.clone()),
            route: o.route.clone().unwrap_or_else(|| fallback.route.clone()),
        }
    }
}
