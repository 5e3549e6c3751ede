// Entity capability and trigger request types

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;

use super::error::WorkflowError;

/// Access to the concrete type behind a `dyn EntityWorkflow`.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Capability every workflow-backed domain entity provides.
///
/// The engine only ever reads the workflow type, reads and writes the state,
/// and reads the assignee. Guards and actions that need more reach the
/// concrete entity through [`AsAny`].
pub trait EntityWorkflow: AsAny + Send + Sync + 'static {
    fn workflow_type(&self) -> &str;

    fn state(&self) -> &str;

    fn set_state(&mut self, state: &str);

    /// Owner responsible for the next action.
    fn assignee(&self) -> &str;
}

impl dyn EntityWorkflow {
    pub fn downcast_ref<E: EntityWorkflow>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }

    pub fn downcast_mut<E: EntityWorkflow>(&mut self) -> Option<&mut E> {
        self.as_any_mut().downcast_mut::<E>()
    }
}

/// Named values handed through to guards and actions.
///
/// The engine never looks inside; values are stored as JSON so any
/// serializable view model can travel with a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(HashMap<String, serde_json::Value>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), WorkflowError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| WorkflowError::Variable {
            key: key.clone(),
            source,
        })?;
        self.0.insert(key, value);
        Ok(())
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    /// Deserialize the variable stored under `key`, `Ok(None)` when absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, WorkflowError> {
        match self.0.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| WorkflowError::Variable {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

/// A caller's request to fire `trigger` on `entity`.
#[derive(Debug, Clone)]
pub struct TriggerRequest<E> {
    pub trigger: String,
    pub entity: E,
    pub variables: Variables,
}

impl<E: EntityWorkflow> TriggerRequest<E> {
    pub fn new(trigger: impl Into<String>, entity: E) -> Self {
        Self {
            trigger: trigger.into(),
            entity,
            variables: Variables::new(),
        }
    }

    pub fn with_variable<T: Serialize>(
        mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self, WorkflowError> {
        self.variables.insert(key, value)?;
        Ok(self)
    }
}
