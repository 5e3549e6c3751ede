// State/trigger model: the immutable transition table for one workflow type

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::definition::WorkflowDefinition;
use super::entity::{EntityWorkflow, Variables};
use super::error::{ConfigurationError, WorkflowError};

/// Pass, or fail with zero or more human readable messages.
pub type GuardResult = Result<(), Vec<String>>;

/// Actions fail the same way guards do.
pub type ActionResult = Result<(), Vec<String>>;

type GuardFn = dyn Fn(&GuardContext<'_>) -> GuardResult + Send + Sync;
type ActionFn = dyn Fn(&mut ActionContext<'_>) -> ActionResult + Send + Sync;

/// What a guard gets to look at. Read-only.
pub struct GuardContext<'a> {
    pub trigger: &'a str,
    pub entity: &'a dyn EntityWorkflow,
    pub variables: &'a Variables,
}

impl GuardContext<'_> {
    pub fn entity<E: EntityWorkflow>(&self) -> Option<&E> {
        self.entity.downcast_ref::<E>()
    }

    pub fn variable<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, WorkflowError> {
        self.variables.get(key)
    }
}

/// What an action gets to change.
pub struct ActionContext<'a> {
    pub trigger: &'a str,
    pub entity: &'a mut dyn EntityWorkflow,
    pub variables: &'a Variables,
}

impl ActionContext<'_> {
    pub fn entity_mut<E: EntityWorkflow>(&mut self) -> Option<&mut E> {
        self.entity.downcast_mut::<E>()
    }

    pub fn variable<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, WorkflowError> {
        self.variables.get(key)
    }
}

/// Named predicate attached to a transition.
#[derive(Clone)]
pub struct Guard {
    name: String,
    check: Arc<GuardFn>,
}

impl Guard {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&GuardContext<'_>) -> GuardResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, ctx: &GuardContext<'_>) -> GuardResult {
        (self.check)(ctx)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guard").field(&self.name).finish()
    }
}

/// Named side effect run before the state changes.
#[derive(Clone)]
pub struct Action {
    name: String,
    run: Arc<ActionFn>,
}

impl Action {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>) -> ActionResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, ctx: &mut ActionContext<'_>) -> ActionResult {
        (self.run)(ctx)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Action").field(&self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    from: String,
    trigger: String,
    to: String,
    guard: Option<Guard>,
    action: Option<Action>,
}

impl Transition {
    pub fn new(from: impl Into<String>, trigger: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            trigger: trigger.into(),
            to: to.into(),
            guard: None,
            action: None,
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }
}

/// Immutable states, triggers and transitions of one workflow type.
///
/// States and triggers are interned once; the `(state, trigger)` table maps
/// straight into the transition arena, so lookups never allocate.
#[derive(Debug)]
pub struct WorkflowModel {
    workflow_type: String,
    definition: WorkflowDefinition,
    states: Vec<String>,
    state_ids: HashMap<String, usize>,
    triggers: Vec<String>,
    trigger_ids: HashMap<String, usize>,
    transitions: Vec<Transition>,
    table: HashMap<(usize, usize), usize>,
    outgoing: Vec<Vec<usize>>,
}

impl WorkflowModel {
    pub fn builder(workflow_type: impl Into<String>) -> WorkflowModelBuilder {
        WorkflowModelBuilder::new(workflow_type)
    }

    pub fn workflow_type(&self) -> &str {
        &self.workflow_type
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    /// Declared states in declaration order.
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// The first declared state; where new entities start.
    pub fn initial_state(&self) -> &str {
        &self.states[0]
    }

    /// Trigger names in order of first use.
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.state_ids.contains_key(state)
    }

    pub fn transition(&self, from: &str, trigger: &str) -> Option<&Transition> {
        let state = self.state_ids.get(from)?;
        let trigger = self.trigger_ids.get(trigger)?;
        self.table
            .get(&(*state, *trigger))
            .map(|idx| &self.transitions[*idx])
    }

    /// Transitions leaving `state`, in definition order.
    pub fn transitions_from<'a>(
        &'a self,
        state: &str,
    ) -> impl Iterator<Item = &'a Transition> + 'a {
        let indices: &'a [usize] = match self.state_ids.get(state) {
            Some(id) => &self.outgoing[*id],
            None => &[],
        };
        indices.iter().map(move |idx| &self.transitions[*idx])
    }

    pub fn is_terminal(&self, state: &str) -> bool {
        self.transitions_from(state).next().is_none()
    }

    pub fn describe(&self) -> WorkflowDescription {
        WorkflowDescription {
            workflow_type: self.workflow_type.clone(),
            states: self.states.clone(),
            triggers: self.triggers.clone(),
            transitions: self
                .transitions
                .iter()
                .map(|t| TransitionDescription {
                    from: t.from.clone(),
                    trigger: t.trigger.clone(),
                    to: t.to.clone(),
                    guard: t.guard.as_ref().map(|g| g.name().to_string()),
                    action: t.action.as_ref().map(|a| a.name().to_string()),
                })
                .collect(),
        }
    }
}

/// Serializable view of a model, for inspection and tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDescription {
    pub workflow_type: String,
    pub states: Vec<String>,
    pub triggers: Vec<String>,
    pub transitions: Vec<TransitionDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDescription {
    pub from: String,
    pub trigger: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

pub struct WorkflowModelBuilder {
    workflow_type: String,
    title: Option<String>,
    description: Option<String>,
    route: Option<String>,
    states: Vec<String>,
    transitions: Vec<Transition>,
}

impl WorkflowModelBuilder {
    pub fn new(workflow_type: impl Into<String>) -> Self {
        Self {
            workflow_type: workflow_type.into(),
            title: None,
            description: None,
            route: None,
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Declare a state. Repeats are ignored; the first declaration is the initial state.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        let state = state.into();
        if !self.states.contains(&state) {
            self.states.push(state);
        }
        self
    }

    pub fn states<I, S>(self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        states.into_iter().fold(self, |builder, s| builder.state(s))
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn build(self) -> Result<WorkflowModel, ConfigurationError> {
        let workflow_type = self.workflow_type;
        if self.states.is_empty() {
            return Err(ConfigurationError::EmptyModel { workflow_type });
        }

        let state_ids: HashMap<String, usize> = self
            .states
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.clone(), idx))
            .collect();

        let mut triggers = Vec::new();
        let mut trigger_ids = HashMap::new();
        let mut table = HashMap::new();
        let mut outgoing = vec![Vec::new(); self.states.len()];

        for (idx, transition) in self.transitions.iter().enumerate() {
            let from = *state_ids.get(&transition.from).ok_or_else(|| {
                ConfigurationError::UndeclaredState {
                    workflow_type: workflow_type.clone(),
                    state: transition.from.clone(),
                }
            })?;
            if !state_ids.contains_key(&transition.to) {
                return Err(ConfigurationError::UndeclaredState {
                    workflow_type,
                    state: transition.to.clone(),
                });
            }

            let trigger = *trigger_ids.entry(transition.trigger.clone()).or_insert_with(|| {
                triggers.push(transition.trigger.clone());
                triggers.len() - 1
            });

            if table.insert((from, trigger), idx).is_some() {
                return Err(ConfigurationError::DuplicateTransition {
                    workflow_type,
                    from: transition.from.clone(),
                    trigger: transition.trigger.clone(),
                });
            }
            outgoing[from].push(idx);
        }

        let definition = WorkflowDefinition {
            workflow_type: workflow_type.clone(),
            title: self.title.unwrap_or_else(|| workflow_type.clone()),
            description: self.description.unwrap_or_default(),
            route: self.route.unwrap_or_else(|| workflow_type.to_lowercase()),
        };

        Ok(WorkflowModel {
            workflow_type,
            definition,
            states: self.states,
            state_ids,
            triggers,
            trigger_ids,
            transitions: self.transitions,
            table,
            outgoing,
        })
    }
}
