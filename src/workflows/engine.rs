// Transition executor and trigger availability query
//
// Everything here runs synchronously and never touches storage: the caller
// loads the entity, fires, and saves the returned entity on success.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::entity::{EntityWorkflow, TriggerRequest, Variables};
use super::error::{WorkflowError, TRIGGER_NOT_ALLOWED};
use super::model::{ActionContext, GuardContext, Transition};
use super::registry::WorkflowRegistry;
use super::result::{TriggerInfo, WorkflowResult};

/// Result of firing a trigger.
///
/// `success == false` always comes with at least one error, and the entity is
/// then exactly as it was before the call.
#[derive(Debug, Clone)]
pub struct TriggerOutcome<E> {
    pub trigger: String,
    pub success: bool,
    pub errors: Vec<String>,
    pub from_state: String,
    pub entity: E,
}

impl<E: EntityWorkflow> TriggerOutcome<E> {
    fn accepted(trigger: String, from_state: String, entity: E) -> Self {
        Self {
            trigger,
            success: true,
            errors: Vec::new(),
            from_state,
            entity,
        }
    }

    fn rejected(trigger: String, from_state: String, entity: E, errors: Vec<String>) -> Self {
        Self {
            trigger,
            success: false,
            errors,
            from_state,
            entity,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn current_state(&self) -> &str {
        self.entity.state()
    }

    pub fn into_entity(self) -> E {
        self.entity
    }
}

/// Whether a trigger could fire right now, without running its action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCheck {
    pub trigger: String,
    pub errors: Vec<String>,
}

impl TriggerCheck {
    pub fn is_allowed(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    registry: Arc<WorkflowRegistry>,
    log_rejections: bool,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<WorkflowRegistry>) -> Self {
        Self {
            registry,
            log_rejections: true,
        }
    }

    /// Log rejected triggers at info level instead of debug.
    pub fn with_log_rejections(mut self, log_rejections: bool) -> Self {
        self.log_rejections = log_rejections;
        self
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Fire `request.trigger` on `request.entity`.
    ///
    /// Only an unregistered workflow type is an `Err`. Illegal triggers and
    /// guard or action rejections come back as an unsuccessful outcome.
    pub fn fire<E>(&self, request: TriggerRequest<E>) -> Result<TriggerOutcome<E>, WorkflowError>
    where
        E: EntityWorkflow + Clone,
    {
        let TriggerRequest {
            trigger,
            mut entity,
            variables,
        } = request;
        let model = self.registry.resolve(entity.workflow_type())?;
        let from_state = entity.state().to_string();

        let Some(transition) = model.transition(&from_state, &trigger) else {
            self.log_rejection(&entity, &trigger, &[TRIGGER_NOT_ALLOWED.to_string()]);
            return Ok(TriggerOutcome::rejected(
                trigger,
                from_state,
                entity,
                vec![TRIGGER_NOT_ALLOWED.to_string()],
            ));
        };

        if let Err(errors) = check_guard(transition, &trigger, &entity, &variables) {
            self.log_rejection(&entity, &trigger, &errors);
            return Ok(TriggerOutcome::rejected(trigger, from_state, entity, errors));
        }

        if let Some(action) = transition.action() {
            let snapshot = entity.clone();
            let mut ctx = ActionContext {
                trigger: &trigger,
                entity: &mut entity,
                variables: &variables,
            };
            if let Err(errors) = action.run(&mut ctx) {
                let errors = non_empty(errors, || {
                    format!("Action '{}' failed for trigger '{}'", action.name(), trigger)
                });
                self.log_rejection(&snapshot, &trigger, &errors);
                return Ok(TriggerOutcome::rejected(trigger, from_state, snapshot, errors));
            }
        }

        entity.set_state(transition.to());
        info!(
            workflow_type = %entity.workflow_type(),
            trigger = %trigger,
            from = %from_state,
            to = %transition.to(),
            assignee = %entity.assignee(),
            "Workflow transition completed"
        );
        Ok(TriggerOutcome::accepted(trigger, from_state, entity))
    }

    /// Run the lookup and guard for `request` without mutating anything.
    pub fn can_trigger<E>(&self, request: &TriggerRequest<E>) -> Result<TriggerCheck, WorkflowError>
    where
        E: EntityWorkflow,
    {
        let entity: &dyn EntityWorkflow = &request.entity;
        let model = self.registry.resolve(entity.workflow_type())?;
        let errors = match model.transition(entity.state(), &request.trigger) {
            Some(transition) => {
                check_guard(transition, &request.trigger, entity, &request.variables)
                    .err()
                    .unwrap_or_default()
            }
            None => vec![TRIGGER_NOT_ALLOWED.to_string()],
        };
        Ok(TriggerCheck {
            trigger: request.trigger.clone(),
            errors,
        })
    }

    /// Triggers that may fire from the entity's current state, in model order.
    ///
    /// Guards see an empty variable map here, so a trigger whose guard needs
    /// caller input is reported as available and validated on `fire`.
    pub fn available_triggers(
        &self,
        entity: &dyn EntityWorkflow,
    ) -> Result<Vec<String>, WorkflowError> {
        let model = self.registry.resolve(entity.workflow_type())?;
        if !model.has_state(entity.state()) {
            warn!(
                workflow_type = %entity.workflow_type(),
                state = %entity.state(),
                "Entity holds a state its workflow does not declare"
            );
        }

        let empty = Variables::new();
        let triggers = model
            .transitions_from(entity.state())
            .filter(|t| check_guard(t, t.trigger(), entity, &empty).is_ok())
            .map(|t| t.trigger().to_string())
            .collect();
        Ok(triggers)
    }

    /// Trigger info for a read: what may fire next.
    pub fn trigger_info(&self, entity: &dyn EntityWorkflow) -> Result<TriggerInfo, WorkflowError> {
        Ok(TriggerInfo::for_success(self.available_triggers(entity)?))
    }

    /// Trigger info after a fire: fresh availability on success, errors otherwise.
    pub fn outcome_info<E: EntityWorkflow>(
        &self,
        outcome: &TriggerOutcome<E>,
    ) -> Result<TriggerInfo, WorkflowError> {
        if outcome.success {
            self.trigger_info(&outcome.entity)
        } else {
            Ok(TriggerInfo::for_errors(outcome.errors.iter().cloned()))
        }
    }

    pub fn to_result<V>(
        &self,
        entity: &dyn EntityWorkflow,
        view_model: V,
    ) -> Result<WorkflowResult<V>, WorkflowError> {
        Ok(WorkflowResult::new(self.trigger_info(entity)?, view_model))
    }

    pub fn to_trigger_result<E, V>(
        &self,
        outcome: &TriggerOutcome<E>,
        view_model: V,
    ) -> Result<WorkflowResult<V>, WorkflowError>
    where
        E: EntityWorkflow,
    {
        Ok(WorkflowResult::new(self.outcome_info(outcome)?, view_model))
    }

    fn log_rejection(&self, entity: &dyn EntityWorkflow, trigger: &str, errors: &[String]) {
        if self.log_rejections {
            info!(
                workflow_type = %entity.workflow_type(),
                state = %entity.state(),
                trigger = %trigger,
                errors = ?errors,
                "Workflow trigger rejected"
            );
        } else {
            debug!(
                workflow_type = %entity.workflow_type(),
                state = %entity.state(),
                trigger = %trigger,
                errors = ?errors,
                "Workflow trigger rejected"
            );
        }
    }
}

fn check_guard(
    transition: &Transition,
    trigger: &str,
    entity: &dyn EntityWorkflow,
    variables: &Variables,
) -> Result<(), Vec<String>> {
    let Some(guard) = transition.guard() else {
        return Ok(());
    };
    let ctx = GuardContext {
        trigger,
        entity,
        variables,
    };
    guard.check(&ctx).map_err(|errors| {
        non_empty(errors, || {
            format!("Guard '{}' rejected trigger '{}'", guard.name(), trigger)
        })
    })
}

fn non_empty(errors: Vec<String>, fallback: impl FnOnce() -> String) -> Vec<String> {
    if errors.is_empty() {
        vec![fallback()]
    } else {
        errors
    }
}
