// Holiday approval workflow: a requestor applies, the superior approves or rejects

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::actor::ActorContext;
use crate::store::{EntityStore, StoredEntity};
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::workflows::{
    Action, ConfigurationError, EntityWorkflow, Guard, Transition, TriggerRequest, WorkflowEngine,
    WorkflowModel, WorkflowResult,
};

pub const TYPE: &str = "Holiday";

pub const NEW_STATE: &str = "New";
pub const APPLIED_STATE: &str = "Applied";
pub const APPROVED_STATE: &str = "Approved";
pub const REJECTED_STATE: &str = "Rejected";

pub const APPLY_TRIGGER: &str = "apply";
pub const APPROVE_TRIGGER: &str = "approve";
pub const REJECT_TRIGGER: &str = "reject";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: Option<i64>,
    pub state: String,
    pub assignee: String,
    pub requestor: String,
    pub superior: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Holiday {
    /// A fresh holiday request owned by `requestor`.
    pub fn create(requestor: impl Into<String>) -> Self {
        let requestor = requestor.into();
        Self {
            id: None,
            state: NEW_STATE.to_string(),
            assignee: requestor.clone(),
            requestor,
            superior: None,
            from: None,
            to: None,
        }
    }
}

impl EntityWorkflow for Holiday {
    fn workflow_type(&self) -> &str {
        TYPE
    }

    fn state(&self) -> &str {
        &self.state
    }

    fn set_state(&mut self, state: &str) {
        self.state = state.to_string();
    }

    fn assignee(&self) -> &str {
        &self.assignee
    }
}

impl StoredEntity for Holiday {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

/// What callers send and receive for a holiday.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayViewModel {
    pub id: Option<i64>,
    pub requestor: String,
    pub superior: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl HolidayViewModel {
    /// Variable key the view model travels under in a trigger request.
    pub const KEY: &'static str = "HolidayViewModel";

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.superior.as_deref().map_or(true, |s| s.trim().is_empty()) {
            errors.push("Superior is required".to_string());
        }
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => {
                errors.push("From must not be after To".to_string());
            }
            (Some(_), Some(_)) => {}
            _ => errors.push("From and To are required".to_string()),
        }
        errors
    }
}

impl From<&Holiday> for HolidayViewModel {
    fn from(holiday: &Holiday) -> Self {
        Self {
            id: holiday.id,
            requestor: holiday.requestor.clone(),
            superior: holiday.superior.clone(),
            from: holiday.from,
            to: holiday.to,
        }
    }
}

fn variable_errors(err: crate::workflows::WorkflowError) -> Vec<String> {
    vec![err.to_string()]
}

pub fn holiday_model() -> Result<WorkflowModel, ConfigurationError> {
    WorkflowModel::builder(TYPE)
        .title("Holiday")
        .description("Apply for holidays and get them approved by a superior")
        .route("holiday")
        .states([NEW_STATE, APPLIED_STATE, APPROVED_STATE, REJECTED_STATE])
        .transition(
            Transition::new(NEW_STATE, APPLY_TRIGGER, APPLIED_STATE)
                .with_guard(Guard::new("valid_application", |ctx| {
                    // Without a view model there is nothing to validate yet.
                    let Some(model) = ctx
                        .variable::<HolidayViewModel>(HolidayViewModel::KEY)
                        .map_err(variable_errors)?
                    else {
                        return Ok(());
                    };
                    let errors = model.validate();
                    if errors.is_empty() {
                        Ok(())
                    } else {
                        Err(errors)
                    }
                }))
                .with_action(Action::new("assign_superior", |ctx| {
                    let model = ctx
                        .variable::<HolidayViewModel>(HolidayViewModel::KEY)
                        .map_err(variable_errors)?;
                    let holiday = ctx
                        .entity_mut::<Holiday>()
                        .ok_or_else(|| vec!["Entity is not a holiday".to_string()])?;
                    if let Some(model) = model {
                        holiday.superior = model.superior;
                        holiday.from = model.from;
                        holiday.to = model.to;
                    }
                    let superior = holiday
                        .superior
                        .clone()
                        .ok_or_else(|| vec!["Superior is required".to_string()])?;
                    holiday.assignee = superior;
                    Ok(())
                })),
        )
        .transition(
            Transition::new(APPLIED_STATE, APPROVE_TRIGGER, APPROVED_STATE)
                .with_action(Action::new("return_to_requestor", return_to_requestor)),
        )
        .transition(
            Transition::new(APPLIED_STATE, REJECT_TRIGGER, REJECTED_STATE)
                .with_action(Action::new("return_to_requestor", return_to_requestor)),
        )
        .build()
}

fn return_to_requestor(
    ctx: &mut crate::workflows::ActionContext<'_>,
) -> crate::workflows::ActionResult {
    let holiday = ctx
        .entity_mut::<Holiday>()
        .ok_or_else(|| vec!["Entity is not a holiday".to_string()])?;
    holiday.assignee = holiday.requestor.clone();
    Ok(())
}

/// Application service for holiday requests.
pub struct HolidayService<S, A> {
    store: S,
    engine: WorkflowEngine,
    actor: A,
}

impl<S, A> HolidayService<S, A>
where
    S: EntityStore<Holiday>,
    A: ActorContext,
{
    pub fn new(store: S, engine: WorkflowEngine, actor: A) -> Self {
        Self { store, engine, actor }
    }

    pub async fn get(&self, id: i64) -> Result<WorkflowResult<HolidayViewModel>> {
        let holiday = self.load(id).await?;
        Ok(self.engine.to_result(&holiday, HolidayViewModel::from(&holiday))?)
    }

    /// Start a new holiday request for the current actor.
    pub async fn create(&self) -> Result<WorkflowResult<HolidayViewModel>> {
        let holiday = Holiday::create(self.actor.current_actor_name());
        let holiday = self.store.add(holiday).await?;
        Ok(self.engine.to_result(&holiday, HolidayViewModel::from(&holiday))?)
    }

    pub async fn apply(
        &self,
        model: &HolidayViewModel,
    ) -> Result<WorkflowResult<HolidayViewModel>> {
        self.trigger(APPLY_TRIGGER, model).await
    }

    pub async fn approve(
        &self,
        model: &HolidayViewModel,
    ) -> Result<WorkflowResult<HolidayViewModel>> {
        self.trigger(APPROVE_TRIGGER, model).await
    }

    pub async fn reject(
        &self,
        model: &HolidayViewModel,
    ) -> Result<WorkflowResult<HolidayViewModel>> {
        self.trigger(REJECT_TRIGGER, model).await
    }

    /// Holidays waiting on the current actor, newest first.
    pub async fn my_work(&self) -> Result<Vec<Holiday>> {
        let me = self.actor.current_actor_name();
        let mut holidays: Vec<Holiday> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|h| h.assignee == me)
            .collect();
        holidays.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(holidays)
    }

    async fn load(&self, id: i64) -> Result<Holiday> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("Holiday {} not found", id))
    }

    async fn trigger(
        &self,
        trigger: &str,
        model: &HolidayViewModel,
    ) -> Result<WorkflowResult<HolidayViewModel>> {
        let id = model
            .id
            .ok_or_else(|| anyhow!("Holiday id is required to {}", trigger))?;
        let correlation_id = generate_correlation_id();
        let span =
            create_workflow_span("holiday_trigger", TYPE, Some(trigger), Some(&correlation_id));

        async {
            let holiday = self.load(id).await?;
            let request =
                TriggerRequest::new(trigger, holiday).with_variable(HolidayViewModel::KEY, model)?;
            let outcome = self.engine.fire(request)?;
            if outcome.success {
                self.store.save(&outcome.entity).await?;
            }
            let view_model = HolidayViewModel::from(&outcome.entity);
            Ok::<_, anyhow::Error>(self.engine.to_trigger_result(&outcome, view_model)?)
        }
        .instrument(span)
        .await
    }
}
