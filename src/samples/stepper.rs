// Stepper workflow: walk an entity through numbered steps

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::actor::ActorContext;
use crate::store::{EntityStore, StoredEntity};
use crate::workflows::{
    ConfigurationError, EntityWorkflow, Guard, Transition, TriggerRequest, WorkflowEngine,
    WorkflowModel, WorkflowResult,
};

pub const TYPE: &str = "Stepper";

pub const NEW_STATE: &str = "new";
pub const STEP1_STATE: &str = "step1";
pub const STEP2_STATE: &str = "step2";
pub const STEP3_STATE: &str = "step3";
pub const FINISHED_STATE: &str = "finished";

pub const GOTO1_TRIGGER: &str = "goto1";
pub const GOTO2_TRIGGER: &str = "goto2";
pub const GOTO3_TRIGGER: &str = "goto3";
pub const FINISH_TRIGGER: &str = "finish";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stepper {
    pub id: Option<i64>,
    pub state: String,
    pub assignee: String,
    pub name: String,
}

impl Stepper {
    pub fn create(creator: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            state: NEW_STATE.to_string(),
            assignee: creator.into(),
            name: name.into(),
        }
    }
}

impl EntityWorkflow for Stepper {
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

impl StoredEntity for Stepper {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepperViewModel {
    pub id: Option<i64>,
    pub name: String,
    pub state: String,
    pub assignee: String,
}

impl From<&Stepper> for StepperViewModel {
    fn from(stepper: &Stepper) -> Self {
        Self {
            id: stepper.id,
            name: stepper.name.clone(),
            state: stepper.state.clone(),
            assignee: stepper.assignee.clone(),
        }
    }
}

pub fn stepper_model() -> Result<WorkflowModel, ConfigurationError> {
    WorkflowModel::builder(TYPE)
        .title("Stepper")
        .description("Step through a fixed sequence and finish")
        .route("stepper")
        .states([NEW_STATE, STEP1_STATE, STEP2_STATE, STEP3_STATE, FINISHED_STATE])
        .transition(Transition::new(NEW_STATE, GOTO1_TRIGGER, STEP1_STATE))
        .transition(Transition::new(STEP1_STATE, GOTO2_TRIGGER, STEP2_STATE))
        .transition(Transition::new(STEP2_STATE, GOTO1_TRIGGER, STEP1_STATE))
        .transition(Transition::new(STEP2_STATE, GOTO3_TRIGGER, STEP3_STATE))
        .transition(Transition::new(STEP3_STATE, GOTO2_TRIGGER, STEP2_STATE))
        .transition(
            Transition::new(STEP3_STATE, FINISH_TRIGGER, FINISHED_STATE).with_guard(Guard::new(
                "named",
                |ctx| match ctx.entity::<Stepper>() {
                    Some(stepper) if !stepper.name.trim().is_empty() => Ok(()),
                    _ => Err(vec!["Name is required to finish".to_string()]),
                },
            )),
        )
        .build()
}

pub struct StepperService<S, A> {
    store: S,
    engine: WorkflowEngine,
    actor: A,
}

impl<S, A> StepperService<S, A>
where
    S: EntityStore<Stepper>,
    A: ActorContext,
{
    pub fn new(store: S, engine: WorkflowEngine, actor: A) -> Self {
        Self { store, engine, actor }
    }

    pub async fn get(&self, id: i64) -> Result<WorkflowResult<StepperViewModel>> {
        let stepper = self.load(id).await?;
        Ok(self.engine.to_result(&stepper, StepperViewModel::from(&stepper))?)
    }

    pub async fn create(&self, name: &str) -> Result<WorkflowResult<StepperViewModel>> {
        let stepper = Stepper::create(self.actor.current_actor_name(), name);
        let stepper = self.store.add(stepper).await?;
        Ok(self.engine.to_result(&stepper, StepperViewModel::from(&stepper))?)
    }

    pub async fn trigger(
        &self,
        id: i64,
        trigger: &str,
    ) -> Result<WorkflowResult<StepperViewModel>> {
        let stepper = self.load(id).await?;
        let outcome = self.engine.fire(TriggerRequest::new(trigger, stepper))?;
        if outcome.success {
            self.store.save(&outcome.entity).await?;
        }
        Ok(self
            .engine
            .to_trigger_result(&outcome, StepperViewModel::from(&outcome.entity))?)
    }

    async fn load(&self, id: i64) -> Result<Stepper> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("Stepper {} not found", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::StaticActor;
    use crate::store::InMemoryStore;
    use crate::workflows::WorkflowRegistry;
    use std::sync::Arc;

    fn service() -> StepperService<InMemoryStore<Stepper>, StaticActor> {
        let registry = WorkflowRegistry::new().with_model(stepper_model().unwrap()).unwrap();
        StepperService::new(
            InMemoryStore::new(),
            WorkflowEngine::new(Arc::new(registry)),
            StaticActor::new("sam"),
        )
    }

    #[tokio::test]
    async fn test_walk_to_finish() {
        let service = service();
        let created = service.create("onboarding").await.unwrap();
        let id = created.view_model.id.unwrap();
        assert_eq!(created.trigger_info.available_triggers(), ["goto1"]);

        for trigger in [GOTO1_TRIGGER, GOTO2_TRIGGER, GOTO3_TRIGGER] {
            let result = service.trigger(id, trigger).await.unwrap();
            assert!(!result.has_errors(), "{trigger} failed: {:?}", result.trigger_info);
        }
        let at_step3 = service.get(id).await.unwrap();
        assert_eq!(at_step3.view_model.state, STEP3_STATE);
        assert_eq!(at_step3.trigger_info.available_triggers(), ["goto2", "finish"]);

        let done = service.trigger(id, FINISH_TRIGGER).await.unwrap();
        assert_eq!(done.view_model.state, FINISHED_STATE);
        assert!(done.trigger_info.available_triggers().is_empty());
    }

    #[tokio::test]
    async fn test_unnamed_stepper_cannot_finish() {
        let service = service();
        let id = service.create("  ").await.unwrap().view_model.id.unwrap();
        for trigger in [GOTO1_TRIGGER, GOTO2_TRIGGER, GOTO3_TRIGGER] {
            service.trigger(id, trigger).await.unwrap();
        }

        // finish is hidden because its guard looks at the entity itself.
        let at_step3 = service.get(id).await.unwrap();
        assert_eq!(at_step3.trigger_info.available_triggers(), ["goto2"]);

        let result = service.trigger(id, FINISH_TRIGGER).await.unwrap();
        assert_eq!(result.trigger_info.errors(), ["Name is required to finish"]);
        assert_eq!(service.get(id).await.unwrap().view_model.state, STEP3_STATE);
    }

    #[tokio::test]
    async fn test_missing_stepper_is_an_error() {
        let service = service();
        let err = service.trigger(99, GOTO1_TRIGGER).await.unwrap_err();
        assert!(err.to_string().contains("Stepper 99 not found"));
    }
}
