//! Engine property tests
//!
//! Random models and trigger sequences, checked against a plain edge list:
//! - defined transitions land on exactly their declared target
//! - illegal pairs and failed guards or actions leave the entity untouched,
//!   however often they are repeated
//! - states with no outgoing transitions offer nothing
//! - the result envelope agrees with a fresh availability query

use microflow::samples::{default_registry, holiday_model, stepper_model};
use microflow::workflows::{
    Action, ActionContext, ActionResult, Guard, Transition, TriggerInfo, TriggerRequest,
    WorkflowEngine, WorkflowModel, WorkflowRegistry, TRIGGER_NOT_ALLOWED,
};
use microflow::EntityWorkflow;
use proptest::prelude::*;
use proptest::test_runner::TestRunner;
use proptest_derive::Arbitrary;
use std::collections::HashSet;
use std::sync::Arc;

const TYPE: &str = "Generated";
const TRIGGER_COUNT: usize = 6;
const REPEATS: usize = 3;
const BLOCKED: &str = "Blocked by guard";
const STALLED: &str = "Stalled in action";

/// One transition as drawn; `from` and `to` are folded into the state count.
#[derive(Debug, Clone, Arbitrary)]
struct EdgeSpec {
    #[proptest(strategy = "0usize..8")]
    from: usize,
    #[proptest(strategy = "0usize..6")]
    trigger: usize,
    #[proptest(strategy = "0usize..8")]
    to: usize,
    guard: Option<bool>,
    action: Option<bool>,
}

#[derive(Debug, Clone, Arbitrary)]
struct GeneratedModel {
    #[proptest(strategy = "1usize..=8")]
    state_count: usize,
    #[proptest(strategy = "prop::collection::vec(any::<EdgeSpec>(), 0..24)")]
    edges: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, PartialEq)]
struct Edge {
    from: usize,
    trigger: usize,
    to: usize,
    guard: Option<bool>,
    action: Option<bool>,
}

impl Edge {
    fn transition(&self) -> Transition {
        let mut transition = Transition::new(
            state_name(self.from),
            trigger_name(self.trigger),
            state_name(self.to),
        );
        match self.guard {
            Some(true) => transition = transition.with_guard(Guard::new("open", |_| Ok(()))),
            Some(false) => {
                transition = transition
                    .with_guard(Guard::new("blocked", |_| Err(vec![BLOCKED.to_string()])));
            }
            None => {}
        }
        match self.action {
            Some(true) => transition = transition.with_action(Action::new("visit", visit)),
            Some(false) => transition = transition.with_action(Action::new("stall", stall)),
            None => {}
        }
        transition
    }

    /// Guards see no variables during availability checks, actions never run.
    fn offered(&self) -> bool {
        self.guard != Some(false)
    }

    fn expected_errors(&self) -> Option<Vec<String>> {
        if self.guard == Some(false) {
            Some(vec![BLOCKED.to_string()])
        } else if self.action == Some(false) {
            Some(vec![STALLED.to_string()])
        } else {
            None
        }
    }
}

impl GeneratedModel {
    /// Edges folded into range, keeping the first edge per (from, trigger).
    fn edges(&self) -> Vec<Edge> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .map(|e| Edge {
                from: e.from % self.state_count,
                trigger: e.trigger,
                to: e.to % self.state_count,
                guard: e.guard,
                action: e.action,
            })
            .filter(|e| seen.insert((e.from, e.trigger)))
            .collect()
    }

    fn engine(&self) -> WorkflowEngine {
        let model = self
            .edges()
            .iter()
            .fold(
                WorkflowModel::builder(TYPE).states((0..self.state_count).map(state_name)),
                |builder, edge| builder.transition(edge.transition()),
            )
            .build()
            .unwrap();
        let registry = WorkflowRegistry::new().with_model(model).unwrap();
        WorkflowEngine::new(Arc::new(registry))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    state: String,
    visits: u32,
}

impl Node {
    fn at(state: usize) -> Self {
        Self {
            state: state_name(state),
            visits: 0,
        }
    }
}

impl EntityWorkflow for Node {
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
        "nobody"
    }
}

fn visit(ctx: &mut ActionContext<'_>) -> ActionResult {
    let node = ctx
        .entity_mut::<Node>()
        .ok_or_else(|| vec!["Entity is not a node".to_string()])?;
    node.visits += 1;
    Ok(())
}

// Mutates before failing so a missing rollback shows up as drift.
fn stall(ctx: &mut ActionContext<'_>) -> ActionResult {
    if let Some(node) = ctx.entity_mut::<Node>() {
        node.visits += 100;
        node.state = "Nowhere".to_string();
    }
    Err(vec![STALLED.to_string()])
}

fn state_name(idx: usize) -> String {
    format!("s{}", idx)
}

fn trigger_name(idx: usize) -> String {
    format!("t{}", idx)
}

fn expected_available(edges: &[Edge], state: usize) -> Vec<String> {
    edges
        .iter()
        .filter(|e| e.from == state && e.offered())
        .map(|e| trigger_name(e.trigger))
        .collect()
}

#[cfg(test)]
mod property_tests {
    use super::*;

    #[test]
    fn prop_defined_transitions_land_on_declared_target() {
        let mut runner = TestRunner::default();

        runner
            .run(&any::<GeneratedModel>(), |generated| {
                let engine = generated.engine();

                for edge in generated.edges() {
                    let before = Node::at(edge.from);
                    let request = TriggerRequest::new(trigger_name(edge.trigger), before.clone());

                    match edge.expected_errors() {
                        None => {
                            let outcome = engine.fire(request).unwrap();
                            prop_assert!(outcome.success, "{:?} did not fire", edge);
                            prop_assert!(outcome.errors.is_empty());
                            prop_assert_eq!(outcome.from_state.clone(), state_name(edge.from));
                            prop_assert_eq!(outcome.current_state(), state_name(edge.to));
                            let visits = u32::from(edge.action == Some(true));
                            prop_assert_eq!(outcome.entity.visits, visits);
                        }
                        Some(errors) => {
                            for _ in 0..REPEATS {
                                let outcome = engine.fire(request.clone()).unwrap();
                                prop_assert!(!outcome.success);
                                prop_assert_eq!(&outcome.errors, &errors);
                                prop_assert_eq!(&outcome.entity, &before);
                            }
                        }
                    }
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn prop_illegal_pairs_do_not_drift() {
        let mut runner = TestRunner::default();

        runner
            .run(&any::<GeneratedModel>(), |generated| {
                let engine = generated.engine();
                let defined: HashSet<(usize, usize)> =
                    generated.edges().iter().map(|e| (e.from, e.trigger)).collect();

                for state in 0..generated.state_count {
                    let before = Node::at(state);
                    let available = engine.available_triggers(&before).unwrap();

                    for trigger in (0..TRIGGER_COUNT).filter(|t| !defined.contains(&(state, *t))) {
                        let request = TriggerRequest::new(trigger_name(trigger), before.clone());
                        prop_assert!(!engine.can_trigger(&request).unwrap().is_allowed());

                        for _ in 0..REPEATS {
                            let outcome = engine.fire(request.clone()).unwrap();
                            prop_assert!(!outcome.success);
                            prop_assert_eq!(
                                outcome.errors.clone(),
                                vec![TRIGGER_NOT_ALLOWED.to_string()]
                            );
                            prop_assert_eq!(&outcome.entity, &before);
                        }
                    }
                    prop_assert_eq!(engine.available_triggers(&before).unwrap(), available);
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn prop_availability_follows_definition_order() {
        let mut runner = TestRunner::default();

        runner
            .run(&any::<GeneratedModel>(), |generated| {
                let engine = generated.engine();
                let model = engine.registry().resolve(TYPE).unwrap();
                let edges = generated.edges();

                for state in 0..generated.state_count {
                    let name = state_name(state);
                    let declared: Vec<String> = edges
                        .iter()
                        .filter(|e| e.from == state)
                        .map(|e| trigger_name(e.trigger))
                        .collect();
                    let outgoing: Vec<String> = model
                        .transitions_from(&name)
                        .map(|t| t.trigger().to_string())
                        .collect();
                    prop_assert_eq!(&outgoing, &declared);

                    let available = engine.available_triggers(&Node::at(state)).unwrap();
                    prop_assert_eq!(&available, &expected_available(&edges, state));

                    if declared.is_empty() {
                        prop_assert!(model.is_terminal(&name));
                        prop_assert!(available.is_empty());
                        let info = engine.trigger_info(&Node::at(state)).unwrap();
                        prop_assert_eq!(info, TriggerInfo::for_success(Vec::<String>::new()));
                    }
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn prop_envelope_matches_fresh_query() {
        let mut runner = TestRunner::default();

        runner
            .run(
                &(
                    any::<GeneratedModel>(),
                    prop::collection::vec(0usize..TRIGGER_COUNT, 0..32),
                ),
                |(generated, triggers)| {
                    let engine = generated.engine();
                    let edges = generated.edges();
                    let mut node = Node::at(0);
                    let mut expected_state = 0;
                    let mut expected_visits = 0;

                    for trigger in triggers {
                        let edge = edges
                            .iter()
                            .find(|e| e.from == expected_state && e.trigger == trigger);
                        let outcome = engine
                            .fire(TriggerRequest::new(trigger_name(trigger), node))
                            .unwrap();
                        let result = engine.to_trigger_result(&outcome, ()).unwrap();

                        match edge.map(|e| (e, e.expected_errors())) {
                            Some((edge, None)) => {
                                prop_assert!(outcome.success);
                                expected_state = edge.to;
                                expected_visits += u32::from(edge.action == Some(true));
                                let fresh = engine.available_triggers(&outcome.entity).unwrap();
                                prop_assert_eq!(
                                    &result.trigger_info,
                                    &TriggerInfo::for_success(fresh)
                                );
                                prop_assert_eq!(
                                    result.trigger_info.available_triggers().to_vec(),
                                    expected_available(&edges, expected_state)
                                );
                            }
                            Some((_, Some(errors))) => {
                                prop_assert!(result.has_errors());
                                prop_assert_eq!(result.trigger_info.errors(), errors.as_slice());
                            }
                            None => {
                                prop_assert!(result.has_errors());
                                prop_assert_eq!(
                                    result.trigger_info.errors().to_vec(),
                                    vec![TRIGGER_NOT_ALLOWED.to_string()]
                                );
                            }
                        }

                        node = outcome.into_entity();
                        prop_assert_eq!(node.state.clone(), state_name(expected_state));
                        prop_assert_eq!(node.visits, expected_visits);
                    }
                    Ok(())
                },
            )
            .unwrap();
    }

    #[test]
    fn test_sample_models_have_terminal_states() {
        for model in [holiday_model().unwrap(), stepper_model().unwrap()] {
            let terminal: Vec<&String> =
                model.states().iter().filter(|s| model.is_terminal(s)).collect();
            assert!(!terminal.is_empty(), "{} has no terminal state", model.workflow_type());
        }
    }

    #[test]
    fn test_default_registry_holds_both_samples() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.workflow_types(), vec!["Holiday", "Stepper"]);

        let described = registry.resolve("Holiday").unwrap().describe();
        assert_eq!(described.states, vec!["New", "Applied", "Approved", "Rejected"]);
        assert_eq!(described.transitions[0].guard.as_deref(), Some("valid_application"));
    }
}
