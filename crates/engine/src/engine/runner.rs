//! Workflow runner.
//!
//! Drives a workflow definition from its start state to termination
//! inside a single synchronous `start()` call. One runner is
//! constructed per run and discarded afterwards; its per-state data
//! store is exclusively owned and never shared across runs.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::engine::actions::{ActionExecutor, FunctionInvoker, StubInvoker};
use crate::error::{EngineError, EngineResult};
use crate::events::{EventBus, EventHandler, WorkflowEvent};
use crate::filter::Filter;
use crate::workflow::types::{EventDef, EventKind, ProduceEventDef, State, Workflow};

/// Interprets one workflow definition to completion.
pub struct WorkflowRunner {
    workflow: Workflow,
    bus: Arc<dyn EventBus>,
    invoker: Box<dyn FunctionInvoker>,
    /// Last-computed data per state name. Never cleared during a run.
    data: HashMap<String, Value>,
    current_state: String,
    terminate: bool,
}

impl WorkflowRunner {
    /// Create a runner over a definition and a host-supplied event bus.
    pub fn new(workflow: Workflow, bus: Arc<dyn EventBus>) -> Self {
        Self {
            workflow,
            bus,
            invoker: Box::new(StubInvoker),
            data: HashMap::new(),
            current_state: String::new(),
            terminate: false,
        }
    }

    /// Replace the stub function invoker.
    pub fn with_invoker(mut self, invoker: Box<dyn FunctionInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    /// Run the workflow to termination.
    ///
    /// Synchronous and non-preemptible: the whole state-machine walk
    /// happens inside this call. Every error is fatal and unwinds
    /// immediately; the runner is left in its partial condition and
    /// should be discarded.
    pub fn start(&mut self) -> EngineResult<()> {
        info!(workflow = %self.workflow.name, id = %self.workflow.id, "Starting workflow");

        let start = self
            .workflow
            .start_state_name()
            .ok_or_else(|| EngineError::Configuration("workflow without start".to_string()))?
            .to_string();

        if let Some(events) = self.workflow.events.clone() {
            for event in &events {
                register_event(self.bus.as_ref(), event)?;
            }
        }

        if !self.workflow.has_end_state() {
            return Err(EngineError::Configuration("states without end".to_string()));
        }

        self.current_state = start;
        while !self.terminate {
            let state = self
                .workflow
                .get_state(&self.current_state)
                .cloned()
                .ok_or_else(|| EngineError::StateNotFound(self.current_state.clone()))?;

            let executing = self.current_state.clone();
            self.execute_state(&state)?;

            // A non-terminal state that leaves the pointer unchanged
            // would loop forever; treat it as a misconfiguration.
            if !self.terminate && self.current_state == executing {
                return Err(EngineError::StalledTransition(executing));
            }
        }

        info!(workflow = %self.workflow.name, "Workflow terminated");
        Ok(())
    }

    /// Data last stored for a state, if the state has executed.
    pub fn state_data(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Consume the runner, yielding the per-state data store.
    pub fn into_data(self) -> HashMap<String, Value> {
        self.data
    }

    /// Execute one state: filter input, dispatch by type, filter
    /// output, persist, then resolve transition or end.
    fn execute_state(&mut self, state: &State) -> EngineResult<()> {
        debug!(state = %state.name(), state_type = state.type_name(), "Executing state");

        if state.transition().is_some() && state.end().is_some() {
            return Err(EngineError::Configuration(format!(
                "State '{}' can't define both transition and end",
                state.name()
            )));
        }

        let mut data = self
            .data
            .get(state.name())
            .cloned()
            .unwrap_or(Value::Null);

        if let Some(expr) = state.data_filter().and_then(|f| f.input.as_deref()) {
            data = Filter::compile(expr)?.run(&data);
        }

        data = match state {
            State::Operation(op) => match &op.actions {
                Some(actions) => {
                    ActionExecutor::new(self.invoker.as_ref()).run(op.action_mode, actions, data)?
                }
                None => data,
            },
            State::Inject(inject) => inject.data.clone(),
            other => {
                return Err(EngineError::UnsupportedStateType(
                    other.type_name().to_string(),
                ))
            }
        };

        if let Some(expr) = state.data_filter().and_then(|f| f.output.as_deref()) {
            data = Filter::compile(expr)?.run(&data);
        }

        self.data.insert(state.name().to_string(), data);

        if let Some(transition) = state.transition() {
            debug!(
                state = %state.name(),
                next = transition.next_state(),
                "Transitioning"
            );
            self.current_state = transition.next_state().to_string();
            if let Some(events) = transition.produce_events() {
                self.produce_events(events);
            }
        } else if let Some(end) = state.end() {
            if let Some(events) = end.produce_events() {
                self.produce_events(events);
            }
            self.terminate = end.terminate();
        }

        Ok(())
    }

    /// Publish each produced event on the bus.
    fn produce_events(&self, events: &[ProduceEventDef]) {
        for event in events {
            self.bus
                .publish(WorkflowEvent::new(event.event_ref.clone(), event.data.clone()));
        }
    }
}

/// Register a bus subscription for a declared event. Only consumed
/// events may be declared; anything else is a configuration error.
fn register_event(bus: &dyn EventBus, event: &EventDef) -> EngineResult<()> {
    match event.kind {
        EventKind::Consumed => {
            let name = event.name.clone();
            let handler: EventHandler = Arc::new(move |e: &WorkflowEvent| {
                debug!(event = %name, publish = %e.publish, "Consumed event observed");
            });
            bus.subscribe(handler);
            Ok(())
        }
        kind => Err(EngineError::Configuration(format!(
            "Event '{}' has invalid kind: '{}'",
            event.name, kind
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::InProcessEventBus;
    use crate::workflow::types::FunctionRef;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Bus that records every published event.
    #[derive(Default)]
    struct RecordingBus {
        published: Mutex<Vec<WorkflowEvent>>,
    }

    impl RecordingBus {
        fn published(&self) -> Vec<WorkflowEvent> {
            self.published.lock().unwrap().clone()
        }
    }

    impl EventBus for RecordingBus {
        fn subscribe(&self, _handler: EventHandler) {}

        fn publish(&self, event: WorkflowEvent) {
            self.published.lock().unwrap().push(event);
        }
    }

    /// Invoker that counts calls and returns a fixed result.
    struct CountingInvoker {
        calls: Arc<AtomicUsize>,
        result: Value,
    }

    impl CountingInvoker {
        fn new(result: Value) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: Arc::clone(&calls),
                    result,
                },
                calls,
            )
        }
    }

    impl FunctionInvoker for CountingInvoker {
        fn invoke(&self, _f: &FunctionRef, _input: &Value) -> EngineResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    fn workflow(value: Value) -> Workflow {
        serde_json::from_value(value).unwrap()
    }

    fn bus() -> Arc<InProcessEventBus> {
        Arc::new(InProcessEventBus::new())
    }

    #[test]
    fn test_single_inject_state_terminates_with_payload() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "only",
            "states": [
                {"type": "inject", "name": "only", "data": {"message": "hi"}, "end": true}
            ]
        }));

        let mut runner = WorkflowRunner::new(wf, bus());
        runner.start().unwrap();
        assert_eq!(runner.state_data("only"), Some(&json!({"message": "hi"})));
    }

    #[test]
    fn test_missing_start_is_a_configuration_error() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf",
            "states": [
                {"type": "inject", "name": "only", "data": {}, "end": true}
            ]
        }));

        let err = WorkflowRunner::new(wf, bus()).start().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert!(err.to_string().contains("without start"));
    }

    #[test]
    fn test_no_end_state_fails_before_any_execution() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "a",
            "states": [
                {"type": "operation", "name": "a",
                 "actions": [{"functionRef": "f"}], "transition": "b"},
                {"type": "operation", "name": "b",
                 "actions": [{"functionRef": "f"}], "transition": "a"}
            ]
        }));

        let (invoker, calls) = CountingInvoker::new(json!({}));
        let mut runner = WorkflowRunner::new(wf, bus()).with_invoker(Box::new(invoker));
        let err = runner.start().unwrap_err();

        assert!(err.to_string().contains("states without end"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(runner.state_data("a").is_none());
    }

    #[test]
    fn test_unknown_current_state_is_state_not_found() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "ghost",
            "states": [
                {"type": "inject", "name": "real", "data": {}, "end": true}
            ]
        }));

        let err = WorkflowRunner::new(wf, bus()).start().unwrap_err();
        assert!(matches!(err, EngineError::StateNotFound(name) if name == "ghost"));
    }

    #[test]
    fn test_state_data_is_keyed_per_state_without_leakage() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "a",
            "states": [
                {"type": "operation", "name": "a",
                 "actions": [{"functionRef": "fa"}], "transition": "b"},
                {"type": "operation", "name": "b",
                 "actions": [{"functionRef": "fb"}], "end": true}
            ]
        }));

        let (invoker, _) = CountingInvoker::new(json!({"y": 2}));
        let mut runner = WorkflowRunner::new(wf, bus()).with_invoker(Box::new(invoker));
        runner.start().unwrap();

        // Each state starts from its own (initially absent) data; A's
        // output must not appear under B.
        assert_eq!(runner.state_data("a"), Some(&json!({"y": 2})));
        assert_eq!(runner.state_data("b"), Some(&json!({"y": 2})));
    }

    #[test]
    fn test_both_transition_and_end_fails_before_actions_run() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "bad",
            "states": [
                {"type": "operation", "name": "bad",
                 "actions": [{"functionRef": "f"}],
                 "transition": "other", "end": true},
                {"type": "inject", "name": "other", "data": {}, "end": true}
            ]
        }));

        let (invoker, calls) = CountingInvoker::new(json!({}));
        let mut runner = WorkflowRunner::new(wf, bus()).with_invoker(Box::new(invoker));
        let err = runner.start().unwrap_err();

        assert!(err.to_string().contains("both transition and end"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stalled_state_is_detected() {
        // end: false leaves the pointer unchanged without terminating.
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "stuck",
            "states": [
                {"type": "inject", "name": "stuck", "data": {}, "end": false}
            ]
        }));

        let err = WorkflowRunner::new(wf, bus()).start().unwrap_err();
        assert!(matches!(err, EngineError::StalledTransition(name) if name == "stuck"));
    }

    #[test]
    fn test_self_transition_is_detected_as_stalled() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "loop",
            "states": [
                {"type": "inject", "name": "loop", "data": {}, "transition": "loop"},
                {"type": "inject", "name": "done", "data": {}, "end": true}
            ]
        }));

        let err = WorkflowRunner::new(wf, bus()).start().unwrap_err();
        assert!(matches!(err, EngineError::StalledTransition(_)));
    }

    #[test]
    fn test_unsupported_state_type_is_fatal() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "pause",
            "states": [
                {"type": "sleep", "name": "pause", "duration": "PT1S", "end": true}
            ]
        }));

        let err = WorkflowRunner::new(wf, bus()).start().unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedStateType(t) if t == "sleep"));
    }

    #[test]
    fn test_parallel_action_mode_is_fatal() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "a",
            "states": [
                {"type": "operation", "name": "a", "actionMode": "parallel",
                 "actions": [{"functionRef": "f"}], "end": true}
            ]
        }));

        let err = WorkflowRunner::new(wf, bus()).start().unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedMode(_)));
    }

    #[test]
    fn test_produced_event_kind_is_a_configuration_error() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "only",
            "events": [{"name": "out", "kind": "produced"}],
            "states": [
                {"type": "inject", "name": "only", "data": {}, "end": true}
            ]
        }));

        let err = WorkflowRunner::new(wf, bus()).start().unwrap_err();
        assert!(err.to_string().contains("invalid kind"));
    }

    #[test]
    fn test_consumed_events_are_registered_and_run_proceeds() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "only",
            "events": [{"name": "refresh", "kind": "consumed"}],
            "states": [
                {"type": "inject", "name": "only", "data": {"ok": true}, "end": true}
            ]
        }));

        let mut runner = WorkflowRunner::new(wf, bus());
        runner.start().unwrap();
        assert_eq!(runner.state_data("only"), Some(&json!({"ok": true})));
    }

    #[test]
    fn test_transition_publishes_one_event_per_declaration() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "a",
            "states": [
                {"type": "inject", "name": "a", "data": {},
                 "transition": {
                     "nextState": "b",
                     "produceEvents": [
                         {"eventRef": "first", "data": {"n": 1}},
                         {"eventRef": "second"}
                     ]
                 }},
                {"type": "inject", "name": "b", "data": {}, "end": true}
            ]
        }));

        let recording = Arc::new(RecordingBus::default());
        let mut runner = WorkflowRunner::new(wf, Arc::clone(&recording) as Arc<dyn EventBus>);
        runner.start().unwrap();

        let published = recording.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0], WorkflowEvent::new("first", Some(json!({"n": 1}))));
        assert_eq!(published[1], WorkflowEvent::new("second", None));
    }

    #[test]
    fn test_end_descriptor_publishes_events_before_halting() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "only",
            "states": [
                {"type": "inject", "name": "only", "data": {},
                 "end": {"terminate": true, "produceEvents": [{"eventRef": "done"}]}}
            ]
        }));

        let recording = Arc::new(RecordingBus::default());
        let mut runner = WorkflowRunner::new(wf, Arc::clone(&recording) as Arc<dyn EventBus>);
        runner.start().unwrap();

        assert_eq!(recording.published(), vec![WorkflowEvent::new("done", None)]);
    }

    #[test]
    fn test_state_data_filters_apply_around_execution() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "a",
            "states": [
                {"type": "inject", "name": "a",
                 "data": {"keep": 1, "drop": 2},
                 "stateDataFilter": {"output": ".keep"},
                 "end": true}
            ]
        }));

        let mut runner = WorkflowRunner::new(wf, bus());
        runner.start().unwrap();
        assert_eq!(runner.state_data("a"), Some(&json!({"keep": 1})));
    }

    #[test]
    fn test_operation_merges_action_results_into_state_data() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "a",
            "states": [
                {"type": "operation", "name": "a",
                 "actions": [
                     {"functionRef": "load",
                      "actionDataFilter": {"toStateData": "marker"}}
                 ],
                 "end": true}
            ]
        }));

        let mut runner = WorkflowRunner::new(wf, bus());
        runner.start().unwrap();
        assert_eq!(
            runner.state_data("a"),
            Some(&json!({"marker": {"function": "load.start"}}))
        );
    }

    #[test]
    fn test_operation_without_actions_keeps_data_unchanged() {
        let wf = workflow(json!({
            "id": "wf", "name": "wf", "start": "a",
            "states": [
                {"type": "operation", "name": "a", "end": true}
            ]
        }));

        let mut runner = WorkflowRunner::new(wf, bus());
        runner.start().unwrap();
        assert_eq!(runner.state_data("a"), Some(&Value::Null));
    }
}
