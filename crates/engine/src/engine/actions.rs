//! Action execution for operation states.
//!
//! Actions run strictly one after another, each receiving the merged
//! output of all prior actions in the same state. Function invocation
//! goes through the [`FunctionInvoker`] seam; the shipped
//! [`StubInvoker`] produces a marker object instead of calling out.

use serde_json::{json, Value};
use tracing::debug;

use crate::engine::data::merge_values;
use crate::error::{EngineError, EngineResult};
use crate::filter::Filter;
use crate::workflow::types::{Action, ActionDataFilter, ActionMode, FunctionRef};

/// Capability interface the engine invokes functions through.
///
/// A real implementation would carry success/error/timeout semantics
/// for whatever backend the function references name; the engine itself
/// only ships [`StubInvoker`].
pub trait FunctionInvoker {
    /// Invoke the referenced function with the action's input data.
    fn invoke(&self, function_ref: &FunctionRef, input: &Value) -> EngineResult<Value>;
}

/// Placeholder invoker: returns a marker object naming the reference,
/// performing no I/O.
#[derive(Debug, Default)]
pub struct StubInvoker;

impl FunctionInvoker for StubInvoker {
    fn invoke(&self, function_ref: &FunctionRef, _input: &Value) -> EngineResult<Value> {
        Ok(json!({"function": format!("{}.start", function_ref.ref_name())}))
    }
}

/// Executes an operation state's action list.
pub struct ActionExecutor<'a> {
    invoker: &'a dyn FunctionInvoker,
}

impl<'a> ActionExecutor<'a> {
    /// Create an executor over the given invoker.
    pub fn new(invoker: &'a dyn FunctionInvoker) -> Self {
        Self { invoker }
    }

    /// Execute the action list against `data`, returning the merged
    /// output. Only sequential mode is supported.
    pub fn run(&self, mode: ActionMode, actions: &[Action], data: Value) -> EngineResult<Value> {
        match mode {
            ActionMode::Sequential => self.run_sequential(actions, data),
            ActionMode::Parallel => Err(EngineError::UnsupportedMode(mode.to_string())),
        }
    }

    /// Fold the actions left to right, merging each result into the
    /// accumulator the next action receives.
    fn run_sequential(&self, actions: &[Action], data: Value) -> EngineResult<Value> {
        let mut data = data;
        for action in actions {
            let result = self.run_action(action, data.clone())?;
            data = merge_values(&data, &result);
        }
        Ok(data)
    }

    /// Execute one action: input filter, invocation, result filter.
    fn run_action(&self, action: &Action, data: Value) -> EngineResult<Value> {
        debug!(
            function = action.function_ref.as_ref().map(|f| f.ref_name()),
            "Executing action"
        );

        let mut data = data;

        if let Some(expr) = action
            .action_data_filter
            .as_ref()
            .and_then(|f| f.from_state_data.as_deref())
        {
            data = Filter::compile(expr)?.run(&data);
        }

        if let Some(function_ref) = &action.function_ref {
            data = self.invoker.invoke(function_ref, &data)?;
        }

        if let Some(filter) = &action.action_data_filter {
            data = apply_action_data_filter(filter, data)?;
        }

        Ok(data)
    }
}

/// Apply an action's result filter.
///
/// `useResults == false` short-circuits: the invocation result passes
/// through untouched regardless of a declared `results` filter.
fn apply_action_data_filter(filter: &ActionDataFilter, data: Value) -> EngineResult<Value> {
    if filter.use_results == Some(false) {
        return Ok(data);
    }

    let mut data = data;

    if let Some(expr) = filter.results.as_deref() {
        data = Filter::compile(expr)?.run(&data);
    }

    if let Some(key) = &filter.to_state_data {
        data = json!({ key.clone(): data });
    }

    Ok(data)
}
