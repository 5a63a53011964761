//! Workflow definition model.
//!
//! This module provides the serverless-workflow style definition types
//! consumed by the engine:
//!
//! - **Types**: Serde model for workflows, states, actions, and events
//! - **Parser**: JSON/YAML loading and up-front validation

pub mod parser;
pub mod types;

pub use parser::{parse_workflow_json, parse_workflow_yaml, validate_workflow};
pub use types::{
    Action, ActionDataFilter, ActionMode, End, EventDef, EventKind, FunctionDef, FunctionRef,
    InjectState, OperationState, ProduceEventDef, StartRef, State, StateDataFilter, Transition,
    Workflow,
};
