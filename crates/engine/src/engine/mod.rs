//! Workflow execution engine.
//!
//! This module provides the core execution engine for PanelFlow:
//!
//! - **Runner**: Drives the state machine from start to termination
//! - **Actions**: Executes an operation state's action list
//! - **Data**: Immutable merging of in-flight data values

pub mod actions;
pub mod data;
pub mod runner;

pub use actions::{ActionExecutor, FunctionInvoker, StubInvoker};
pub use data::merge_values;
pub use runner::WorkflowRunner;
