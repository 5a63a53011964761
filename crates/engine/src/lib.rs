//! PanelFlow Engine Library
//!
//! This crate provides the workflow execution engine for PanelFlow,
//! handling:
//!
//! - **Workflow Interpretation**: Walk a serverless-workflow style state
//!   machine from its start state to a terminal end
//! - **Action Execution**: Run an operation state's action list through a
//!   function invoker, filtering inputs and results
//! - **Data Filtering**: Project in-flight data with a small jq-like
//!   filter expression language
//! - **Event Production**: Publish workflow-produced events on a
//!   host-supplied event bus
//!
//! ## Architecture
//!
//! The engine is synchronous and single-threaded by design: a
//! [`engine::WorkflowRunner`] is constructed per run, consumes its
//! definition to completion inside `start()`, and is discarded. The
//! event bus and function invoker are injected at construction; the
//! engine itself performs no I/O.
//!
//! ## Modules
//!
//! - [`workflow`]: Definition types, parsing, and validation
//! - [`engine`]: The runner, action executor, and data merging
//! - [`filter`]: The data-filter expression language
//! - [`events`]: The event bus seam and in-process implementation
//! - [`error`]: Engine error taxonomy
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use panelflow_engine::engine::WorkflowRunner;
//! use panelflow_engine::events::InProcessEventBus;
//! use panelflow_engine::workflow::parse_workflow_json;
//!
//! let workflow = parse_workflow_json(
//!     r#"{
//!         "id": "greet",
//!         "name": "Greeting",
//!         "start": "hello",
//!         "states": [
//!             {"type": "inject", "name": "hello", "data": {"msg": "hi"}, "end": true}
//!         ]
//!     }"#,
//! )
//! .unwrap();
//!
//! let mut runner = WorkflowRunner::new(workflow, Arc::new(InProcessEventBus::new()));
//! runner.start().unwrap();
//! assert_eq!(
//!     runner.state_data("hello"),
//!     Some(&serde_json::json!({"msg": "hi"}))
//! );
//! ```

pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod workflow;

pub use error::{EngineError, EngineResult};
