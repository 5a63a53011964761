//! Error types for the PanelFlow engine.
//!
//! Every error here is fatal to the run that raised it: the engine never
//! retries internally, and a failed [`crate::engine::WorkflowRunner`] is
//! expected to be discarded by the host, not resumed.

use thiserror::Error;

/// Engine-level errors raised while interpreting a workflow.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid workflow configuration (missing start, no end-bearing
    /// state, a state defining both transition and end, invalid event
    /// kind, transition to an undeclared state).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The current state name does not match any declared state.
    #[error("State not found: '{0}'")]
    StateNotFound(String),

    /// A non-terminal state left the current state unchanged.
    #[error("State '{0}' does not have a transition to a next state")]
    StalledTransition(String),

    /// State type outside the executable set {operation, inject}.
    #[error("Unsupported state type: '{0}'")]
    UnsupportedStateType(String),

    /// Action mode outside the supported set {sequential}.
    #[error("Unsupported action mode: '{0}'")]
    UnsupportedMode(String),

    /// Malformed data-filter expression.
    #[error("Filter error: {0}")]
    Filter(String),

    /// Parse error (JSON or YAML definition).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Function invocation error.
    #[error("Function error: {0}")]
    Function(String),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
