//! Workflow definition parser.
//!
//! Parses JSON or YAML workflow definitions into [`Workflow`] structures
//! and validates the structural invariants the runner relies on, so a
//! host can reject a bad definition before constructing a runner.

use std::collections::HashSet;

use crate::error::{EngineError, EngineResult};
use crate::workflow::types::Workflow;

/// Parse a JSON string into a Workflow.
pub fn parse_workflow_json(content: &str) -> EngineResult<Workflow> {
    let workflow: Workflow =
        serde_json::from_str(content).map_err(|e| EngineError::Parse(e.to_string()))?;
    validate_workflow(&workflow)?;
    Ok(workflow)
}

/// Parse a YAML string into a Workflow.
pub fn parse_workflow_yaml(content: &str) -> EngineResult<Workflow> {
    let workflow: Workflow =
        serde_yaml::from_str(content).map_err(|e| EngineError::Parse(e.to_string()))?;
    validate_workflow(&workflow)?;
    Ok(workflow)
}

/// Validate a parsed workflow.
///
/// Mirrors the runner's own fatal checks: a definition that passes here
/// will not fail configuration checks at `start()`.
pub fn validate_workflow(workflow: &Workflow) -> EngineResult<()> {
    // Check for a start reference
    let start = workflow
        .start_state_name()
        .ok_or_else(|| EngineError::Configuration("workflow without start".to_string()))?;

    if workflow.states.is_empty() {
        return Err(EngineError::Configuration(
            "workflow declares no states".to_string(),
        ));
    }

    // Check for duplicate state names
    let mut seen = HashSet::new();
    for state in &workflow.states {
        if !seen.insert(state.name()) {
            return Err(EngineError::Configuration(format!(
                "Duplicate state name: '{}'",
                state.name()
            )));
        }
    }

    // Check that at least one state declares an end marker
    if !workflow.has_end_state() {
        return Err(EngineError::Configuration("states without end".to_string()));
    }

    let names: HashSet<&str> = workflow.states.iter().map(|s| s.name()).collect();

    if !names.contains(start) {
        return Err(EngineError::Configuration(format!(
            "Start references unknown state: '{}'",
            start
        )));
    }

    for state in &workflow.states {
        // A state carries exactly one of transition or end
        if state.transition().is_some() && state.end().is_some() {
            return Err(EngineError::Configuration(format!(
                "State '{}' can't define both transition and end",
                state.name()
            )));
        }

        if let Some(transition) = state.transition() {
            if !names.contains(transition.next_state()) {
                return Err(EngineError::Configuration(format!(
                    "State '{}' transitions to unknown state '{}'",
                    state.name(),
                    transition.next_state()
                )));
            }
        }
    }

    Ok(())
}
