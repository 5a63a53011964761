//! Workflow definition types.
//!
//! Serde model for the serverless-workflow style schema the host panel
//! supplies as parsed JSON. Field names follow the schema's camelCase
//! wire format. The definition is read-only to the engine.
//!
//! States form a closed sum type tagged by `type`. Only `operation` and
//! `inject` carry execution semantics; the remaining variants are
//! recognized as transition/end carriers so their graph structure can be
//! validated, but executing one is a fatal error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Complete workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Workflow identifier.
    pub id: String,

    /// Human-readable workflow name.
    pub name: String,

    /// Definition version.
    #[serde(default)]
    pub version: Option<String>,

    /// Schema version of the definition format.
    #[serde(default)]
    pub spec_version: Option<String>,

    /// Start state reference.
    #[serde(default)]
    pub start: Option<StartRef>,

    /// Ordered state list. State names are unique keys.
    pub states: Vec<State>,

    /// Declared event definitions.
    #[serde(default)]
    pub events: Option<Vec<EventDef>>,

    /// Declared function definitions.
    #[serde(default)]
    pub functions: Option<Vec<FunctionDef>>,
}

impl Workflow {
    /// Get a state by name.
    pub fn get_state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name() == name)
    }

    /// Get all state names in declaration order.
    pub fn state_names(&self) -> Vec<&str> {
        self.states.iter().map(|s| s.name()).collect()
    }

    /// Check whether any state declares an end marker.
    pub fn has_end_state(&self) -> bool {
        self.states.iter().any(|s| s.end().is_some())
    }

    /// Resolve the start state name, if a start reference is declared.
    pub fn start_state_name(&self) -> Option<&str> {
        self.start.as_ref().map(|s| s.state_name())
    }
}

/// Start state reference - plain name or structured descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartRef {
    /// Plain state name.
    Name(String),

    /// Structured start descriptor.
    #[serde(rename_all = "camelCase")]
    Descriptor { state_name: String },
}

impl StartRef {
    /// The referenced state name.
    pub fn state_name(&self) -> &str {
        match self {
            StartRef::Name(name) => name,
            StartRef::Descriptor { state_name } => state_name,
        }
    }
}

/// Workflow state, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum State {
    Operation(OperationState),
    Inject(InjectState),
    Sleep(CarrierState),
    Event(CarrierState),
    Parallel(CarrierState),
    Switch(CarrierState),
    Foreach(CarrierState),
    Callback(CarrierState),
}

impl State {
    /// State name (unique key within a definition).
    pub fn name(&self) -> &str {
        match self {
            State::Operation(s) => &s.name,
            State::Inject(s) => &s.name,
            State::Sleep(s)
            | State::Event(s)
            | State::Parallel(s)
            | State::Switch(s)
            | State::Foreach(s)
            | State::Callback(s) => &s.name,
        }
    }

    /// The declared input/output data filter pair, if any.
    pub fn data_filter(&self) -> Option<&StateDataFilter> {
        match self {
            State::Operation(s) => s.state_data_filter.as_ref(),
            State::Inject(s) => s.state_data_filter.as_ref(),
            State::Sleep(s)
            | State::Event(s)
            | State::Parallel(s)
            | State::Switch(s)
            | State::Foreach(s)
            | State::Callback(s) => s.state_data_filter.as_ref(),
        }
    }

    /// The declared transition, if any.
    pub fn transition(&self) -> Option<&Transition> {
        match self {
            State::Operation(s) => s.transition.as_ref(),
            State::Inject(s) => s.transition.as_ref(),
            State::Sleep(s)
            | State::Event(s)
            | State::Parallel(s)
            | State::Switch(s)
            | State::Foreach(s)
            | State::Callback(s) => s.transition.as_ref(),
        }
    }

    /// The declared end marker, if any.
    pub fn end(&self) -> Option<&End> {
        match self {
            State::Operation(s) => s.end.as_ref(),
            State::Inject(s) => s.end.as_ref(),
            State::Sleep(s)
            | State::Event(s)
            | State::Parallel(s)
            | State::Switch(s)
            | State::Foreach(s)
            | State::Callback(s) => s.end.as_ref(),
        }
    }

    /// The wire name of this state's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            State::Operation(_) => "operation",
            State::Inject(_) => "inject",
            State::Sleep(_) => "sleep",
            State::Event(_) => "event",
            State::Parallel(_) => "parallel",
            State::Switch(_) => "switch",
            State::Foreach(_) => "foreach",
            State::Callback(_) => "callback",
        }
    }
}

/// Operation state: runs an action list and merges the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationState {
    /// State name.
    pub name: String,

    /// Action execution mode.
    #[serde(default)]
    pub action_mode: ActionMode,

    /// Actions to execute.
    #[serde(default)]
    pub actions: Option<Vec<Action>>,

    /// Input/output data filters.
    #[serde(default)]
    pub state_data_filter: Option<StateDataFilter>,

    /// Transition to the next state.
    #[serde(default)]
    pub transition: Option<Transition>,

    /// Terminal marker.
    #[serde(default)]
    pub end: Option<End>,
}

/// Inject state: replaces state data with a static payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectState {
    /// State name.
    pub name: String,

    /// Static payload injected as the state's data.
    pub data: serde_json::Value,

    /// Input/output data filters.
    #[serde(default)]
    pub state_data_filter: Option<StateDataFilter>,

    /// Transition to the next state.
    #[serde(default)]
    pub transition: Option<Transition>,

    /// Terminal marker.
    #[serde(default)]
    pub end: Option<End>,
}

/// State variant with no execution semantics. Recognized so its
/// transition/end markers participate in graph validation; type-specific
/// configuration is carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierState {
    /// State name.
    pub name: String,

    /// Input/output data filters.
    #[serde(default)]
    pub state_data_filter: Option<StateDataFilter>,

    /// Transition to the next state.
    #[serde(default)]
    pub transition: Option<Transition>,

    /// Terminal marker.
    #[serde(default)]
    pub end: Option<End>,

    /// Type-specific configuration (durations, branches, conditions).
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Action execution mode for operation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMode {
    #[default]
    Sequential,
    Parallel,
}

impl std::fmt::Display for ActionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionMode::Sequential => write!(f, "sequential"),
            ActionMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Input/output projection expressions applied at state boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDataFilter {
    /// Filter applied to state data before execution.
    #[serde(default)]
    pub input: Option<String>,

    /// Filter applied to merged data after execution.
    #[serde(default)]
    pub output: Option<String>,
}

/// Unit of work within an operation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Action name.
    #[serde(default)]
    pub name: Option<String>,

    /// Function to invoke.
    #[serde(default)]
    pub function_ref: Option<FunctionRef>,

    /// Input/result filters for this action.
    #[serde(default)]
    pub action_data_filter: Option<ActionDataFilter>,
}

/// Function reference - plain name or structured descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionRef {
    /// Plain function name.
    Name(String),

    /// Structured reference with invocation arguments.
    #[serde(rename_all = "camelCase")]
    Detailed {
        ref_name: String,
        #[serde(default)]
        arguments: Option<serde_json::Value>,
    },
}

impl FunctionRef {
    /// The referenced function name.
    pub fn ref_name(&self) -> &str {
        match self {
            FunctionRef::Name(name) => name,
            FunctionRef::Detailed { ref_name, .. } => ref_name,
        }
    }
}

/// Per-action data filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDataFilter {
    /// Filter applied to state data before the function invocation.
    #[serde(default)]
    pub from_state_data: Option<String>,

    /// When false, invocation results are discarded and the action
    /// returns its input unchanged.
    #[serde(default)]
    pub use_results: Option<bool>,

    /// Filter applied to invocation results.
    #[serde(default)]
    pub results: Option<String>,

    /// Key to wrap the filtered result under before merging.
    #[serde(default)]
    pub to_state_data: Option<String>,
}

/// Transition - plain next-state name or structured descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transition {
    /// Plain next-state name.
    Next(String),

    /// Structured transition carrying events to publish.
    #[serde(rename_all = "camelCase")]
    Descriptor {
        next_state: String,
        #[serde(default)]
        produce_events: Option<Vec<ProduceEventDef>>,
    },
}

impl Transition {
    /// The next state name.
    pub fn next_state(&self) -> &str {
        match self {
            Transition::Next(name) => name,
            Transition::Descriptor { next_state, .. } => next_state,
        }
    }

    /// Events to publish on transition, if any.
    pub fn produce_events(&self) -> Option<&[ProduceEventDef]> {
        match self {
            Transition::Next(_) => None,
            Transition::Descriptor { produce_events, .. } => produce_events.as_deref(),
        }
    }
}

/// Terminal marker - plain boolean or structured descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum End {
    /// Plain terminate flag.
    Terminate(bool),

    /// Structured end carrying events to publish before halting.
    #[serde(rename_all = "camelCase")]
    Descriptor {
        #[serde(default)]
        terminate: bool,
        #[serde(default)]
        produce_events: Option<Vec<ProduceEventDef>>,
    },
}

impl End {
    /// Whether reaching this end terminates the run.
    pub fn terminate(&self) -> bool {
        match self {
            End::Terminate(terminate) => *terminate,
            End::Descriptor { terminate, .. } => *terminate,
        }
    }

    /// Events to publish before halting, if any.
    pub fn produce_events(&self) -> Option<&[ProduceEventDef]> {
        match self {
            End::Terminate(_) => None,
            End::Descriptor { produce_events, .. } => produce_events.as_deref(),
        }
    }
}

/// Declared event definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDef {
    /// Event name.
    pub name: String,

    /// Event direction.
    #[serde(default)]
    pub kind: EventKind,

    /// CloudEvents type.
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,

    /// CloudEvents source.
    #[serde(default)]
    pub source: Option<String>,

    /// Whether only the event payload is consumed.
    #[serde(default)]
    pub data_only: Option<bool>,
}

/// Event direction. Only `consumed` events may be registered on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[default]
    Consumed,
    Produced,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Consumed => write!(f, "consumed"),
            EventKind::Produced => write!(f, "produced"),
        }
    }
}

/// Event produced by a transition or end marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceEventDef {
    /// Name of the declared event to publish.
    pub event_ref: String,

    /// Arbitrary event payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Declared function definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
    /// Function name referenced by actions.
    pub name: String,

    /// Operation the function performs.
    #[serde(default)]
    pub operation: Option<String>,

    /// Function type.
    #[serde(default, rename = "type")]
    pub function_type: Option<String>,
}
