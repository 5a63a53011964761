//! Event bus seam between the engine and its host.
//!
//! The runner publishes workflow-produced events and registers
//! subscriptions for declared consumed events through the [`EventBus`]
//! trait. The bus is constructor-injected, never reached through global
//! state; hosts embed their own implementation and observe events from
//! it. [`InProcessEventBus`] is the synchronous in-process
//! implementation used by the CLI and tests.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Event type name under which workflow events travel on the bus.
pub const WORKFLOW_EVENT_TYPE: &str = "panels-workflow-event";

/// Event published by a workflow transition or end marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Name of the declared event being published.
    pub publish: String,

    /// Arbitrary event payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl WorkflowEvent {
    /// Create a new workflow event.
    pub fn new(publish: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            publish: publish.into(),
            data,
        }
    }
}

/// Handler invoked synchronously for every published event.
pub type EventHandler = Arc<dyn Fn(&WorkflowEvent) + Send + Sync>;

/// Publish/subscribe mechanism connecting workflow-produced events to
/// host-side listeners. Publishing is synchronous: all handlers run
/// before `publish` returns.
pub trait EventBus: Send + Sync {
    /// Register a handler for all subsequently published events.
    fn subscribe(&self, handler: EventHandler);

    /// Publish an event to every registered handler.
    fn publish(&self, event: WorkflowEvent);
}

/// Synchronous in-process event bus.
///
/// Re-entrant: a handler invoked during `publish` may itself publish or
/// subscribe. The handler list is cloned out of the lock before
/// invocation, so handlers registered mid-publish see only later events.
#[derive(Default)]
pub struct InProcessEventBus {
    handlers: Mutex<Vec<EventHandler>>,
}

impl InProcessEventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventBus for InProcessEventBus {
    fn subscribe(&self, handler: EventHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handler);
    }

    fn publish(&self, event: WorkflowEvent) {
        tracing::debug!(
            event_type = WORKFLOW_EVENT_TYPE,
            publish = %event.publish,
            "Publishing workflow event"
        );

        let handlers: Vec<EventHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for handler in handlers {
            handler(&event);
        }
    }
}
