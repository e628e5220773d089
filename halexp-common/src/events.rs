//! Event types for the halexp dispatch event system
//!
//! Provides the shared row/result types and the EventBus used to publish
//! per-configuration completions to observers (SSE clients, the CLI).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Normalized, display-ready projection of one upstream result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Author display name or document title
    pub label: String,
    /// Profile search link (authors) or document URI (documents)
    pub link_url: String,
    /// `"{configuration_index}#{rank}"`, key into the detail store
    pub detail_key: String,
}

/// State of one configuration row within a dispatch run
///
/// `Failed` is distinct from both `Pending` and an empty `Loaded` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowState {
    /// Request not yet completed
    Pending,
    /// Request completed; results in rank order (may be empty)
    Loaded { items: Vec<ResultItem> },
    /// Transport failure or unexpected response shape
    Failed { error: String },
}

impl RowState {
    pub fn is_pending(&self) -> bool {
        matches!(self, RowState::Pending)
    }
}

/// Dispatch event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DispatchEvent {
    /// A new dispatch run replaced the current one
    RunStarted {
        run_id: Uuid,
        /// Number of configurations (requests in flight)
        configurations: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One configuration's request completed (success or failure)
    ///
    /// Arrives in completion order, not configuration order.
    RowUpdated {
        run_id: Uuid,
        config_index: usize,
        row: RowState,
        /// Requests of this run still outstanding after this completion
        outstanding: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every request of the run has completed
    RunCompleted {
        run_id: Uuid,
        loaded: usize,
        failed: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Busy indicator transitioned
    BusyChanged {
        busy: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DispatchEvent {
    /// SSE event name for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            DispatchEvent::RunStarted { .. } => "RunStarted",
            DispatchEvent::RowUpdated { .. } => "RowUpdated",
            DispatchEvent::RunCompleted { .. } => "RunCompleted",
            DispatchEvent::BusyChanged { .. } => "BusyChanged",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block dispatch tasks)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DispatchEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Capacity should exceed the largest expected configuration space, or
    /// slow subscribers will observe `Lagged` and miss row updates.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DispatchEvent,
    ) -> Result<usize, broadcast::error::SendError<DispatchEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DispatchEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
