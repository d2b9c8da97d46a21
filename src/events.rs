//! Session event notification interface
//!
//! Core components publish [`SessionEvent`]s on a broadcast channel;
//! presentation code (CLI, UI, log view) subscribes and renders them.
//! Core logic never renders anything itself.

use tokio::sync::broadcast;

use crate::command::DispatchOutcome;
use crate::connection::ConnectionState;
use crate::reading::Broadcast;

/// Buffered events per subscriber before the oldest are dropped
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notification published by the session core
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Connection lifecycle transition
    StatusChanged {
        state: ConnectionState,
        detail: Option<String>,
    },

    /// A broadcast arrived and should be displayed
    ReadingUpdated(Broadcast),

    /// A broadcast arrived during an override window and was discarded
    BroadcastSuppressed { raw: String },

    /// A manual override window went live
    OverrideStarted { value: f64 },

    /// The override window expired, live readings resume
    OverrideEnded,

    /// A command request settled
    CommandCompleted(DispatchOutcome),
}

/// Cloneable handle to the session event channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to all session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; silently dropped when nobody listens
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
