use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::capability::types::CapabilityKind;
use crate::tasks::state::TaskState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    StateChanged {
        invocation: Uuid,
        kind: CapabilityKind,
        state: TaskState,
        at: chrono::DateTime<chrono::Utc>,
    },
    DownloadProgress {
        invocation: Uuid,
        kind: CapabilityKind,
        loaded: u64,
        total: u64,
    },
}

/// Fan-out of task events to whoever displays them.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TaskEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }

    /// Publishing with no subscriber is not an error.
    pub fn publish(&self, event: TaskEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
