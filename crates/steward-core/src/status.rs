//! Live task status
//!
//! Status is published on a broadcast channel owned by whoever runs the
//! engine. Tasks only hold a [`StatusSink`]; with no subscribers, or with a
//! disabled sink, publishing is a no-op.

use crate::plan::{StepId, TaskId};
use steward_capability::OwnerId;
use tokio::sync::broadcast;

/// What a task is doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Asking for a plan update
    Planning,
    /// Running one step
    Executing {
        /// Step id
        step: StepId,
        /// Step description
        description: String,
    },
    /// All steps done, forcing a final answer
    Consolidating,
    /// Task finished
    Idle,
}

/// One status update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    /// Task owner
    pub owner: OwnerId,
    /// Task
    pub task: TaskId,
    /// New phase
    pub phase: Phase,
}

/// Publishing side of the status channel
#[derive(Debug, Clone, Default)]
pub struct StatusSink {
    sender: Option<broadcast::Sender<StatusEvent>>,
}

impl StatusSink {
    /// Create a sink with its own channel
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, broadcast::Receiver<StatusEvent>) {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Sink that drops every event
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Subscribe a new receiver, if the sink is enabled
    #[must_use]
    pub fn subscribe(&self) -> Option<broadcast::Receiver<StatusEvent>> {
        self.sender.as_ref().map(broadcast::Sender::subscribe)
    }

    /// Publish a phase change
    pub fn publish(&self, owner: &OwnerId, task: TaskId, phase: Phase) {
        if let Some(sender) = &self.sender {
            // no receivers is fine
            let _ = sender.send(StatusEvent {
                owner: owner.clone(),
                task,
                phase,
            });
        }
    }
}
