//! Engine entry point
//!
//! Interactive messages and scheduler ticks enter through the same path,
//! [`Engine::run`], parameterised by a [`Trigger`]. Runs for one owner are
//! serialised by an async mutex keyed by owner; different owners proceed
//! concurrently.

use dashmap::DashMap;
use std::sync::Arc;
use steward_capability::OwnerId;
use steward_core::{Planner, ScheduledTask, ScheduledTaskId, Store, TaskOutcome, Transport};
use tokio_util::sync::CancellationToken;

/// Where a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// A message from the owner
    Interactive,
    /// A due scheduled task
    Scheduled {
        /// Task being executed
        task: ScheduledTaskId,
    },
}

/// One request to run the planner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Owner the run is for
    pub owner: OwnerId,
    /// Origin
    pub source: TriggerSource,
    /// Planner input
    pub text: String,
}

impl Trigger {
    /// Trigger for an inbound message
    #[must_use]
    pub fn interactive(owner: OwnerId, text: impl Into<String>) -> Self {
        Self {
            owner,
            source: TriggerSource::Interactive,
            text: text.into(),
        }
    }

    /// Trigger for a due scheduled task
    #[must_use]
    pub fn scheduled(task: &ScheduledTask) -> Self {
        Self {
            owner: task.owner.clone(),
            source: TriggerSource::Scheduled { task: task.id },
            text: scheduled_instruction(&task.description),
        }
    }
}

/// Synthetic planner input for a scheduled run
#[must_use]
pub fn scheduled_instruction(description: &str) -> String {
    format!(
        "[SYSTEM: This is the execution of a previously scheduled task: \"{description}\". \
         Please provide the output/reminder for the user. DO NOT schedule it again.]"
    )
}

/// Shared entry point over the planner and the outbound transport
pub struct Engine {
    planner: Planner,
    transport: Arc<dyn Transport>,
    owners: DashMap<OwnerId, Arc<tokio::sync::Mutex<()>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("planner", &self.planner)
            .field("owners", &self.owners.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create engine
    #[must_use]
    pub fn new(planner: Planner, transport: Arc<dyn Transport>) -> Self {
        Self {
            planner,
            transport,
            owners: DashMap::new(),
        }
    }

    /// Planner
    #[inline]
    #[must_use]
    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Store shared with the planner
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.planner.services().store
    }

    /// Run the planner for a trigger
    ///
    /// Waits for any other run of the same owner to finish first. The owner's
    /// lock is dropped from the table once nobody holds or awaits it.
    pub async fn run(&self, trigger: &Trigger, cancel: &CancellationToken) -> TaskOutcome {
        let outcome = self.run_exclusive(trigger, cancel).await;
        self.owners
            .remove_if(&trigger.owner, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    async fn run_exclusive(&self, trigger: &Trigger, cancel: &CancellationToken) -> TaskOutcome {
        let lock = self
            .owners
            .entry(trigger.owner.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        let _guard = tokio::select! {
            () = cancel.cancelled() => return TaskOutcome::Cancelled,
            guard = lock.lock_owned() => guard,
        };

        tracing::info!(owner = %trigger.owner, source = ?trigger.source, "run started");
        let outcome = self.planner.run(&trigger.owner, &trigger.text, cancel).await;
        tracing::info!(
            owner = %trigger.owner,
            completed = outcome.is_completed_run(),
            "run finished"
        );
        outcome
    }

    /// Owners with a run in progress or waiting
    #[must_use]
    pub fn active_owners(&self) -> usize {
        self.owners.len()
    }

    /// Handle an inbound message: run, deliver the reply, return the outcome
    pub async fn handle_message(
        &self,
        owner: OwnerId,
        text: impl Into<String>,
        cancel: &CancellationToken,
    ) -> TaskOutcome {
        let trigger = Trigger::interactive(owner, text);
        let outcome = self.run(&trigger, cancel).await;
        self.deliver(&trigger.owner, outcome.message()).await;
        outcome
    }

    /// Send text to an owner; failures are logged
    pub async fn deliver(&self, owner: &OwnerId, text: &str) -> bool {
        match self.transport.send(owner, text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "delivery failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_core::ScheduleStatus;

    #[test]
    fn scheduled_trigger_wraps_description() {
        let task = ScheduledTask {
            id: ScheduledTaskId(7),
            owner: OwnerId::from("chat-9"),
            description: "send the standup reminder".into(),
            interval_secs: 3600,
            last_run: None,
            not_before: None,
            status: ScheduleStatus::Active,
        };
        let trigger = Trigger::scheduled(&task);

        assert_eq!(trigger.owner, task.owner);
        assert_eq!(trigger.source, TriggerSource::Scheduled { task: ScheduledTaskId(7) });
        assert!(trigger
            .text
            .contains("previously scheduled task: \"send the standup reminder\""));
        assert!(trigger.text.ends_with("DO NOT schedule it again.]"));
    }

    #[test]
    fn interactive_trigger_keeps_text() {
        let trigger = Trigger::interactive(OwnerId::from("chat-1"), "hello");
        assert_eq!(trigger.source, TriggerSource::Interactive);
        assert_eq!(trigger.text, "hello");
    }
}
