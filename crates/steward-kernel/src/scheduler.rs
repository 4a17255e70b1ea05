//! Background scheduler
//!
//! Every [`TICK`] the store is asked for due tasks. Each one re-enters the
//! engine through [`Engine::run`] with a scheduled trigger, one after the
//! other.
//!
//! After a run:
//! - answer or deliberate abort: last-run is recorded, one-shots are deleted,
//!   the text is delivered under [`SCHEDULED_BANNER`]
//! - planning failure: nothing is recorded, so the task stays due
//! - cancellation: the tick stops

use crate::engine::{Engine, Trigger};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use steward_core::{ScheduledTask, TaskOutcome};
use tokio_util::sync::CancellationToken;

/// Poll period
pub const TICK: Duration = Duration::from_secs(30);

/// Prefix of every scheduled delivery
pub const SCHEDULED_BANNER: &str = "⏰ Scheduled Task Output\n\n";

/// Timer-driven re-entry into the engine
#[derive(Debug, Clone)]
pub struct Scheduler {
    engine: Arc<Engine>,
}

impl Scheduler {
    /// Create scheduler
    #[inline]
    #[must_use]
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Tick until cancelled
    ///
    /// The first poll happens one tick after start.
    pub async fn start(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(tick = ?TICK, "scheduler started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll_once(Utc::now(), &cancel).await;
                }
            }
        }
        tracing::info!("scheduler stopped");
    }

    /// Run every task due at `now`
    ///
    /// # Returns
    /// Number of runs that completed (answer or deliberate abort)
    pub async fn poll_once(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> usize {
        let due = match self.engine.store().due_tasks(now).await {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "failed to poll scheduled tasks");
                return 0;
            }
        };
        tracing::debug!(due = due.len(), "scheduler tick");

        let mut completed = 0;
        for task in due {
            if cancel.is_cancelled() {
                break;
            }
            if self.execute(&task, cancel).await {
                completed += 1;
            }
        }
        completed
    }

    async fn execute(&self, task: &ScheduledTask, cancel: &CancellationToken) -> bool {
        tracing::info!(task = %task.id, owner = %task.owner, description = %task.description, "executing scheduled task");
        let outcome = self.engine.run(&Trigger::scheduled(task), cancel).await;

        let label = match &outcome {
            TaskOutcome::Answer(_) => "answer",
            TaskOutcome::Aborted(_) => "aborted",
            TaskOutcome::Failed(_) => "failed",
            TaskOutcome::Cancelled => "cancelled",
        };
        metrics::counter!("steward_scheduled_runs_total", "outcome" => label).increment(1);

        if !outcome.is_completed_run() {
            tracing::warn!(task = %task.id, outcome = label, message = outcome.message(), "scheduled task not completed, will retry");
            return false;
        }

        let store = self.engine.store();
        if let Err(e) = store.mark_task_run(task.id, Utc::now()).await {
            tracing::warn!(task = %task.id, error = %e, "failed to record scheduled run");
        }
        if task.is_one_shot() {
            if let Err(e) = store.delete_task(&task.owner, task.id).await {
                tracing::warn!(task = %task.id, error = %e, "failed to delete one-time task");
            }
        }

        self.engine
            .deliver(&task.owner, &format!("{SCHEDULED_BANNER}{}", outcome.message()))
            .await;
        true
    }
}
