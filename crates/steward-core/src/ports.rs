//! Store and transport ports
//!
//! Both collaborators are shared by every concurrently running task and must
//! provide their own safe concurrent access; the engine adds no locking.

use crate::error::{StoreError, TransportError};
use crate::plan::{PlanId, Step};
use crate::transcript::Message;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use steward_capability::OwnerId;

/// Scheduled task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduledTaskId(pub u64);

impl std::fmt::Display for ScheduledTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduled task lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    /// Eligible to run
    #[default]
    Active,
    /// Kept but never due
    Paused,
}

/// A recurring or one-shot task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Store id
    pub id: ScheduledTaskId,
    /// Owner the output is delivered to
    pub owner: OwnerId,
    /// What to do when due
    pub description: String,
    /// Seconds between runs; 0 means one-shot
    pub interval_secs: u64,
    /// Last completed run
    pub last_run: Option<DateTime<Utc>>,
    /// Earliest time a one-shot may run
    pub not_before: Option<DateTime<Utc>>,
    /// Lifecycle status
    pub status: ScheduleStatus,
}

impl ScheduledTask {
    /// Check if one-shot
    #[inline]
    #[must_use]
    pub fn is_one_shot(&self) -> bool {
        self.interval_secs == 0
    }

    /// Check if the task should run at `now`
    ///
    /// - recurring: never run, or at least `interval_secs` since the last run
    /// - one-shot: never run and `now` is past `not_before` (if any)
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.status != ScheduleStatus::Active {
            return false;
        }
        if self.is_one_shot() {
            return self.last_run.is_none() && self.not_before.map_or(true, |t| now >= t);
        }
        let Some(interval) = i64::try_from(self.interval_secs)
            .ok()
            .and_then(Duration::try_seconds)
        else {
            return self.last_run.is_none();
        };
        match self.last_run {
            None => true,
            Some(last) => now.signed_duration_since(last) >= interval,
        }
    }
}

/// Request to create a scheduled task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduledTask {
    /// Owner
    pub owner: OwnerId,
    /// What to do
    pub description: String,
    /// Seconds between runs; 0 means one-shot
    pub interval_secs: u64,
    /// Earliest run time for one-shots
    pub not_before: Option<DateTime<Utc>>,
}

/// Reasoning cost entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    /// Owner the call was made for
    pub owner: OwnerId,
    /// Model label
    pub model: String,
    /// Prompt tokens
    pub prompt_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
}

/// Persistent storage of messages, plans, costs and scheduled tasks
#[async_trait]
pub trait Store: Send + Sync {
    /// Append a message to the owner's history
    async fn append_message(&self, owner: &OwnerId, message: Message) -> Result<(), StoreError>;

    /// Most recent `limit` messages, oldest first
    async fn history(&self, owner: &OwnerId, limit: usize) -> Result<Vec<Message>, StoreError>;

    /// Persist a new plan for a goal
    async fn save_plan(&self, owner: &OwnerId, goal: &str) -> Result<PlanId, StoreError>;

    /// Overwrite a plan's step list
    async fn sync_plan_steps(&self, plan: PlanId, steps: &[Step]) -> Result<(), StoreError>;

    /// Record reasoning cost
    async fn record_cost(&self, entry: CostEntry) -> Result<(), StoreError>;

    /// Create a scheduled task
    async fn add_task(&self, task: NewScheduledTask) -> Result<ScheduledTask, StoreError>;

    /// Tasks of one owner
    async fn list_tasks(&self, owner: &OwnerId) -> Result<Vec<ScheduledTask>, StoreError>;

    /// Delete one of the owner's tasks; `false` if it did not exist
    async fn delete_task(&self, owner: &OwnerId, id: ScheduledTaskId) -> Result<bool, StoreError>;

    /// Delete all of the owner's tasks, returning how many were removed
    async fn clear_tasks(&self, owner: &OwnerId) -> Result<usize, StoreError>;

    /// Tasks due at `now`
    async fn due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledTask>, StoreError>;

    /// Record a completed run
    async fn mark_task_run(&self, id: ScheduledTaskId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Outbound chat delivery
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send text to an owner
    async fn send(&self, owner: &OwnerId, text: &str) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(interval_secs: u64) -> ScheduledTask {
        ScheduledTask {
            id: ScheduledTaskId(1),
            owner: OwnerId::from("chat-1"),
            description: "water the plants".into(),
            interval_secs,
            last_run: None,
            not_before: None,
            status: ScheduleStatus::Active,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap()
    }

    #[test]
    fn recurring_due_after_interval() {
        let mut t = task(60);
        assert!(t.is_due(at(0)));
        t.last_run = Some(at(0));
        assert!(!t.is_due(at(59)));
        assert!(t.is_due(at(60)));
    }

    #[test]
    fn one_shot_runs_once() {
        let mut t = task(0);
        assert!(t.is_due(at(0)));
        t.last_run = Some(at(0));
        assert!(!t.is_due(at(10_000)));
    }

    #[test]
    fn one_shot_honours_delay() {
        let mut t = task(0);
        t.not_before = Some(at(300));
        assert!(!t.is_due(at(299)));
        assert!(t.is_due(at(300)));
    }

    #[test]
    fn paused_is_never_due() {
        let mut t = task(60);
        t.status = ScheduleStatus::Paused;
        assert!(!t.is_due(at(0)));
    }
}
