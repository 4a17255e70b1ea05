//! In-memory store
//!
//! A complete [`Store`] backed by a single mutex. Suitable for tests, tools
//! and single-process deployments; nothing survives a restart.
//!
//! Messages, plans and cost entries are retained for the life of the process
//! and are never pruned. Long-running hosts should use a persistent store.

use crate::error::StoreError;
use crate::plan::{PlanId, PlanRecord, Step};
use crate::ports::{
    CostEntry, NewScheduledTask, ScheduleStatus, ScheduledTask, ScheduledTaskId, Store,
};
use crate::transcript::Message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use steward_capability::OwnerId;

#[derive(Debug, Default)]
struct Inner {
    messages: HashMap<OwnerId, Vec<Message>>,
    plans: BTreeMap<PlanId, PlanRecord>,
    costs: Vec<CostEntry>,
    tasks: BTreeMap<ScheduledTaskId, ScheduledTask>,
    next_plan: u64,
    next_task: u64,
}

/// Mutex-guarded in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted plan by id
    #[must_use]
    pub fn plan(&self, id: PlanId) -> Option<PlanRecord> {
        self.inner.lock().plans.get(&id).cloned()
    }

    /// All persisted plans, oldest first
    #[must_use]
    pub fn plans(&self) -> Vec<PlanRecord> {
        self.inner.lock().plans.values().cloned().collect()
    }

    /// All recorded cost entries
    #[must_use]
    pub fn costs(&self) -> Vec<CostEntry> {
        self.inner.lock().costs.clone()
    }

    /// All scheduled tasks
    #[must_use]
    pub fn tasks(&self) -> Vec<ScheduledTask> {
        self.inner.lock().tasks.values().cloned().collect()
    }

    /// Full history of an owner
    #[must_use]
    pub fn messages(&self, owner: &OwnerId) -> Vec<Message> {
        self.inner
            .lock()
            .messages
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn append_message(&self, owner: &OwnerId, message: Message) -> Result<(), StoreError> {
        self.inner
            .lock()
            .messages
            .entry(owner.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn history(&self, owner: &OwnerId, limit: usize) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.lock();
        let Some(all) = inner.messages.get(owner) else {
            return Ok(Vec::new());
        };
        let start = all.len().saturating_sub(limit);
        Ok(all[start..].to_vec())
    }

    async fn save_plan(&self, owner: &OwnerId, goal: &str) -> Result<PlanId, StoreError> {
        let mut inner = self.inner.lock();
        inner.next_plan += 1;
        let id = PlanId(inner.next_plan);
        inner.plans.insert(
            id,
            PlanRecord {
                id,
                owner: owner.clone(),
                goal: goal.to_string(),
                steps: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn sync_plan_steps(&self, plan: PlanId, steps: &[Step]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let record = inner.plans.get_mut(&plan).ok_or_else(|| StoreError::NotFound {
            kind: "plan",
            id: plan.to_string(),
        })?;
        record.steps = steps.to_vec();
        Ok(())
    }

    async fn record_cost(&self, entry: CostEntry) -> Result<(), StoreError> {
        self.inner.lock().costs.push(entry);
        Ok(())
    }

    async fn add_task(&self, task: NewScheduledTask) -> Result<ScheduledTask, StoreError> {
        let mut inner = self.inner.lock();
        inner.next_task += 1;
        let created = ScheduledTask {
            id: ScheduledTaskId(inner.next_task),
            owner: task.owner,
            description: task.description,
            interval_secs: task.interval_secs,
            last_run: None,
            not_before: task.not_before,
            status: ScheduleStatus::Active,
        };
        inner.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_tasks(&self, owner: &OwnerId) -> Result<Vec<ScheduledTask>, StoreError> {
        Ok(self
            .inner
            .lock()
            .tasks
            .values()
            .filter(|t| &t.owner == owner)
            .cloned()
            .collect())
    }

    async fn delete_task(&self, owner: &OwnerId, id: ScheduledTaskId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.tasks.get(&id) {
            Some(task) if &task.owner == owner => {
                inner.tasks.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_tasks(&self, owner: &OwnerId) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        let before = inner.tasks.len();
        inner.tasks.retain(|_, t| &t.owner != owner);
        Ok(before - inner.tasks.len())
    }

    async fn due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledTask>, StoreError> {
        Ok(self
            .inner
            .lock()
            .tasks
            .values()
            .filter(|t| t.is_due(now))
            .cloned()
            .collect())
    }

    async fn mark_task_run(&self, id: ScheduledTaskId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let task = inner.tasks.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            kind: "scheduled task",
            id: id.to_string(),
        })?;
        task.last_run = Some(at);
        Ok(())
    }
}
