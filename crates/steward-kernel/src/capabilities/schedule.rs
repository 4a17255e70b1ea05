//! `schedule_task` capability
//!
//! Lets a step create, list and remove the owner's scheduled tasks. The owner
//! always comes from the invocation context; a step can never touch another
//! owner's schedule.

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use steward_capability::{
    decode_args, Capability, CapabilityDescriptor, CapabilityError, InvocationContext,
};
use steward_core::{NewScheduledTask, ScheduledTask, ScheduledTaskId, Store, StoreError};

/// Capability name
pub const SCHEDULE_TASK: &str = "schedule_task";

/// Requested operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleAction {
    /// Recurring task
    Schedule,
    /// One-time task
    Once,
    /// List the owner's tasks
    List,
    /// Remove one task by id
    Remove,
    /// Remove all of the owner's tasks
    Clear,
}

/// Arguments of `schedule_task`
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ScheduleTaskArgs {
    /// The action to perform: 'schedule' recurring, 'once' one-time, 'clear' all, 'list' all, or 'remove' one.
    pub action: ScheduleAction,
    /// What the agent should do (for 'schedule' and 'once')
    #[serde(default)]
    pub task_description: Option<String>,
    /// Interval in seconds (for 'schedule')
    #[serde(default)]
    pub interval_seconds: Option<u64>,
    /// Delay in seconds before running the one-time task (for 'once')
    #[serde(default)]
    pub delay_seconds: Option<u64>,
    /// The ID of the task to remove (for 'remove')
    #[serde(default)]
    pub task_id: Option<u64>,
}

/// Store-backed scheduling capability
pub struct ScheduleTaskCapability {
    descriptor: CapabilityDescriptor,
    store: Arc<dyn Store>,
    min_interval_secs: u64,
}

impl std::fmt::Debug for ScheduleTaskCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleTaskCapability")
            .field("min_interval_secs", &self.min_interval_secs)
            .finish_non_exhaustive()
    }
}

impl ScheduleTaskCapability {
    /// Create capability
    ///
    /// # Arguments
    /// * `store` - where tasks are kept
    /// * `min_interval_secs` - shortest accepted recurring interval
    #[must_use]
    pub fn new(store: Arc<dyn Store>, min_interval_secs: u64) -> Self {
        Self {
            descriptor: descriptor(),
            store,
            min_interval_secs,
        }
    }

    async fn list(&self, ctx: &InvocationContext) -> Result<String, CapabilityError> {
        let tasks = self.store.list_tasks(&ctx.owner).await.map_err(store_error)?;
        if tasks.is_empty() {
            return Ok("You have no scheduled tasks.".to_string());
        }
        let mut out = String::from("Your scheduled tasks:\n");
        for task in &tasks {
            let _ = writeln!(out, "{}", list_line(task));
        }
        Ok(out)
    }

    async fn remove(&self, ctx: &InvocationContext, id: Option<u64>) -> Result<String, CapabilityError> {
        let Some(id) = id.filter(|id| *id != 0) else {
            return Ok("Error: task_id is required for 'remove' action.".to_string());
        };
        let removed = self
            .store
            .delete_task(&ctx.owner, ScheduledTaskId(id))
            .await
            .map_err(store_error)?;
        if removed {
            Ok(format!("Successfully removed task {id}."))
        } else {
            Ok(format!("Error: no scheduled task with id {id}."))
        }
    }

    async fn clear(&self, ctx: &InvocationContext) -> Result<String, CapabilityError> {
        let removed = self.store.clear_tasks(&ctx.owner).await.map_err(store_error)?;
        tracing::info!(owner = %ctx.owner, removed, "cleared scheduled tasks");
        Ok("Successfully cleared all your scheduled tasks.".to_string())
    }

    async fn once(
        &self,
        ctx: &InvocationContext,
        description: String,
        delay: Option<u64>,
    ) -> Result<String, CapabilityError> {
        let delay = delay.filter(|secs| *secs > 0);
        let not_before = match delay {
            Some(secs) => Some(
                i64::try_from(secs)
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .and_then(|d| Utc::now().checked_add_signed(d))
                    .ok_or_else(|| {
                        CapabilityError::invalid_arguments(SCHEDULE_TASK, "delay_seconds is out of range")
                    })?,
            ),
            None => None,
        };
        let task = self
            .store
            .add_task(NewScheduledTask {
                owner: ctx.owner.clone(),
                description: description.clone(),
                interval_secs: 0,
                not_before,
            })
            .await
            .map_err(store_error)?;
        tracing::info!(owner = %ctx.owner, task = %task.id, ?not_before, "scheduled one-time task");

        Ok(match delay {
            Some(secs) => format!(
                "Successfully scheduled one-time task: '{description}'. It will run in about {secs} seconds."
            ),
            None => format!("Successfully scheduled one-time task: '{description}'. It will run shortly."),
        })
    }

    async fn schedule(
        &self,
        ctx: &InvocationContext,
        description: String,
        interval: Option<u64>,
    ) -> Result<String, CapabilityError> {
        let interval = interval.unwrap_or(0);
        if interval < self.min_interval_secs {
            return Ok(format!(
                "Error: Minimum interval is {} seconds to prevent spamming.",
                self.min_interval_secs
            ));
        }
        let task = self
            .store
            .add_task(NewScheduledTask {
                owner: ctx.owner.clone(),
                description: description.clone(),
                interval_secs: interval,
                not_before: None,
            })
            .await
            .map_err(store_error)?;
        tracing::info!(owner = %ctx.owner, task = %task.id, interval, "scheduled recurring task");
        Ok(format!(
            "Successfully scheduled task: '{description}' every {interval} seconds."
        ))
    }
}

#[async_trait]
impl Capability for ScheduleTaskCapability {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, ctx: &InvocationContext, args: Value) -> Result<String, CapabilityError> {
        let args: ScheduleTaskArgs = decode_args(SCHEDULE_TASK, args)?;

        match args.action {
            ScheduleAction::List => self.list(ctx).await,
            ScheduleAction::Remove => self.remove(ctx, args.task_id).await,
            ScheduleAction::Clear => self.clear(ctx).await,
            ScheduleAction::Once => {
                let description = require_description(args.task_description)?;
                self.once(ctx, description, args.delay_seconds).await
            }
            ScheduleAction::Schedule => {
                let description = require_description(args.task_description)?;
                self.schedule(ctx, description, args.interval_seconds).await
            }
        }
    }
}

/// Descriptor of `schedule_task`
#[must_use]
pub fn descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor::for_args::<ScheduleTaskArgs>(
        SCHEDULE_TASK,
        "Manage recurring tasks: 'schedule' (recurring), 'once' (one-time reminder), \
         'clear' (all), 'list' active tasks, or 'remove' a specific task by ID.",
    )
}

fn require_description(description: Option<String>) -> Result<String, CapabilityError> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| CapabilityError::invalid_arguments(SCHEDULE_TASK, "task_description is required"))
}

fn list_line(task: &ScheduledTask) -> String {
    let cadence = if task.is_one_shot() {
        "one-time".to_string()
    } else {
        format!("every {} seconds", task.interval_secs)
    };
    let status = match task.status {
        steward_core::ScheduleStatus::Active => "active",
        steward_core::ScheduleStatus::Paused => "paused",
    };
    format!("- [{}] {} ({cadence}, status: {status})", task.id, task.description)
}

fn store_error(e: StoreError) -> CapabilityError {
    CapabilityError::execution(SCHEDULE_TASK, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_capability::OwnerId;
    use steward_core::ScheduleStatus;

    #[test]
    fn list_line_formats_both_cadences() {
        let mut task = ScheduledTask {
            id: ScheduledTaskId(3),
            owner: OwnerId::from("chat-1"),
            description: "stretch".into(),
            interval_secs: 120,
            last_run: None,
            not_before: None,
            status: ScheduleStatus::Active,
        };
        assert_eq!(list_line(&task), "- [3] stretch (every 120 seconds, status: active)");

        task.interval_secs = 0;
        task.status = ScheduleStatus::Paused;
        assert_eq!(list_line(&task), "- [3] stretch (one-time, status: paused)");
    }

    #[test]
    fn descriptor_schema_lists_actions() {
        let schema = descriptor().parameters.to_string();
        for action in ["schedule", "once", "list", "remove", "clear"] {
            assert!(schema.contains(action), "missing {action}");
        }
    }

    #[test]
    fn blank_description_is_rejected() {
        let err = require_description(Some("   ".into())).unwrap_err();
        assert_eq!(err.kind(), steward_capability::FailureKind::InvalidArguments);
    }
}
