//! Cross-step data hand-off
//!
//! Each task owns one append-only scratchpad. Steps write their full output
//! here so the planner transcript only needs to carry a short summary.
//! Reading a task that has nothing yet returns [`EMPTY_SCRATCHPAD`], never
//! an error.

use crate::plan::{StepId, StepStatus, TaskId};
use dashmap::DashMap;

/// Returned by [`Scratchpad::read`] when a task has no content
pub const EMPTY_SCRATCHPAD: &str = "Scratchpad is empty or doesn't exist yet.";

/// Per-task append-only text store
pub trait Scratchpad: Send + Sync {
    /// Create the task's scratchpad, seeded with the initial request
    fn open(&self, task: TaskId, request: &str);

    /// Full contents, or [`EMPTY_SCRATCHPAD`]
    fn read(&self, task: TaskId) -> String;

    /// Append a block; never overwrites
    fn append(&self, task: TaskId, block: &str);

    /// Drop the task's scratchpad
    fn discard(&self, task: TaskId);
}

/// Heading block for a step result written by the planner
#[must_use]
pub fn step_result_block(step: StepId, status: StepStatus, result: &str) -> String {
    format!("\n### Step {step} result ({status}):\n{result}\n")
}

/// Heading block for data written by a step
#[must_use]
pub fn step_data_block(step: StepId, content: &str) -> String {
    format!("\n#### Step {step} data:\n{content}\n")
}

/// In-memory scratchpad keyed by task
#[derive(Debug, Default)]
pub struct MemoryScratchpad {
    pads: DashMap<TaskId, String>,
}

impl MemoryScratchpad {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live scratchpads
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pads.len()
    }

    /// Check if no scratchpad is live
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }
}

impl Scratchpad for MemoryScratchpad {
    fn open(&self, task: TaskId, request: &str) {
        self.pads.insert(
            task,
            format!("# Task Scratchpad\nInitial request: {request}\n"),
        );
    }

    fn read(&self, task: TaskId) -> String {
        match self.pads.get(&task) {
            Some(text) if !text.is_empty() => text.clone(),
            _ => EMPTY_SCRATCHPAD.to_string(),
        }
    }

    fn append(&self, task: TaskId, block: &str) {
        self.pads.entry(task).or_default().push_str(block);
    }

    fn discard(&self, task: TaskId) {
        self.pads.remove(&task);
    }
}
