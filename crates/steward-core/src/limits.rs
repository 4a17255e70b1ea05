//! Execution bounds
//!
//! Every loop in the engine is bounded. The values here are fixed defaults;
//! only `history_limit` is exposed through configuration.

use std::time::Duration;

/// Capability retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay slept after failed attempt `attempt` (1-based)
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << shift)
    }
}

/// Loop and timeout bounds for planner and step executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Reasoning turns per step
    pub step_turns: usize,
    /// Budget of one reasoning call
    pub turn_timeout: Duration,
    /// Budget of one capability call
    pub capability_timeout: Duration,
    /// Capability retry schedule
    pub retry: RetryPolicy,
    /// Top-level planner iterations
    pub planner_iterations: usize,
    /// Messages kept after the system directive when trimming
    pub recent_messages: usize,
    /// Consecutive iterations without progress before aborting
    pub stall_limit: usize,
    /// Forced consolidation turns before aborting
    pub consolidation_limit: usize,
    /// Planner scratchpad re-polls before failing
    pub scratchpad_read_depth: usize,
    /// Characters of a step result kept in the planner transcript
    pub summary_chars: usize,
    /// Stored messages loaded at task start
    pub history_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            step_turns: 10,
            turn_timeout: Duration::from_secs(120),
            capability_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            planner_iterations: 15,
            recent_messages: 14,
            stall_limit: 4,
            consolidation_limit: 3,
            scratchpad_read_depth: 3,
            summary_chars: 500,
            history_limit: 10,
        }
    }
}

impl Limits {
    /// Set history limit
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}
