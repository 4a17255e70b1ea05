//! Error types for Steward Core
//!
//! Two layers:
//! - Collaborator errors ([`ReasoningError`], [`StoreError`], [`TransportError`])
//!   reported by the external ports
//! - [`EngineError`], the orchestration taxonomy. Capability-level failures are
//!   absorbed by the step executor as observations; everything that reaches
//!   `EngineError` terminates a step or a task.
//!
//! Terminal errors never reach the user raw: [`EngineError::diagnostic`] turns
//! each one into a deterministic [`Diagnostic`].

use serde::{Deserialize, Serialize};
use steward_capability::CapabilityError;

/// Errors reported by the reasoning service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReasoningError {
    /// The service could not be reached or rejected the request
    #[error("reasoning service unavailable: {0}")]
    Unavailable(String),

    /// The reply carried neither text nor invocation requests
    #[error("reasoning service returned an empty reply")]
    EmptyReply,
}

/// Errors reported by the persistent store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Referenced record does not exist
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind
        kind: &'static str,
        /// Record id
        id: String,
    },

    /// Backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors reported by the chat transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Delivery failed
    #[error("failed to deliver message to {owner}: {reason}")]
    Delivery {
        /// Recipient
        owner: String,
        /// Why
        reason: String,
    },
}

/// Orchestration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A reasoning call exceeded its per-turn budget
    #[error("reasoning turn timed out after {secs} seconds")]
    ReasoningTimeout {
        /// Budget that was exceeded
        secs: u64,
    },

    /// The reasoning service failed
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),

    /// A plan proposal could not be parsed or violates plan invariants
    #[error("malformed plan proposal: {0}")]
    MalformedPlan(String),

    /// The planner kept reading the scratchpad instead of answering
    #[error("planner exceeded maximum scratchpad read depth ({limit})")]
    ScratchpadRecursion {
        /// Allowed depth
        limit: usize,
    },

    /// A step used every reasoning turn without a final answer
    #[error("exceeded maximum reasoning steps ({limit}) without a final answer")]
    TurnsExhausted {
        /// Turn bound
        limit: usize,
    },

    /// Completed-step count stopped increasing
    #[error("no new completed steps for {stalled} consecutive iterations")]
    Deadlock {
        /// Consecutive iterations without progress
        stalled: usize,
    },

    /// Every step is done but the planner would not conclude
    #[error("all steps completed but no final answer after {attempts} forced turns")]
    ConsolidationExhausted {
        /// Forced turns issued
        attempts: usize,
    },

    /// Top-level iteration bound reached
    #[error("planner iteration budget of {limit} exhausted")]
    BudgetExhausted {
        /// Iteration bound
        limit: usize,
    },

    /// A capability failed; only surfaced for diagnostics
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The task was cancelled
    #[error("task cancelled")]
    Cancelled,
}

impl EngineError {
    /// Check if the error is a controlled abort rather than a failure
    ///
    /// Aborts are the planner giving up deliberately (deadlock, consolidation,
    /// budget); they still produce a deliverable diagnostic.
    #[inline]
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            Self::Deadlock { .. } | Self::ConsolidationExhausted { .. } | Self::BudgetExhausted { .. }
        )
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Capability(e) if e.is_retryable())
    }

    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::ReasoningTimeout { .. } => DiagnosticKind::ReasoningTimeout,
            Self::Reasoning(_) => DiagnosticKind::ReasoningFailure,
            Self::MalformedPlan(_) => DiagnosticKind::MalformedPlan,
            Self::ScratchpadRecursion { .. } => DiagnosticKind::ScratchpadRecursion,
            Self::TurnsExhausted { .. } => DiagnosticKind::TurnsExhausted,
            Self::Deadlock { .. } => DiagnosticKind::Deadlock,
            Self::ConsolidationExhausted { .. } => DiagnosticKind::ConsolidationExhausted,
            Self::BudgetExhausted { .. } => DiagnosticKind::BudgetExhausted,
            Self::Capability(_) => DiagnosticKind::Capability,
            Self::Cancelled => DiagnosticKind::Cancelled,
        }
    }

    /// User-facing diagnostic for a terminal error
    #[must_use]
    pub fn diagnostic(&self) -> Diagnostic {
        let message = match self {
            Self::Deadlock { .. } => "Deadlock detected: the task is not making progress. \
                Several planning turns passed with no new completed steps, so it was aborted."
                .to_string(),
            Self::ConsolidationExhausted { .. } => "All steps completed but the planner failed \
                to produce a final answer. Please try again."
                .to_string(),
            Self::BudgetExhausted { .. } => "I've reached the maximum number of steps for this \
                task. Please try a simpler request."
                .to_string(),
            Self::Cancelled => "Task cancelled.".to_string(),
            other => format!("The task could not be completed: {other}."),
        };
        Diagnostic::new(self.kind(), message)
    }
}

/// Diagnostic classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Reasoning turn timed out
    ReasoningTimeout,
    /// Reasoning service failed
    ReasoningFailure,
    /// Unparsable or invalid plan
    MalformedPlan,
    /// Scratchpad read depth exceeded
    ScratchpadRecursion,
    /// Step turn bound reached
    TurnsExhausted,
    /// No forward progress
    Deadlock,
    /// Planner would not conclude
    ConsolidationExhausted,
    /// Iteration bound reached
    BudgetExhausted,
    /// Capability failure
    Capability,
    /// Cancelled
    Cancelled,
}

impl DiagnosticKind {
    /// Stable label, used for metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReasoningTimeout => "reasoning_timeout",
            Self::ReasoningFailure => "reasoning_failure",
            Self::MalformedPlan => "malformed_plan",
            Self::ScratchpadRecursion => "scratchpad_recursion",
            Self::TurnsExhausted => "turns_exhausted",
            Self::Deadlock => "deadlock",
            Self::ConsolidationExhausted => "consolidation_exhausted",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Capability => "capability",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Deterministic, human-readable account of a terminal failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Classification
    pub kind: DiagnosticKind,
    /// Message delivered to the owner
    pub message: String,
}

impl Diagnostic {
    /// Create new diagnostic
    #[inline]
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// How a task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The planner produced a final answer
    Answer(String),
    /// The planner gave up deliberately
    Aborted(Diagnostic),
    /// A planning-level error ended the task
    Failed(Diagnostic),
    /// The task was cancelled
    Cancelled,
}

impl TaskOutcome {
    /// Fold a planner result into an outcome
    #[must_use]
    pub fn from_result(result: Result<String, EngineError>) -> Self {
        match result {
            Ok(answer) => Self::Answer(answer),
            Err(EngineError::Cancelled) => Self::Cancelled,
            Err(e) if e.is_abort() => Self::Aborted(e.diagnostic()),
            Err(e) => Self::Failed(e.diagnostic()),
        }
    }

    /// Text delivered to the owner
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Answer(text) => text,
            Self::Aborted(d) | Self::Failed(d) => &d.message,
            Self::Cancelled => "Task cancelled.",
        }
    }

    /// Check if the run counts as completed (answer or deliberate abort)
    #[inline]
    #[must_use]
    pub fn is_completed_run(&self) -> bool {
        matches!(self, Self::Answer(_) | Self::Aborted(_))
    }
}
