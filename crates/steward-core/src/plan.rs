//! Plan model
//!
//! A [`Plan`] is an ordered list of [`Step`]s proposed by the reasoning
//! service through the `propose_plan` invocation. The planner owns the
//! authoritative copy: proposals are merged into it so a completed step never
//! moves backward.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use steward_capability::{CapabilityDescriptor, OwnerId};
use ulid::Ulid;

use crate::error::EngineError;

/// Name of the planner's structured proposal invocation
pub const PROPOSE_PLAN: &str = "propose_plan";

/// Step identifier, unique within one plan
pub type StepId = u32;

/// Unique task identifier (one planner run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Ulid);

impl TaskId {
    /// Generate new task ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted plan identifier, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanId(pub u64);

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "plan_{}", self.0)
    }
}

/// Step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not yet executed
    Pending,
    /// Executed successfully
    Completed,
    /// Execution failed; eligible for retry
    Failed,
}

impl StepStatus {
    /// Lowercase label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Identifier within the plan
    pub id: StepId,
    /// What to do
    pub description: String,
    /// Current status
    pub status: StepStatus,
    /// Result text (empty until executed)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result: String,
    /// Capabilities the step may use
    #[serde(default)]
    pub tools: BTreeSet<String>,
}

impl Step {
    /// Create a pending step
    pub fn pending<I, S>(id: StepId, description: impl Into<String>, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            description: description.into(),
            status: StepStatus::Pending,
            result: String::new(),
            tools: tools.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if the step can be picked for execution
    #[inline]
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        matches!(self.status, StepStatus::Pending | StepStatus::Failed)
    }
}

/// Ordered sequence of steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Steps in plan order
    pub steps: Vec<Step>,
}

impl Plan {
    /// Parse a `propose_plan` argument blob
    ///
    /// # Errors
    /// `EngineError::MalformedPlan` if the blob does not match the proposal
    /// schema or reuses a step id.
    pub fn from_proposal(raw: &str) -> Result<Self, EngineError> {
        let proposal: PlanProposal = serde_json::from_str(raw)
            .map_err(|e| EngineError::MalformedPlan(e.to_string()))?;
        let plan = Self::from(proposal);
        plan.validate()?;
        Ok(plan)
    }

    /// Check plan invariants
    ///
    /// # Errors
    /// `EngineError::MalformedPlan` on a duplicate step id.
    pub fn validate(&self) -> Result<(), EngineError> {
        let mut seen = HashSet::with_capacity(self.steps.len());
        for step in &self.steps {
            if !seen.insert(step.id) {
                return Err(EngineError::MalformedPlan(format!(
                    "duplicate step id {}",
                    step.id
                )));
            }
        }
        Ok(())
    }

    /// Number of completed steps
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    /// First pending or failed step, in plan order
    #[must_use]
    pub fn next_actionable(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.is_actionable())
    }

    /// Mutable access to a step
    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Carry executed state over from the previous authoritative plan
    ///
    /// A step recorded as completed stays completed, whatever the proposal
    /// says, and results the proposal omits are kept.
    pub fn inherit(&mut self, previous: &Plan) {
        for step in &mut self.steps {
            let Some(prior) = previous.steps.iter().find(|p| p.id == step.id) else {
                continue;
            };
            if prior.status == StepStatus::Completed && step.status != StepStatus::Completed {
                tracing::debug!(step = step.id, proposed = %step.status, "keeping completed status");
                step.status = StepStatus::Completed;
            }
            if step.result.is_empty() {
                step.result.clone_from(&prior.result);
            }
        }
    }
}

/// Typed arguments of `propose_plan`
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PlanProposal {
    /// The full, updated plan
    pub steps: Vec<ProposedStep>,
}

/// One step of a proposal
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProposedStep {
    /// Step id, unique within the plan
    pub id: StepId,
    /// What the step must achieve
    pub description: String,
    /// Current status
    pub status: StepStatus,
    /// Capabilities the step may use
    #[serde(default)]
    pub tools: Vec<String>,
}

impl From<PlanProposal> for Plan {
    fn from(proposal: PlanProposal) -> Self {
        Self {
            steps: proposal
                .steps
                .into_iter()
                .map(|s| Step {
                    id: s.id,
                    description: s.description,
                    status: s.status,
                    result: String::new(),
                    tools: s.tools.into_iter().collect(),
                })
                .collect(),
        }
    }
}

/// Descriptor offered to the planner for plan proposals
#[must_use]
pub fn propose_plan() -> CapabilityDescriptor {
    CapabilityDescriptor::for_args::<PlanProposal>(
        PROPOSE_PLAN,
        "Submit or update a structured plan consisting of multiple steps.",
    )
}

/// Persisted record of a plan's step list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    /// Store id
    pub id: PlanId,
    /// Owner the plan belongs to
    pub owner: OwnerId,
    /// Goal text that started the task
    pub goal: String,
    /// Latest synced steps
    pub steps: Vec<Step>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn proposal_parses_with_missing_tools() {
        let plan = Plan::from_proposal(
            r#"{"steps":[{"id":1,"description":"search","status":"pending","tools":["web_search"]},
                         {"id":2,"description":"summarize","status":"pending"}]}"#,
        )
        .unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert!(plan.steps[1].tools.is_empty());
        assert_eq!(plan.next_actionable().map(|s| s.id), Some(1));
    }

    #[test]
    fn duplicate_ids_are_malformed() {
        let err = Plan::from_proposal(
            r#"{"steps":[{"id":1,"description":"a","status":"pending"},
                         {"id":1,"description":"b","status":"pending"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err, EngineError::MalformedPlan("duplicate step id 1".into()));
    }

    #[test]
    fn unknown_status_is_malformed() {
        let err = Plan::from_proposal(
            r#"{"steps":[{"id":1,"description":"a","status":"in_progress"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MalformedPlan(_)));
    }

    #[test]
    fn failed_steps_are_actionable() {
        let mut plan = Plan {
            steps: vec![Step::pending(1, "a", ["x"]), Step::pending(2, "b", ["y"])],
        };
        plan.steps[0].status = StepStatus::Completed;
        plan.steps[1].status = StepStatus::Failed;
        assert_eq!(plan.completed_count(), 1);
        assert_eq!(plan.next_actionable().map(|s| s.id), Some(2));
    }

    #[test]
    fn completed_never_moves_backward() {
        let mut previous = Plan {
            steps: vec![Step::pending(1, "a", ["x"])],
        };
        previous.steps[0].status = StepStatus::Completed;
        previous.steps[0].result = "found it".into();

        let mut proposal = Plan {
            steps: vec![Step::pending(1, "a", ["x"]), Step::pending(2, "b", ["y"])],
        };
        proposal.inherit(&previous);

        assert_eq!(proposal.steps[0].status, StepStatus::Completed);
        assert_eq!(proposal.steps[0].result, "found it");
        assert_eq!(proposal.steps[1].status, StepStatus::Pending);
    }

    #[test]
    fn failed_step_may_be_reproposed_as_pending() {
        let mut previous = Plan {
            steps: vec![Step::pending(1, "a", ["x"])],
        };
        previous.steps[0].status = StepStatus::Failed;

        let mut proposal = Plan {
            steps: vec![Step::pending(1, "a", ["z"])],
        };
        proposal.inherit(&previous);
        assert_eq!(proposal.steps[0].status, StepStatus::Pending);
    }

    #[test]
    fn proposal_schema_lists_steps() {
        let descriptor = propose_plan();
        assert_eq!(descriptor.name, PROPOSE_PLAN);
        assert!(descriptor.parameters["properties"]["steps"].is_object());
    }
}
