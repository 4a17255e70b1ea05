//! Capability grants per step
//!
//! The first non-empty tool set seen for a pending step is locked. Later
//! proposals may not widen it while the step stays pending or is merely
//! declared failed. Only a failure the executor recorded releases the lock,
//! so a re-plan can then assign different tools.

use crate::plan::{Plan, StepId, StepStatus};
use std::collections::{BTreeSet, HashMap};

/// Locked tool sets keyed by step id
#[derive(Debug, Clone, Default)]
pub struct ToolLocks {
    locks: HashMap<StepId, BTreeSet<String>>,
}

impl ToolLocks {
    /// Create empty lock table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enforce locks on a freshly proposed plan
    ///
    /// - locked step, pending or failed: tool set forced back to the locked value
    /// - pending step seen for the first time with tools: locked
    /// - completed step: untouched
    ///
    /// A proposal cannot unlock a step by declaring it failed; call
    /// [`ToolLocks::release`] when the executor actually fails it.
    pub fn apply(&mut self, plan: &mut Plan) {
        for step in &mut plan.steps {
            if step.status == StepStatus::Completed {
                continue;
            }
            if let Some(locked) = self.locks.get(&step.id) {
                if step.tools != *locked {
                    tracing::warn!(
                        step = step.id,
                        status = %step.status,
                        proposed = ?step.tools,
                        locked = ?locked,
                        "tool set change rejected for locked step"
                    );
                    step.tools.clone_from(locked);
                }
            } else if step.status == StepStatus::Pending && !step.tools.is_empty() {
                self.locks.insert(step.id, step.tools.clone());
            }
        }
    }

    /// Release a step's lock
    pub fn release(&mut self, id: StepId) -> bool {
        self.locks.remove(&id).is_some()
    }

    /// Locked tool set of a step
    #[must_use]
    pub fn get(&self, id: StepId) -> Option<&BTreeSet<String>> {
        self.locks.get(&id)
    }

    /// Number of locked steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Check if no step is locked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
