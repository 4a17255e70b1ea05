//! The reasoning-role contract and its shared collaborators
//!
//! Both the planner and the step executor satisfy [`Brain`]: given an owner
//! and an input, think until there is text to return. They are composed (the
//! planner owns a step executor) rather than layered through inheritance.

use crate::directive::Directives;
use crate::error::EngineError;
use crate::limits::Limits;
use crate::plan::{StepId, TaskId};
use crate::ports::{CostEntry, Store};
use crate::reasoning::{ReasoningService, Reply};
use crate::scratchpad::Scratchpad;
use crate::status::StatusSink;
use crate::transcript::Message;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use steward_capability::{CapabilityDescriptor, CapabilityRegistry, OwnerId};
use steward_policy::PolicyEngine;
use tokio_util::sync::CancellationToken;

/// A reasoning role
#[async_trait]
pub trait Brain: Send + Sync {
    /// What the role works on
    type Input: Send + 'static;

    /// Think about `input` on behalf of `owner`
    ///
    /// # Errors
    /// Role-specific terminal [`EngineError`]s, including
    /// `EngineError::Cancelled` once `cancel` fires.
    async fn think(
        &self,
        owner: &OwnerId,
        input: Self::Input,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError>;
}

/// One step handed from the planner to the step executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepAssignment {
    /// Task the step belongs to (scratchpad scope)
    pub task: TaskId,
    /// Step id
    pub step: StepId,
    /// What to do
    pub description: String,
    /// Capability whitelist
    pub tools: BTreeSet<String>,
}

/// Collaborators shared by the planner and the step executor
#[derive(Clone)]
pub struct Services {
    /// Reasoning service
    pub reasoning: Arc<dyn ReasoningService>,
    /// Capability catalogue
    pub registry: Arc<CapabilityRegistry>,
    /// Invocation gate
    pub policy: Arc<dyn PolicyEngine>,
    /// Cross-step hand-off
    pub scratchpad: Arc<dyn Scratchpad>,
    /// Persistent store
    pub store: Arc<dyn Store>,
    /// Directive templates
    pub directives: Arc<Directives>,
    /// Loop and timeout bounds
    pub limits: Limits,
    /// Live status channel
    pub status: StatusSink,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("registry", &self.registry)
            .field("directives", &self.directives)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Bundle collaborators with default directives, limits and no status sink
    pub fn new(
        reasoning: Arc<dyn ReasoningService>,
        registry: Arc<CapabilityRegistry>,
        policy: Arc<dyn PolicyEngine>,
        scratchpad: Arc<dyn Scratchpad>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            reasoning,
            registry,
            policy,
            scratchpad,
            store,
            directives: Arc::new(Directives::default()),
            limits: Limits::default(),
            status: StatusSink::disabled(),
        }
    }

    /// Set directives
    #[must_use]
    pub fn with_directives(mut self, directives: Directives) -> Self {
        self.directives = Arc::new(directives);
        self
    }

    /// Set limits
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set status sink
    #[must_use]
    pub fn with_status(mut self, status: StatusSink) -> Self {
        self.status = status;
        self
    }

    /// One reasoning call bounded by the turn timeout and the cancel signal
    pub(crate) async fn reason(
        &self,
        messages: &[Message],
        manifest: &[CapabilityDescriptor],
        cancel: &CancellationToken,
    ) -> Result<Reply, EngineError> {
        let budget = self.limits.turn_timeout;
        tokio::select! {
            () = cancel.cancelled() => Err(EngineError::Cancelled),
            result = tokio::time::timeout(budget, self.reasoning.complete(messages, manifest)) => match result {
                Ok(Ok(reply)) => Ok(reply),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(EngineError::ReasoningTimeout { secs: budget.as_secs() }),
            },
        }
    }

    /// Record the cost of a reply; failures are logged, never fatal
    pub(crate) async fn record_cost(&self, owner: &OwnerId, reply: &Reply) {
        let Some(usage) = reply.usage else {
            return;
        };
        let entry = CostEntry {
            owner: owner.clone(),
            model: reply.model.clone().unwrap_or_else(|| "default".to_string()),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        };
        if let Err(e) = self.store.record_cost(entry).await {
            tracing::warn!(owner = %owner, error = %e, "failed to record reasoning cost");
        }
    }
}
