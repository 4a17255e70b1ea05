//! Step executor
//!
//! Runs one plan step through a bounded reason-act loop:
//! - each turn asks the reasoning service for an answer under a per-turn timeout
//! - free text ends the step; invocation requests are serviced and their
//!   observations appended before the next turn
//! - scratchpad built-ins are serviced inline, without policy or retry
//! - every other invocation passes the policy gate once, then runs with a
//!   per-call timeout and exponential-backoff retry
//!
//! Capability failures never fail the step. They become observation text so
//! the reasoning service can adapt; only reasoning errors, cancellation and
//! turn exhaustion end the step with an error.

use crate::brain::{Brain, Services, StepAssignment};
use crate::error::{EngineError, ReasoningError};
use crate::scratchpad::step_data_block;
use crate::transcript::{InvocationRequest, Message, Transcript};
use async_trait::async_trait;
use steward_capability::builtin::{WriteScratchpadArgs, READ_SCRATCHPAD, WRITE_SCRATCHPAD};
use steward_capability::{CapabilityDescriptor, CapabilityError, InvocationContext, OwnerId};
use steward_policy::PolicyRequest;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Executes single steps on behalf of the planner
#[derive(Debug, Clone)]
pub struct StepExecutor {
    services: Services,
}

impl StepExecutor {
    /// Create executor
    #[inline]
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Shared collaborators
    #[inline]
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Execute one step
    ///
    /// # Returns
    /// The step's free-text result
    ///
    /// # Errors
    /// - `EngineError::ReasoningTimeout` / `EngineError::Reasoning` from a turn
    /// - `EngineError::TurnsExhausted` when no turn produced an answer
    /// - `EngineError::Cancelled`
    pub async fn execute(
        &self,
        owner: &OwnerId,
        assignment: &StepAssignment,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        let span = tracing::info_span!(
            "step",
            owner = %owner,
            task = %assignment.task,
            step = assignment.step
        );
        self.run_turns(owner, assignment, cancel).instrument(span).await
    }

    async fn run_turns(
        &self,
        owner: &OwnerId,
        assignment: &StepAssignment,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        let limits = &self.services.limits;
        let manifest = self.services.registry.manifest(&assignment.tools);
        let ctx = InvocationContext::new(owner.clone());

        let mut transcript =
            Transcript::with_system(self.services.directives.render_worker(owner, assignment.step));
        transcript.push(Message::user(format!("TASK: {}", assignment.description)));

        tracing::info!(tools = ?assignment.tools, "step started");

        for turn in 1..=limits.step_turns {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            let reply = self
                .services
                .reason(transcript.messages(), &manifest, cancel)
                .await?;
            self.services.record_cost(owner, &reply).await;

            if reply.is_final() {
                if reply.text.trim().is_empty() {
                    return Err(ReasoningError::EmptyReply.into());
                }
                tracing::info!(turn, "step answered");
                return Ok(reply.text);
            }

            tracing::debug!(turn, invocations = reply.invocations.len(), "reasoning turn");
            transcript.push(Message::assistant_with(reply.text, reply.invocations.clone()));

            for request in &reply.invocations {
                let observation = self
                    .observe(&ctx, assignment, &manifest, request, cancel)
                    .await?;
                transcript.push(Message::tool(request, observation));
            }
        }

        tracing::warn!(limit = limits.step_turns, "step exhausted its reasoning turns");
        Err(EngineError::TurnsExhausted {
            limit: limits.step_turns,
        })
    }

    /// Service one invocation request, producing its observation text
    async fn observe(
        &self,
        ctx: &InvocationContext,
        assignment: &StepAssignment,
        manifest: &[CapabilityDescriptor],
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        match request.name.as_str() {
            READ_SCRATCHPAD => Ok(self.services.scratchpad.read(assignment.task)),
            WRITE_SCRATCHPAD => Ok(self.write_scratchpad(assignment, &request.arguments)),
            name if !manifest.iter().any(|d| d.name == name) => {
                tracing::warn!(capability = name, "invocation outside the step's manifest");
                Ok(format!("Error: {}", CapabilityError::NotFound(name.to_string())))
            }
            name => self.invoke_guarded(ctx, name, &request.arguments, cancel).await,
        }
    }

    fn write_scratchpad(&self, assignment: &StepAssignment, arguments: &str) -> String {
        match serde_json::from_str::<WriteScratchpadArgs>(arguments) {
            Ok(args) => {
                self.services
                    .scratchpad
                    .append(assignment.task, &step_data_block(assignment.step, &args.content));
                format!("Successfully wrote {} bytes to scratchpad.", args.content.len())
            }
            Err(e) => format!(
                "Error: {}",
                CapabilityError::invalid_arguments(WRITE_SCRATCHPAD, e.to_string())
            ),
        }
    }

    /// Policy gate, then guarded execution
    async fn invoke_guarded(
        &self,
        ctx: &InvocationContext,
        name: &str,
        arguments: &str,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        let request = PolicyRequest::new(name, arguments, ctx.owner.as_str());
        let decision = self.services.policy.evaluate(&request);
        if decision.is_denied() {
            tracing::warn!(capability = name, reason = %decision.reason, "invocation denied by policy");
            metrics::counter!("steward_policy_denials_total", "capability" => name.to_string())
                .increment(1);
            return Ok(format!("Policy Error: {}", decision.reason));
        }

        match self.invoke_with_retry(ctx, name, arguments, cancel).await {
            Ok(text) => {
                metrics::counter!(
                    "steward_capability_invocations_total",
                    "capability" => name.to_string(),
                    "outcome" => "ok"
                )
                .increment(1);
                Ok(text)
            }
            Err(EngineError::Capability(e)) => {
                tracing::warn!(capability = name, kind = e.kind().as_str(), error = %e, "capability failed");
                metrics::counter!(
                    "steward_capability_invocations_total",
                    "capability" => name.to_string(),
                    "outcome" => e.kind().as_str()
                )
                .increment(1);
                Ok(format!("Error: {e}"))
            }
            Err(other) => Err(other),
        }
    }

    /// Execute with per-call timeout and backoff retry
    ///
    /// Timeouts and non-execution failures are not retried. The delay after
    /// failed attempt `n` is `initial_backoff * 2^(n-1)`.
    async fn invoke_with_retry(
        &self,
        ctx: &InvocationContext,
        name: &str,
        arguments: &str,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        let limits = &self.services.limits;
        let retry = limits.retry;
        let mut attempt = 1;

        loop {
            let call = tokio::time::timeout(
                limits.capability_timeout,
                self.services.registry.dispatch(ctx, name, arguments),
            );
            let error = tokio::select! {
                () = cancel.cancelled() => return Err(EngineError::Cancelled),
                result = call => match result {
                    Ok(Ok(text)) => return Ok(text),
                    Ok(Err(e)) => e,
                    Err(_) => CapabilityError::Timeout {
                        name: name.to_string(),
                        secs: limits.capability_timeout.as_secs(),
                    },
                },
            };

            if !error.is_retryable() || attempt >= retry.max_attempts {
                return Err(error.into());
            }

            let delay = retry.backoff(attempt);
            tracing::warn!(
                capability = name,
                attempt,
                max_attempts = retry.max_attempts,
                error = %error,
                ?delay,
                "capability failed, retrying"
            );
            tokio::select! {
                () = cancel.cancelled() => return Err(EngineError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

#[async_trait]
impl Brain for StepExecutor {
    type Input = StepAssignment;

    async fn think(
        &self,
        owner: &OwnerId,
        input: StepAssignment,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        self.execute(owner, &input, cancel).await
    }
}
