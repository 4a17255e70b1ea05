//! Plan state machine
//!
//! PLANNING -> EXECUTE step (repeated) -> CONSOLIDATING -> DONE, or ABORTED.
//!
//! Each iteration:
//! 1. Trim the transcript to the directive plus recent messages
//! 2. Poll the reasoning service for a plan proposal or a final answer,
//!    servicing scratchpad reads inline up to a bounded depth
//! 3. Final text ends the task
//! 4. Merge the proposal into the authoritative plan and enforce tool locks
//! 5. Abort when completed-step count stalls
//! 6. Pick the first pending or failed step
//! 7. With nothing left to do, force a final answer (bounded)
//! 8. Otherwise execute the step and fold a short summary into the transcript

use crate::brain::{Brain, Services, StepAssignment};
use crate::error::{EngineError, ReasoningError, TaskOutcome};
use crate::executor::StepExecutor;
use crate::plan::{propose_plan, Plan, PlanId, StepId, StepStatus, TaskId, PROPOSE_PLAN};
use crate::progress::ProgressTracker;
use crate::scratchpad::step_result_block;
use crate::status::Phase;
use crate::tool_lock::ToolLocks;
use crate::transcript::{summarize, Message, Transcript};
use async_trait::async_trait;
use steward_capability::builtin::{self, READ_SCRATCHPAD};
use steward_capability::OwnerId;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Injected when every step is done but no final answer arrived
pub const CONSOLIDATION_INSTRUCTION: &str = "All planned steps are completed. You MUST now provide \
your final consolidated answer to the user as plain text, NOT as a capability call.";

/// Observation answering an accepted plan proposal
const PLAN_RECEIVED: &str = "Plan received.";

/// Result of one planning poll
#[derive(Debug)]
enum Proposal {
    Plan(Plan),
    Answer(String),
}

/// Drives a task from request to final answer or diagnostic
#[derive(Debug, Clone)]
pub struct Planner {
    services: Services,
    executor: StepExecutor,
}

impl Planner {
    /// Create planner; the step executor shares its collaborators
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self {
            executor: StepExecutor::new(services.clone()),
            services,
        }
    }

    /// Step executor used for each step
    #[inline]
    #[must_use]
    pub fn executor(&self) -> &StepExecutor {
        &self.executor
    }

    /// Shared collaborators
    #[inline]
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run a task to its outcome
    ///
    /// Never fails: planning errors are folded into a diagnostic outcome.
    pub async fn run(&self, owner: &OwnerId, input: &str, cancel: &CancellationToken) -> TaskOutcome {
        TaskOutcome::from_result(self.think(owner, input.to_string(), cancel).await)
    }

    async fn orchestrate(
        &self,
        owner: &OwnerId,
        task: TaskId,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        let limits = &self.services.limits;
        let store = &self.services.store;

        let directive = self
            .services
            .directives
            .render_planner(owner, self.services.registry.descriptors());
        let history = store
            .history(owner, limits.history_limit)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to load history");
                Vec::new()
            });
        let plan_id = match store.save_plan(owner, input).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist plan");
                None
            }
        };

        let mut transcript = Transcript::with_system(directive);
        transcript.extend(history);
        transcript.push(Message::user(input));

        let mut plan = Plan::default();
        let mut locks = ToolLocks::new();
        let mut progress = ProgressTracker::new(limits.stall_limit);
        let mut consolidation = 0;

        for iteration in 1..=limits.planner_iterations {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            transcript.trim_to_recent(limits.recent_messages);
            self.services.status.publish(owner, task, Phase::Planning);

            let mut proposed = match self.poll(owner, task, &mut transcript, cancel).await? {
                Proposal::Answer(answer) => {
                    tracing::info!(iteration, "final answer produced");
                    self.remember(owner, input, &answer).await;
                    return Ok(answer);
                }
                Proposal::Plan(proposed) => proposed,
            };

            proposed.inherit(&plan);
            locks.apply(&mut proposed);
            plan = proposed;
            self.sync(plan_id, &plan).await;

            if progress.observe(plan.completed_count()) {
                tracing::warn!(iteration, stalled = progress.stalled(), "deadlock detected");
                return Err(EngineError::Deadlock {
                    stalled: progress.stalled(),
                });
            }

            let Some(next) = plan.next_actionable().cloned() else {
                consolidation += 1;
                if consolidation >= limits.consolidation_limit {
                    return Err(EngineError::ConsolidationExhausted {
                        attempts: consolidation,
                    });
                }
                tracing::info!(iteration, consolidation, "all steps completed, forcing final answer");
                self.services.status.publish(owner, task, Phase::Consolidating);
                transcript.push(Message::user(CONSOLIDATION_INSTRUCTION));
                continue;
            };
            consolidation = 0;

            tracing::info!(iteration, step = next.id, description = %next.description, "executing step");
            self.services.status.publish(
                owner,
                task,
                Phase::Executing {
                    step: next.id,
                    description: next.description.clone(),
                },
            );

            let assignment = StepAssignment {
                task,
                step: next.id,
                description: next.description.clone(),
                tools: next.tools.clone(),
            };
            let (status, result) = match self.executor.execute(owner, &assignment, cancel).await {
                Ok(text) => (StepStatus::Completed, text),
                Err(EngineError::Cancelled) => {
                    let result = "Cancelled before the step finished.";
                    self.record_step(task, plan_id, &mut plan, next.id, StepStatus::Failed, result)
                        .await;
                    return Err(EngineError::Cancelled);
                }
                Err(e) => {
                    tracing::warn!(step = next.id, error = %e, "step failed");
                    locks.release(next.id);
                    (StepStatus::Failed, format!("Error: {e}"))
                }
            };
            self.record_step(task, plan_id, &mut plan, next.id, status, &result)
                .await;

            transcript.push(Message::assistant(format!(
                "Plan updated. Executed step {}.",
                next.id
            )));
            transcript.push(Message::user(format!(
                "Step {} result: {}\nOutput: {}\n\nFull details are in the scratchpad. \
                 Please update the plan or provide the final answer.",
                next.id,
                status,
                summarize(&result, limits.summary_chars)
            )));
        }

        Err(EngineError::BudgetExhausted {
            limit: limits.planner_iterations,
        })
    }

    /// Ask for a plan update or a final answer
    async fn poll(
        &self,
        owner: &OwnerId,
        task: TaskId,
        transcript: &mut Transcript,
        cancel: &CancellationToken,
    ) -> Result<Proposal, EngineError> {
        let manifest = [propose_plan(), builtin::read_scratchpad()];
        let limit = self.services.limits.scratchpad_read_depth;
        let mut depth = 0;

        loop {
            let reply = self
                .services
                .reason(transcript.messages(), &manifest, cancel)
                .await?;
            self.services.record_cost(owner, &reply).await;

            if reply.is_final() {
                if reply.text.trim().is_empty() {
                    return Err(ReasoningError::EmptyReply.into());
                }
                return Ok(Proposal::Answer(reply.text));
            }

            transcript.push(Message::assistant_with(
                reply.text.clone(),
                reply.invocations.clone(),
            ));

            // reads are answered before the proposal so every request has a response
            let mut read = false;
            for request in reply.invocations.iter().filter(|r| r.name != PROPOSE_PLAN) {
                let observation = if request.name == READ_SCRATCHPAD {
                    read = true;
                    self.services.scratchpad.read(task)
                } else {
                    format!(
                        "Error: capability '{}' is not available while planning",
                        request.name
                    )
                };
                transcript.push(Message::tool(request, observation));
            }

            if let Some(request) = reply.invocations.iter().find(|r| r.name == PROPOSE_PLAN) {
                let plan = Plan::from_proposal(&request.arguments)?;
                transcript.push(Message::tool(request, PLAN_RECEIVED));
                tracing::debug!(steps = plan.steps.len(), "plan proposal accepted");
                return Ok(Proposal::Plan(plan));
            }

            if !read {
                // stray calls only: accompanying text is the answer
                if reply.text.trim().is_empty() {
                    return Err(EngineError::MalformedPlan(
                        "planner provided neither a plan nor a text response".to_string(),
                    ));
                }
                tracing::debug!("planner replied with unavailable capabilities, using its text");
                return Ok(Proposal::Answer(reply.text));
            }

            depth += 1;
            if depth > limit {
                return Err(EngineError::ScratchpadRecursion { limit });
            }
            tracing::debug!(depth, "planner consulted the scratchpad, polling again");
        }
    }

    async fn record_step(
        &self,
        task: TaskId,
        plan_id: Option<PlanId>,
        plan: &mut Plan,
        step: StepId,
        status: StepStatus,
        result: &str,
    ) {
        if let Some(entry) = plan.step_mut(step) {
            entry.status = status;
            entry.result = result.to_string();
        }
        self.services
            .scratchpad
            .append(task, &step_result_block(step, status, result));
        self.sync(plan_id, plan).await;
    }

    async fn sync(&self, plan_id: Option<PlanId>, plan: &Plan) {
        let Some(id) = plan_id else {
            return;
        };
        if let Err(e) = self.services.store.sync_plan_steps(id, &plan.steps).await {
            tracing::warn!(plan = %id, error = %e, "failed to sync plan steps");
        }
    }

    /// Persist the finished exchange to the owner's history
    async fn remember(&self, owner: &OwnerId, input: &str, answer: &str) {
        for message in [Message::user(input), Message::assistant(answer)] {
            if let Err(e) = self.services.store.append_message(owner, message).await {
                tracing::warn!(error = %e, "failed to store message");
            }
        }
    }
}

#[async_trait]
impl Brain for Planner {
    type Input = String;

    async fn think(
        &self,
        owner: &OwnerId,
        input: String,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        let task = TaskId::new();
        let span = tracing::info_span!("task", owner = %owner, task = %task);

        async {
            self.services.scratchpad.open(task, &input);
            let result = self.orchestrate(owner, task, &input, cancel).await;
            self.services.scratchpad.discard(task);
            self.services.status.publish(owner, task, Phase::Idle);

            if let Err(e) = &result {
                let kind = e.kind();
                tracing::warn!(kind = kind.as_str(), error = %e, "task ended without an answer");
                metrics::counter!("steward_planner_aborts_total", "kind" => kind.as_str())
                    .increment(1);
            }
            result
        }
        .instrument(span)
        .await
    }
}
