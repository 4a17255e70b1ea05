//! Steward Core - plan-and-execute orchestration
//!
//! The engine that turns a request into a final answer or a diagnosed failure:
//! - [`Planner`] drives the plan state machine with bounded iterations,
//!   deadlock detection, tool locks and forced consolidation
//! - [`StepExecutor`] runs one step through a bounded reason-act loop with
//!   policy-gated, timeout-guarded, retried capability invocations
//! - [`Scratchpad`] carries full step output between steps of one task
//! - [`Store`], [`Transport`] and [`ReasoningService`] are the external ports;
//!   [`MemoryStore`] is an in-process [`Store`]
//!
//! # Example
//!
//! ```rust,ignore
//! use steward_core::prelude::*;
//!
//! let services = Services::new(reasoning, registry, policy, scratchpad, store);
//! let planner = Planner::new(services);
//!
//! let outcome = planner
//!     .run(&OwnerId::from("chat-42"), "Find three flights to Lisbon", &CancellationToken::new())
//!     .await;
//! println!("{}", outcome.message());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod brain;
pub mod directive;
pub mod error;
pub mod executor;
pub mod limits;
pub mod plan;
pub mod planner;
pub mod ports;
pub mod progress;
pub mod reasoning;
pub mod scratchpad;
pub mod status;
pub mod store;
pub mod tool_lock;
pub mod transcript;

pub use brain::{Brain, Services, StepAssignment};
pub use directive::Directives;
pub use error::{
    Diagnostic, DiagnosticKind, EngineError, ReasoningError, StoreError, TaskOutcome,
    TransportError,
};
pub use executor::StepExecutor;
pub use limits::{Limits, RetryPolicy};
pub use plan::{Plan, PlanId, PlanRecord, Step, StepId, StepStatus, TaskId, PROPOSE_PLAN};
pub use planner::{Planner, CONSOLIDATION_INSTRUCTION};
pub use ports::{
    CostEntry, NewScheduledTask, ScheduleStatus, ScheduledTask, ScheduledTaskId, Store, Transport,
};
pub use progress::ProgressTracker;
pub use reasoning::{ReasoningService, Reply, TokenUsage};
pub use scratchpad::{MemoryScratchpad, Scratchpad, EMPTY_SCRATCHPAD};
pub use status::{Phase, StatusEvent, StatusSink};
pub use store::MemoryStore;
pub use tool_lock::ToolLocks;
pub use transcript::{InvocationRequest, Message, Role, Transcript};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wiring and running the engine
    pub use crate::{
        Brain, Directives, EngineError, Limits, MemoryScratchpad, MemoryStore, Planner, Services,
        StatusSink, StepExecutor, Store, TaskOutcome, Transport,
    };
    pub use steward_capability::{CapabilityRegistry, OwnerId};
    pub use tokio_util::sync::CancellationToken;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
