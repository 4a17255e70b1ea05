//! Steward Kernel - wiring and entry points
//!
//! Everything needed to run the orchestration engine as a service:
//! - [`Engine`] - single entry point for interactive and scheduled triggers,
//!   serialised per owner
//! - [`Scheduler`] - timer-driven re-entry for due scheduled tasks
//! - [`Runtime`] - starts the scheduler when enabled and handles shutdown
//! - [`MemoryStore`] - in-process [`steward_core::Store`], re-exported from core
//! - [`capabilities`] - `schedule_task`
//! - [`StewardConfig`] - TOML configuration and prompt loading
//! - [`init_tracing`] - subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use steward_kernel::prelude::*;
//!
//! let config = StewardConfig::load(Path::new("steward.toml"))?;
//! let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
//! let mut registry = CapabilityRegistry::new();
//! register_kernel(&mut registry, store.clone(), &config.scheduler)?;
//!
//! let services = Services::new(reasoning, Arc::new(registry), Arc::new(config.policy_engine()?),
//!     Arc::new(MemoryScratchpad::new()), store)
//!     .with_directives(config.directives()?)
//!     .with_limits(config.limits());
//! let engine = Arc::new(Engine::new(Planner::new(services), transport));
//!
//! let runtime = Runtime::start(engine.clone(), &config.scheduler, cancel.clone());
//! engine.handle_message(OwnerId::from("chat-42"), "What's on my calendar?", &cancel).await;
//! runtime.run_until_ctrl_c().await;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod capabilities;
pub mod config;
pub mod engine;
pub mod logging;
pub mod runtime;
pub mod scheduler;

pub use capabilities::{register_kernel, ScheduleTaskCapability, SCHEDULE_TASK};
pub use config::{ConfigError, EngineConfig, LoggingConfig, SchedulerConfig, StewardConfig};
pub use engine::{scheduled_instruction, Engine, Trigger, TriggerSource};
pub use logging::init_tracing;
pub use runtime::Runtime;
pub use scheduler::{Scheduler, SCHEDULED_BANNER, TICK};
pub use steward_core::MemoryStore;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for embedding the kernel
    pub use crate::{
        init_tracing, register_kernel, Engine, MemoryStore, Runtime, Scheduler, StewardConfig,
        Trigger,
    };
    pub use steward_core::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
