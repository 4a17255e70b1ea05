//! Kernel-provided capabilities
//!
//! Capabilities that need the engine's own ports (the store) rather than an
//! external system.

pub mod schedule;

pub use schedule::{ScheduleAction, ScheduleTaskArgs, ScheduleTaskCapability, SCHEDULE_TASK};

use crate::config::SchedulerConfig;
use std::sync::Arc;
use steward_capability::{CapabilityRegistry, RegistryError};
use steward_core::Store;

/// Register the kernel capabilities into `registry`
///
/// # Errors
/// `RegistryError` if a name is already taken.
pub fn register_kernel(
    registry: &mut CapabilityRegistry,
    store: Arc<dyn Store>,
    scheduler: &SchedulerConfig,
) -> Result<(), RegistryError> {
    registry.register(Arc::new(ScheduleTaskCapability::new(
        store,
        scheduler.min_interval_secs,
    )))
}
