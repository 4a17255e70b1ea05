//! Steward Capability Catalogue
//!
//! Every action the execution loop may take is a *capability*: a named,
//! schema-described operation exposed through one uniform contract.
//!
//! - [`Capability`] - the invocation contract implemented by concrete actions
//! - [`CapabilityDescriptor`] - name, description and JSON parameter schema
//! - [`CapabilityRegistry`] - name-keyed catalogue, manifest builder and dispatcher
//! - [`builtin`] - the scratchpad pair that every step is always offered
//!
//! Arguments arrive from the reasoning service as loosely-typed JSON blobs.
//! The registry validates each blob against the capability's declared schema
//! before dispatch, so a capability only ever sees arguments that match its
//! declaration.
//!
//! # Example
//!
//! ```rust,ignore
//! use steward_capability::{CapabilityRegistry, InvocationContext, OwnerId};
//!
//! let mut registry = CapabilityRegistry::new();
//! registry.register(Arc::new(MyCapability::default()))?;
//!
//! let ctx = InvocationContext::new(OwnerId::from("chat-42"));
//! let text = registry.dispatch(&ctx, "my_capability", r#"{"query":"rust"}"#).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod builtin;
pub mod descriptor;
pub mod error;
pub mod registry;

pub use descriptor::{decode_args, Capability, CapabilityDescriptor, InvocationContext, OwnerId};
pub use error::{CapabilityError, FailureKind, RegistryError};
pub use registry::CapabilityRegistry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for implementing and registering capabilities
    pub use crate::builtin::{READ_SCRATCHPAD, WRITE_SCRATCHPAD};
    pub use crate::descriptor::{
        decode_args, Capability, CapabilityDescriptor, InvocationContext, OwnerId,
    };
    pub use crate::error::{CapabilityError, FailureKind, RegistryError};
    pub use crate::registry::CapabilityRegistry;
}
