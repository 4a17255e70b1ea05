//! Capability contract and descriptors

use crate::error::CapabilityError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of the conversation/user a task runs on behalf of
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create owner ID
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OwnerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Public description of a capability: what the reasoning service sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique name used for dispatch
    pub name: String,
    /// One-line description offered to the reasoning service
    pub description: String,
    /// JSON schema of the argument object
    pub parameters: Value,
}

impl CapabilityDescriptor {
    /// Create descriptor from an explicit schema
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Create descriptor whose schema is derived from a typed argument struct
    pub fn for_args<T: JsonSchema>(name: impl Into<String>, description: impl Into<String>) -> Self {
        let schema = schemars::schema_for!(T);
        let parameters = serde_json::to_value(schema)
            .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
        Self::new(name, description, parameters)
    }
}

/// Per-invocation context handed to a capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// Owner of the task that issued the invocation
    pub owner: OwnerId,
}

impl InvocationContext {
    /// Create context for an owner
    #[inline]
    #[must_use]
    pub fn new(owner: OwnerId) -> Self {
        Self { owner }
    }
}

/// An invocable action.
///
/// Implementations receive arguments that already passed schema validation
/// at the registry boundary. Failures are reported as [`CapabilityError`];
/// the caller decides whether to retry.
#[async_trait::async_trait]
pub trait Capability: Send + Sync {
    /// Descriptor (name, description, schema)
    fn descriptor(&self) -> &CapabilityDescriptor;

    /// Run the capability
    async fn invoke(&self, ctx: &InvocationContext, args: Value) -> Result<String, CapabilityError>;

    /// Name shortcut
    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

/// Decode validated arguments into the capability's typed form
///
/// # Errors
/// Returns `CapabilityError::InvalidArguments` if the value does not
/// deserialize into `T`.
pub fn decode_args<T: DeserializeOwned>(name: &str, args: Value) -> Result<T, CapabilityError> {
    serde_json::from_value(args).map_err(|e| CapabilityError::invalid_arguments(name, e.to_string()))
}
