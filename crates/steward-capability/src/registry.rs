//! Capability registry
//!
//! Provides [`CapabilityRegistry`] for registering capabilities, building the
//! manifest offered to the reasoning service and dispatching invocations.

use crate::builtin;
use crate::descriptor::{Capability, CapabilityDescriptor, InvocationContext};
use crate::error::{CapabilityError, RegistryError};
use indexmap::IndexMap;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

struct Entry {
    capability: Arc<dyn Capability>,
    validator: JSONSchema,
}

/// Name-keyed catalogue of invocable capabilities
///
/// Registration order is preserved so manifests are deterministic.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: IndexMap<String, Entry>,
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

impl CapabilityRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Register a capability
    ///
    /// The parameter schema is compiled here, so a malformed schema fails at
    /// registration rather than on first use.
    ///
    /// # Errors
    /// - `RegistryError::ReservedName` for the built-in scratchpad names
    /// - `RegistryError::DuplicateName` if the name is taken
    /// - `RegistryError::InvalidSchema` if the schema does not compile
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<(), RegistryError> {
        let descriptor = capability.descriptor();
        let name = descriptor.name.clone();

        if builtin::is_builtin(&name) {
            return Err(RegistryError::ReservedName(name));
        }
        if self.entries.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        let validator = JSONSchema::compile(&descriptor.parameters).map_err(|e| {
            RegistryError::InvalidSchema {
                name: name.clone(),
                details: e.to_string(),
            }
        })?;

        tracing::debug!(capability = %name, "registered capability");
        self.entries.insert(
            name,
            Entry {
                capability,
                validator,
            },
        );
        Ok(())
    }

    /// Look up a descriptor by name
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.entries.get(name).map(|e| e.capability.descriptor())
    }

    /// Get the capability itself
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries.get(name).map(|e| Arc::clone(&e.capability))
    }

    /// Check if a capability is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Descriptors of every registered capability (built-ins excluded)
    pub fn descriptors(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.entries.values().map(|e| e.capability.descriptor())
    }

    /// Number of registered capabilities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Manifest offered for one step: the whitelisted capabilities that are
    /// registered, followed by the built-in scratchpad pair.
    ///
    /// Unknown whitelist names are skipped silently; an empty whitelist yields
    /// the built-ins only.
    #[must_use]
    pub fn manifest(&self, whitelist: &BTreeSet<String>) -> Vec<CapabilityDescriptor> {
        let mut manifest: Vec<CapabilityDescriptor> = self
            .descriptors()
            .filter(|d| whitelist.contains(&d.name))
            .cloned()
            .collect();
        manifest.extend(builtin::descriptors());
        manifest
    }

    /// Validate an argument value against a capability's schema
    ///
    /// # Errors
    /// - `CapabilityError::NotFound` if the name is not registered
    /// - `CapabilityError::InvalidArguments` listing every schema violation
    pub fn validate(&self, name: &str, args: &Value) -> Result<(), CapabilityError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| CapabilityError::NotFound(name.to_string()))?;

        if let Err(errors) = entry.validator.validate(args) {
            let details: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(CapabilityError::invalid_arguments(name, details.join("; ")));
        }
        Ok(())
    }

    /// Parse, validate and dispatch an invocation
    ///
    /// `raw_args` is the argument blob produced by the reasoning service. An
    /// empty blob is treated as an empty object.
    ///
    /// # Errors
    /// Any [`CapabilityError`]: unknown name, unparsable or schema-violating
    /// arguments, or the capability's own failure.
    pub async fn dispatch(
        &self,
        ctx: &InvocationContext,
        name: &str,
        raw_args: &str,
    ) -> Result<String, CapabilityError> {
        let capability = self
            .get(name)
            .ok_or_else(|| CapabilityError::NotFound(name.to_string()))?;

        let args = parse_blob(name, raw_args)?;
        self.validate(name, &args)?;

        capability.invoke(ctx, args).await
    }
}

fn parse_blob(name: &str, raw_args: &str) -> Result<Value, CapabilityError> {
    let trimmed = raw_args.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(trimmed)
        .map_err(|e| CapabilityError::invalid_arguments(name, format!("malformed JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::OwnerId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Echo {
        descriptor: CapabilityDescriptor,
    }

    impl Echo {
        fn new(name: &str) -> Self {
            Self {
                descriptor: CapabilityDescriptor::new(
                    name,
                    "Echo the text argument",
                    json!({
                        "type": "object",
                        "properties": { "text": { "type": "string" } },
                        "required": ["text"]
                    }),
                ),
            }
        }
    }

    #[async_trait::async_trait]
    impl Capability for Echo {
        fn descriptor(&self) -> &CapabilityDescriptor {
            &self.descriptor
        }

        async fn invoke(&self, ctx: &InvocationContext, args: Value) -> Result<String, CapabilityError> {
            Ok(format!("{}: {}", ctx.owner, args["text"].as_str().unwrap_or_default()))
        }
    }

    fn registry_with(names: &[&str]) -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        for name in names {
            registry.register(Arc::new(Echo::new(name))).unwrap();
        }
        registry
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new(OwnerId::from("owner-1"))
    }

    #[test]
    fn register_rejects_duplicates_and_reserved_names() {
        let mut registry = registry_with(&["echo"]);

        let dup = registry.register(Arc::new(Echo::new("echo")));
        assert!(matches!(dup, Err(RegistryError::DuplicateName(_))));

        let reserved = registry.register(Arc::new(Echo::new("read_scratchpad")));
        assert!(matches!(reserved, Err(RegistryError::ReservedName(_))));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_rejects_uncompilable_schema() {
        let mut registry = CapabilityRegistry::new();
        let mut bad = Echo::new("bad");
        bad.descriptor.parameters = json!({ "type": 17 });

        let result = registry.register(Arc::new(bad));
        assert!(matches!(result, Err(RegistryError::InvalidSchema { .. })));
    }

    #[test]
    fn manifest_is_whitelist_plus_builtins() {
        let registry = registry_with(&["search", "shell", "browser"]);
        let whitelist: BTreeSet<String> = ["browser", "search", "unknown"].iter().map(|s| s.to_string()).collect();

        let names: Vec<String> = registry.manifest(&whitelist).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["search", "browser", "read_scratchpad", "write_scratchpad"]);
    }

    #[test]
    fn empty_whitelist_offers_builtins_only() {
        let registry = registry_with(&["search"]);
        let names: Vec<String> = registry.manifest(&BTreeSet::new()).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["read_scratchpad", "write_scratchpad"]);
    }

    #[tokio::test]
    async fn dispatch_validates_before_invoking() {
        let registry = registry_with(&["echo"]);

        let ok = registry.dispatch(&ctx(), "echo", r#"{"text":"hi"}"#).await;
        assert_eq!(ok.unwrap(), "owner-1: hi");

        let missing = registry.dispatch(&ctx(), "echo", "{}").await.unwrap_err();
        assert!(matches!(missing, CapabilityError::InvalidArguments { .. }));

        let malformed = registry.dispatch(&ctx(), "echo", "{not json").await.unwrap_err();
        assert!(malformed.to_string().contains("malformed JSON"));

        let unknown = registry.dispatch(&ctx(), "nope", "{}").await.unwrap_err();
        assert_eq!(unknown, CapabilityError::NotFound("nope".into()));
    }
}
