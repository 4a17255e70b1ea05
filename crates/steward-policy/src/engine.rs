//! Policy evaluation

use crate::config::{PolicyConfig, DEFAULT_DENIED_PATTERNS};
use crate::error::PolicyError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// The invocation may run
    Allow,
    /// The invocation must not run
    Deny,
}

/// A proposed capability invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRequest {
    /// Capability name
    pub capability: String,
    /// Serialized argument blob, exactly as the reasoning service produced it
    pub arguments: String,
    /// Owner of the task issuing the invocation
    pub owner: String,
}

impl PolicyRequest {
    /// Create request
    pub fn new(
        capability: impl Into<String>,
        arguments: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            capability: capability.into(),
            arguments: arguments.into(),
            owner: owner.into(),
        }
    }
}

/// Evaluation result: an effect plus a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Allow or deny
    pub effect: Effect,
    /// Why
    pub reason: String,
}

impl PolicyDecision {
    /// Allow with reason
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            effect: Effect::Allow,
            reason: reason.into(),
        }
    }

    /// Deny with reason
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            effect: Effect::Deny,
            reason: reason.into(),
        }
    }

    /// Check if denied
    #[inline]
    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.effect == Effect::Deny
    }
}

/// Gate consulted before every capability invocation
pub trait PolicyEngine: Send + Sync {
    /// Evaluate a request. Total: always returns exactly one decision.
    fn evaluate(&self, request: &PolicyRequest) -> PolicyDecision;
}

/// Deny-list plus ordered argument patterns
#[derive(Debug, Clone, Default)]
pub struct RulePolicyEngine {
    denied_capabilities: BTreeSet<String>,
    denied_patterns: Vec<Regex>,
}

impl RulePolicyEngine {
    /// Create an engine that allows everything
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine preloaded with the destructive-command patterns
    #[must_use]
    pub fn with_default_rules() -> Self {
        let mut engine = Self::new();
        for pattern in DEFAULT_DENIED_PATTERNS {
            if let Ok(re) = Regex::new(pattern) {
                engine.denied_patterns.push(re);
            }
        }
        engine
    }

    /// Build from configuration
    ///
    /// # Errors
    /// Fails on the first pattern that does not compile or on an empty name.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, PolicyError> {
        let mut engine = if config.include_default_rules {
            Self::with_default_rules()
        } else {
            Self::new()
        };
        for name in &config.denied_capabilities {
            if name.trim().is_empty() {
                return Err(PolicyError::EmptyCapabilityName);
            }
            engine.deny_capability(name.trim());
        }
        for pattern in &config.denied_argument_patterns {
            engine.deny_arguments(pattern)?;
        }
        Ok(engine)
    }

    /// Add a capability to the deny list
    pub fn deny_capability(&mut self, name: impl Into<String>) {
        self.denied_capabilities.insert(name.into());
    }

    /// Append an argument pattern
    ///
    /// # Errors
    /// `PolicyError::InvalidPattern` if the pattern does not compile; the
    /// engine is left unchanged.
    pub fn deny_arguments(&mut self, pattern: &str) -> Result<(), PolicyError> {
        let re = Regex::new(pattern).map_err(|e| PolicyError::invalid_pattern(pattern, e))?;
        self.denied_patterns.push(re);
        Ok(())
    }

    /// Denied capability names
    pub fn denied_capabilities(&self) -> impl Iterator<Item = &str> {
        self.denied_capabilities.iter().map(String::as_str)
    }

    /// Argument patterns, in evaluation order
    pub fn denied_patterns(&self) -> impl Iterator<Item = &str> {
        self.denied_patterns.iter().map(Regex::as_str)
    }
}

impl PolicyEngine for RulePolicyEngine {
    fn evaluate(&self, request: &PolicyRequest) -> PolicyDecision {
        if self.denied_capabilities.contains(&request.capability) {
            tracing::debug!(capability = %request.capability, owner = %request.owner, "denied by name");
            return PolicyDecision::deny(format!(
                "capability '{}' is restricted by system policy",
                request.capability
            ));
        }

        if let Some(re) = self
            .denied_patterns
            .iter()
            .find(|re| re.is_match(&request.arguments))
        {
            tracing::debug!(capability = %request.capability, pattern = re.as_str(), "denied by pattern");
            return PolicyDecision::deny(format!(
                "arguments match restricted pattern: {}",
                re.as_str()
            ));
        }

        PolicyDecision::allow("approved by default policy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(capability: &str, arguments: &str) -> PolicyRequest {
        PolicyRequest::new(capability, arguments, "chat-1")
    }

    #[test]
    fn denied_name_wins_regardless_of_arguments() {
        let mut engine = RulePolicyEngine::new();
        engine.deny_capability("shell");

        let decision = engine.evaluate(&request("shell", "{}"));
        assert_eq!(
            decision,
            PolicyDecision::deny("capability 'shell' is restricted by system policy")
        );
    }

    #[test]
    fn first_matching_pattern_is_reported() {
        let mut engine = RulePolicyEngine::new();
        engine.deny_arguments(r"rm\s+-rf").unwrap();
        engine.deny_arguments(r"rm").unwrap();

        let decision = engine.evaluate(&request("shell", r#"{"command":"rm -rf /tmp"}"#));
        assert!(decision.is_denied());
        assert_eq!(decision.reason, r"arguments match restricted pattern: rm\s+-rf");
    }

    #[test]
    fn no_match_allows() {
        let engine = RulePolicyEngine::with_default_rules();
        let decision = engine.evaluate(&request("shell", r#"{"command":"ls -la"}"#));
        assert_eq!(decision, PolicyDecision::allow("approved by default policy"));
    }

    #[test]
    fn default_rules_block_destructive_commands() {
        let engine = RulePolicyEngine::with_default_rules();
        for cmd in ["rm -rf /", "mkfs.ext4 /dev/sda", "shutdown now", "sudo reboot"] {
            let args = format!(r#"{{"command":"{cmd}"}}"#);
            assert!(engine.evaluate(&request("shell", &args)).is_denied(), "{cmd}");
        }
    }

    #[test]
    fn malformed_pattern_fails_when_added() {
        let mut engine = RulePolicyEngine::new();
        let err = engine.deny_arguments("(unclosed").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPattern { .. }));
        assert_eq!(engine.denied_patterns().count(), 0);
    }

    #[test]
    fn from_config_combines_defaults_and_custom_rules() {
        let config = PolicyConfig {
            include_default_rules: true,
            denied_capabilities: vec!["browser".into()],
            denied_argument_patterns: vec![r"/etc/shadow".into()],
        };
        let engine = RulePolicyEngine::from_config(&config).unwrap();

        assert_eq!(engine.denied_capabilities().collect::<Vec<_>>(), vec!["browser"]);
        assert_eq!(engine.denied_patterns().count(), DEFAULT_DENIED_PATTERNS.len() + 1);
        assert_eq!(engine.denied_patterns().last(), Some("/etc/shadow"));
    }

    #[test]
    fn from_config_rejects_bad_pattern() {
        let config = PolicyConfig {
            include_default_rules: false,
            denied_capabilities: vec![],
            denied_argument_patterns: vec!["[".into()],
        };
        assert!(RulePolicyEngine::from_config(&config).is_err());
    }
}
