//! Reasoning service contract
//!
//! The engine never talks to a model directly. It hands a transcript and a
//! capability manifest to a [`ReasoningService`] and gets back free text,
//! invocation requests, or both.

use crate::error::ReasoningError;
use crate::transcript::{InvocationRequest, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use steward_capability::CapabilityDescriptor;

/// Token usage reported with a reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
}

/// One reasoning reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Free text (may be empty when invocations are present)
    pub text: String,
    /// Structured invocation requests
    pub invocations: Vec<InvocationRequest>,
    /// Token usage, when the service reports it
    pub usage: Option<TokenUsage>,
    /// Model that produced the reply
    pub model: Option<String>,
}

impl Reply {
    /// Free-text reply
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Reply requesting invocations
    #[must_use]
    pub fn invoke(invocations: Vec<InvocationRequest>) -> Self {
        Self {
            invocations,
            ..Self::default()
        }
    }

    /// Attach token usage
    #[must_use]
    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Some(TokenUsage {
            prompt_tokens,
            completion_tokens,
        });
        self
    }

    /// Check if the reply is a final answer
    #[inline]
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.invocations.is_empty()
    }
}

/// Turns a transcript plus manifest into a reply
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Complete one turn
    ///
    /// # Errors
    /// Any [`ReasoningError`]; the caller bounds the call with its own timeout.
    async fn complete(
        &self,
        messages: &[Message],
        manifest: &[CapabilityDescriptor],
    ) -> Result<Reply, ReasoningError>;
}
