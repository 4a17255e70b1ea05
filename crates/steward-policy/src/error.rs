//! Error types for the policy layer
//!
//! Evaluation itself cannot fail; only configuring the engine can.

/// Errors raised while configuring a policy engine
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// An argument pattern is not a valid regular expression
    #[error("invalid argument pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Compiler error
        #[source]
        source: regex::Error,
    },

    /// A denied capability name is empty
    #[error("denied capability name must not be empty")]
    EmptyCapabilityName,
}

impl PolicyError {
    /// Create invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }
}
