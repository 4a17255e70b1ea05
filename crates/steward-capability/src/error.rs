//! Error types for the capability catalogue
//!
//! Two families:
//! - [`RegistryError`] - raised while building the catalogue (registration time)
//! - [`CapabilityError`] - raised while dispatching an invocation (run time)

/// Classification of an invocation failure.
///
/// The execution loop uses this to decide whether another attempt is worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No capability is registered under the requested name
    NotFound,
    /// Arguments failed to parse or did not match the declared schema
    InvalidArguments,
    /// The capability ran and reported an error
    Execution,
    /// The capability did not finish within its time budget
    Timeout,
}

impl FailureKind {
    /// Only plain execution errors are worth another attempt.
    #[inline]
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Execution)
    }

    /// Stable label used in logs and metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidArguments => "invalid_arguments",
            Self::Execution => "execution",
            Self::Timeout => "timeout",
        }
    }
}

/// Errors raised when invoking a capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// Capability not registered
    #[error("capability '{0}' not found")]
    NotFound(String),

    /// Arguments rejected at the registry boundary (or by the capability itself)
    #[error("invalid arguments for '{name}': {details}")]
    InvalidArguments {
        /// Capability name
        name: String,
        /// Human-readable validation failures
        details: String,
    },

    /// The capability reported a failure
    #[error("capability '{name}' failed: {message}")]
    Execution {
        /// Capability name
        name: String,
        /// Failure description
        message: String,
    },

    /// The capability exceeded its time budget
    #[error("capability '{name}' timed out after {secs} seconds")]
    Timeout {
        /// Capability name
        name: String,
        /// Budget that was exceeded
        secs: u64,
    },
}

impl CapabilityError {
    /// Create an execution error
    pub fn execution(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-arguments error
    pub fn invalid_arguments(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidArguments {
            name: name.into(),
            details: details.into(),
        }
    }

    /// Failure classification
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::NotFound,
            Self::InvalidArguments { .. } => FailureKind::InvalidArguments,
            Self::Execution { .. } => FailureKind::Execution,
            Self::Timeout { .. } => FailureKind::Timeout,
        }
    }

    /// Check if another attempt may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Errors raised while building the catalogue
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A capability with this name is already registered
    #[error("capability '{0}' is already registered")]
    DuplicateName(String),

    /// The name is reserved for a built-in capability
    #[error("capability name '{0}' is reserved")]
    ReservedName(String),

    /// The declared parameter schema does not compile
    #[error("invalid parameter schema for '{name}': {details}")]
    InvalidSchema {
        /// Capability name
        name: String,
        /// Compiler message
        details: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_execution_errors_retry() {
        assert!(CapabilityError::execution("shell", "exit 1").is_retryable());
        assert!(!CapabilityError::NotFound("x".into()).is_retryable());
        assert!(!CapabilityError::invalid_arguments("x", "bad").is_retryable());
        assert!(!CapabilityError::Timeout {
            name: "x".into(),
            secs: 30
        }
        .is_retryable());
    }

    #[test]
    fn timeout_message_names_the_budget() {
        let err = CapabilityError::Timeout {
            name: "browser".into(),
            secs: 30,
        };
        assert_eq!(err.to_string(), "capability 'browser' timed out after 30 seconds");
        assert_eq!(err.kind().as_str(), "timeout");
    }
}
