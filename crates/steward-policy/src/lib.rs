//! Steward Policy Layer
//!
//! The trusted gate between the reasoning loop and the outside world. Every
//! proposed capability invocation is evaluated here before it runs.
//!
//! # Rules
//!
//! Checked in order:
//! 1. **Deny list** - an exact capability name match denies immediately
//! 2. **Argument patterns** - ordered regular expressions matched against the
//!    serialized arguments; the first match denies, naming the pattern
//!
//! No match allows with a default reason. Evaluation is pure and total: it
//! never fails, and patterns are compiled when they are added, so a malformed
//! pattern is reported at configuration time.
//!
//! # Example
//!
//! ```rust,ignore
//! use steward_policy::{PolicyEngine, PolicyRequest, RulePolicyEngine};
//!
//! let mut engine = RulePolicyEngine::with_default_rules();
//! engine.deny_capability("browser");
//!
//! let decision = engine.evaluate(&PolicyRequest::new("shell", r#"{"command":"rm -rf /"}"#, "chat-1"));
//! assert!(decision.is_denied());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod engine;
pub mod error;

pub use config::{PolicyConfig, DEFAULT_DENIED_PATTERNS};
pub use engine::{Effect, PolicyDecision, PolicyEngine, PolicyRequest, RulePolicyEngine};
pub use error::PolicyError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
