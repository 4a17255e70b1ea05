//! Policy configuration

use serde::{Deserialize, Serialize};

/// Destructive command patterns denied out of the box
pub const DEFAULT_DENIED_PATTERNS: [&str; 4] = [r"rm\s+-rf", "mkfs", "shutdown", "reboot"];

/// `[policy]` section of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Prepend [`DEFAULT_DENIED_PATTERNS`] to the argument patterns
    pub include_default_rules: bool,
    /// Capabilities denied by exact name
    pub denied_capabilities: Vec<String>,
    /// Argument patterns, evaluated in order after the defaults
    pub denied_argument_patterns: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            include_default_rules: true,
            denied_capabilities: Vec::new(),
            denied_argument_patterns: Vec::new(),
        }
    }
}
