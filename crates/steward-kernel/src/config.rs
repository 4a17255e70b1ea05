//! Configuration loading
//!
//! One TOML file with four optional sections:
//!
//! ```toml
//! [engine]
//! history_limit = 10
//! prompts_dir = "prompts"
//!
//! [policy]
//! include_default_rules = true
//! denied_capabilities = ["browser"]
//! denied_argument_patterns = ['/etc/shadow']
//!
//! [scheduler]
//! enabled = true
//! min_interval_secs = 60
//!
//! [logging]
//! level = "info"
//! json = false
//! ```
//!
//! Loop bounds and timeouts are not configurable here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use steward_core::{Directives, Limits};
use steward_policy::{PolicyConfig, PolicyError, RulePolicyEngine};

/// Planner directive file inside a prompts directory
pub const PLANNER_PROMPT: &str = "planner.md";

/// Fixed leading order of worker directive files
const WORKER_PROMPT_ORDER: [&str; 5] = [
    "identity.md",
    "soul.md",
    "capabilities.md",
    "worker_directive.md",
    "user.md",
];

/// Separator between worker directive files
const PROMPT_SEPARATOR: &str = "\n\n---\n\n";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Policy rules did not compile
    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyError),

    /// Prompts directory is unusable
    #[error("prompts directory {path}: {reason}")]
    Prompts {
        /// Directory
        path: PathBuf,
        /// What is wrong
        reason: String,
    },

    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong
        reason: String,
    },
}

impl ConfigError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// `[engine]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stored messages loaded at task start
    pub history_limit: usize,
    /// Inline planner directive
    pub planner_directive: Option<String>,
    /// Inline step-executor directive
    pub worker_directive: Option<String>,
    /// Directory of markdown directive files; wins over inline directives
    pub prompts_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: Limits::default().history_limit,
            planner_directive: None,
            worker_directive: None,
            prompts_dir: None,
        }
    }
}

/// `[scheduler]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run the background scheduler
    pub enabled: bool,
    /// Shortest recurring interval `schedule_task` accepts
    pub min_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_secs: 60,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StewardConfig {
    /// Engine settings
    pub engine: EngineConfig,
    /// Policy rules
    pub policy: PolicyConfig,
    /// Scheduler settings
    pub scheduler: SchedulerConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl StewardConfig {
    /// Load and validate a configuration file
    ///
    /// # Errors
    /// I/O, parse and validation failures.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let mut config = Self::from_toml_str(&text)?;

        // relative prompt directories resolve against the config file
        if let (Some(dir), Some(base)) = (&config.engine.prompts_dir, path.parent()) {
            if dir.is_relative() {
                config.engine.prompts_dir = Some(base.join(dir));
            }
        }
        Ok(config)
    }

    /// Parse and validate configuration text
    ///
    /// # Errors
    /// Parse and validation failures.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.min_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduler.min_interval_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.level",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Build the policy engine
    ///
    /// # Errors
    /// `ConfigError::Policy` on a bad pattern or empty name.
    pub fn policy_engine(&self) -> Result<RulePolicyEngine, ConfigError> {
        Ok(RulePolicyEngine::from_config(&self.policy)?)
    }

    /// Resolve directives: prompts directory, then inline text, then defaults
    ///
    /// # Errors
    /// `ConfigError::Prompts` / `ConfigError::Io` when a configured prompts
    /// directory cannot be loaded.
    pub fn directives(&self) -> Result<Directives, ConfigError> {
        let defaults = Directives::default();
        let mut directives = Directives::new(
            self.engine
                .planner_directive
                .clone()
                .unwrap_or(defaults.planner),
            self.engine
                .worker_directive
                .clone()
                .unwrap_or(defaults.worker),
        );
        if let Some(dir) = &self.engine.prompts_dir {
            directives = load_prompts(dir)?;
        }
        Ok(directives)
    }

    /// Engine limits with configured overrides
    #[must_use]
    pub fn limits(&self) -> Limits {
        Limits::default().with_history_limit(self.engine.history_limit)
    }
}

/// Load directives from a prompts directory
///
/// `planner.md` is the planner directive. Every other `*.md` file forms the
/// step-executor directive: the well-known files first in a fixed order,
/// then the rest alphabetically, joined by a horizontal rule.
///
/// # Errors
/// - `ConfigError::Io` if the directory or a file cannot be read
/// - `ConfigError::Prompts` if `planner.md` or every worker file is missing
pub fn load_prompts(dir: &Path) -> Result<Directives, ConfigError> {
    let planner_path = dir.join(PLANNER_PROMPT);
    if !planner_path.is_file() {
        return Err(ConfigError::Prompts {
            path: dir.to_path_buf(),
            reason: format!("missing {PLANNER_PROMPT}"),
        });
    }
    let planner =
        std::fs::read_to_string(&planner_path).map_err(|e| ConfigError::io(&planner_path, e))?;

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| ConfigError::io(dir, e))? {
        let entry = entry.map_err(|e| ConfigError::io(dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && name.ends_with(".md") && name != PLANNER_PROMPT {
            names.push(name.to_string());
        }
    }
    names.sort_by(|a, b| prompt_rank(a).cmp(&prompt_rank(b)).then_with(|| a.cmp(b)));

    let mut parts = Vec::with_capacity(names.len());
    for name in &names {
        let path = dir.join(name);
        parts.push(std::fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?);
    }
    if parts.is_empty() {
        return Err(ConfigError::Prompts {
            path: dir.to_path_buf(),
            reason: "no worker directive files".to_string(),
        });
    }

    tracing::debug!(dir = %dir.display(), files = ?names, "loaded prompts");
    Ok(Directives::new(planner, parts.join(PROMPT_SEPARATOR)))
}

fn prompt_rank(name: &str) -> usize {
    WORKER_PROMPT_ORDER
        .iter()
        .position(|known| *known == name)
        .unwrap_or(WORKER_PROMPT_ORDER.len())
}
