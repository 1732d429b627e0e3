//! Executor configuration
//!
//! Loaded from a JSON file. Every field is optional:
//!
//! ```json
//! {
//!     "strict_collections": false,
//!     "use_indexes": true,
//!     "log_level": "warn"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid configuration JSON
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unsupported value
    #[error("Invalid {field}: '{value}'. {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Query executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Reject operations on absent collections with NotFound (default: false)
    #[serde(default)]
    pub strict_collections: bool,

    /// Narrow equality filters through indexes (default: true)
    #[serde(default = "default_use_indexes")]
    pub use_indexes: bool,

    /// Minimum log severity: trace, info, warn, error or fatal (default: "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_use_indexes() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            strict_collections: false,
            use_indexes: default_use_indexes(),
            log_level: default_log_level(),
        }
    }
}

impl ExecutorConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: ExecutorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> ConfigResult<()> {
        self.severity().map(|_| ())
    }

    /// Parsed log level
    pub fn severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| ConfigError::Invalid {
            field: "log_level",
            value: self.log_level.clone(),
            reason: "Must be one of trace, info, warn, error, fatal.",
        })
    }

    /// Strict variant of the defaults
    pub fn strict() -> Self {
        Self {
            strict_collections: true,
            ..Self::default()
        }
    }
}
