//! Configuration loading, validation, and management for SchemaLoom.
//!
//! Loads configuration from `~/.schemaloom/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub mod logging;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides `assembly.max_concurrency`.
pub const ENV_MAX_CONCURRENCY: &str = "SCHEMALOOM_MAX_CONCURRENCY";

/// Overrides `logging.filter`.
pub const ENV_LOG: &str = "SCHEMALOOM_LOG";

/// The root configuration structure.
///
/// Maps directly to `~/.schemaloom/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Orchestrator settings
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Compatibility preprocessor settings
    #[serde(default)]
    pub compatibility: CompatibilityConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Upper bound on pointers queried at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Rewrite each pointer's sub-schema for structured-output providers
    #[serde(default = "default_true")]
    pub compatibility: bool,

    /// Abandon a single knowledge service call after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_timeout_secs: Option<u64>,
}

fn default_max_concurrency() -> usize {
    4
}
fn default_true() -> bool {
    true
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            compatibility: true,
            query_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityConfig {
    /// Levels a recursive definition is unrolled before it is cut off
    #[serde(default = "default_max_inline_depth")]
    pub max_inline_depth: usize,

    /// Nesting past this depth aborts the rewrite (the schema passes through)
    #[serde(default = "default_max_schema_depth")]
    pub max_schema_depth: usize,
}

fn default_max_inline_depth() -> usize {
    1
}
fn default_max_schema_depth() -> usize {
    128
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            max_inline_depth: default_max_inline_depth(),
            max_schema_depth: default_max_schema_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "schemaloom_engine=debug"
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path (~/.schemaloom/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `SCHEMALOOM_MAX_CONCURRENCY`
    /// - `SCHEMALOOM_LOG`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in [`load`]).
    ///
    /// [`load`]: EngineConfig::load
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            self.assembly.max_concurrency = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{ENV_MAX_CONCURRENCY} must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = filter;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".schemaloom")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assembly.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "assembly.max_concurrency must be at least 1".into(),
            ));
        }

        if self.assembly.query_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "assembly.query_timeout_secs must be at least 1 when set".into(),
            ));
        }

        if self.compatibility.max_inline_depth == 0 {
            return Err(ConfigError::ValidationError(
                "compatibility.max_inline_depth must be at least 1".into(),
            ));
        }

        if self.compatibility.max_schema_depth == 0 {
            return Err(ConfigError::ValidationError(
                "compatibility.max_schema_depth must be at least 1".into(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.filter must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to initialise logging: {0}")]
    LoggingError(String),
}
