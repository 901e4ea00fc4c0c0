//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::{ConfigError, LoggingConfig};

/// Install the global fmt subscriber. `RUST_LOG`, when set, wins over
/// `config.filter`.
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| ConfigError::LoggingError(e.to_string()))
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| {
            ConfigError::ValidationError(format!("invalid logging.filter '{}': {e}", config.filter))
        }),
    }
}
