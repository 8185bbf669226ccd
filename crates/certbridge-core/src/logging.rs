//! Tracing subscriber setup.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{ConfigError, Result};
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over the configured level when it is set.
/// Calling this more than once returns an error instead of panicking, so
/// hosts and tests can call it freely.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.file_line)
        .with_line_number(config.file_line);

    let result = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| {
        ConfigError::InvalidValue {
            field: "logging".to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
