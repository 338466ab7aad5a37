//! Tracing subscriber setup.

use crate::config::{FlowConfig, LogFormat};
use crate::errors::FlowError;
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` if set, otherwise `default_level`.
#[must_use]
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Installs a global fmt subscriber.
///
/// Uses the `RUST_LOG` env var if set, otherwise falls back to `level`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<(), FlowError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(false);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    installed.map_err(|e| FlowError::Config(format!("failed to install tracing subscriber: {e}")))
}

/// Installs a subscriber from the logging fields of `config`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_from_config(config: &FlowConfig) -> Result<(), FlowError> {
    init_tracing(&config.log_level, config.log_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        // Whichever call installs first wins; the other must report an error.
        let first = init_tracing("debug", LogFormat::Pretty);
        let second = init_from_config(&FlowConfig::default());

        assert!(first.is_err() || second.is_err());
    }

    #[test]
    fn test_env_filter_falls_back_to_level() {
        let filter = env_filter("warn");
        assert!(!filter.to_string().is_empty());
    }
}
