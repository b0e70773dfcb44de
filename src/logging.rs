//! Diagnostic logging setup.
//!
//! Events go to stderr so stdout stays free for task output and hints.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ConfigError;

/// Environment variable whose directives replace the configured level.
pub const FILTER_ENV_VAR: &str = "RUST_LOG";

/// Pick the filter directive: a non-empty `RUST_LOG`, else `configured`.
#[must_use]
pub fn filter_directive<E: mockable::Env>(configured: &str, env: &E) -> String {
    env.string(FILTER_ENV_VAR)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| String::from(configured))
}

fn build_filter(directive: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(directive).map_err(|error| ConfigError::InvalidValue {
        field: String::from("logging.level"),
        reason: format!("'{directive}' is not a valid filter: {error}"),
    })
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for an unparsable filter directive and
/// `ConfigError::LoggingInit` when a global subscriber is already set.
pub fn init_logging<E: mockable::Env>(config: &LoggingConfig, env: &E) -> Result<(), ConfigError> {
    let filter = build_filter(&filter_directive(&config.level, env))?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|error| ConfigError::LoggingInit {
        message: error.to_string(),
    })
}
