//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::FacadeConfig;
use crate::config::validation::ValidationError;

/// Overrides the upstream base URL.
pub const ENV_UPSTREAM_URL: &str = "COUCHDB_FACADE_UPSTREAM_URL";
/// Overrides the listener bind address.
pub const ENV_BIND_ADDRESS: &str = "COUCHDB_FACADE_BIND_ADDRESS";
/// Overrides the per-call upstream timeout.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "COUCHDB_FACADE_REQUEST_TIMEOUT_SECS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML document into a configuration. Does not validate.
pub fn parse_config(content: &str) -> Result<FacadeConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides. The result is not validated yet: callers layer CLI flags on
/// top and then run [`validate_config`](crate::config::validation::validate_config).
pub fn load_config(path: Option<&Path>) -> Result<FacadeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            parse_config(&content)?
        }
        None => FacadeConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    Ok(config)
}

/// Apply environment overrides using the given lookup.
pub fn apply_env_overrides<F>(config: &mut FacadeConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_UPSTREAM_URL) {
        config.upstream.base_url = url;
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
    if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
        config.upstream.request_timeout_secs =
            value.parse().map_err(|_| ConfigError::Env {
                var: ENV_REQUEST_TIMEOUT_SECS,
                value,
            })?;
    }
    Ok(())
}
