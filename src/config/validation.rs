//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Validation is a pure
//! function over [`FacadeConfig`] and reports every problem it finds, not
//! just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::FacadeConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &FacadeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    validate_base_url(&config.upstream.base_url, &mut errors);

    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "upstream.connect_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "upstream.request_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.limits.max_document_bytes == 0 {
        errors.push(ValidationError::new(
            "limits.max_document_bytes",
            "must be greater than zero",
        ));
    }
    if config.limits.max_attachment_bytes == Some(0) {
        errors.push(ValidationError::new(
            "limits.max_attachment_bytes",
            "must be greater than zero when set",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_base_url(raw: &str, errors: &mut Vec<ValidationError>) {
    const FIELD: &str = "upstream.base_url";

    if raw.trim().is_empty() {
        errors.push(ValidationError::new(FIELD, "must be set"));
        return;
    }

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            errors.push(ValidationError::new(FIELD, format!("'{raw}' is not a URL: {e}")));
            return;
        }
    };

    // The pooled connector speaks plain HTTP only.
    if url.scheme() != "http" {
        errors.push(ValidationError::new(
            FIELD,
            format!("scheme '{}' is not supported, use http", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        errors.push(ValidationError::new(FIELD, "must include a host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        errors.push(ValidationError::new(
            FIELD,
            "must not carry a query string or fragment",
        ));
    }
}
