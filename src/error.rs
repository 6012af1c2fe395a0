//! Facade error taxonomy.
//!
//! Every failure produced by the facade itself (as opposed to failures the
//! upstream reports, which are relayed untouched) is a [`FacadeError`].
//! Errors render as CouchDB-shaped JSON bodies so callers can handle them
//! the same way they handle backend errors:
//!
//! ```text
//! {"error": "upstream_unreachable", "reason": "..."}
//! ```

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the facade before, during, or instead of an upstream call.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// Attachment write without the `rev` query parameter.
    #[error("Document revision is required: supply ?rev=<rev>")]
    MissingRevision,

    /// The query string could not be parsed.
    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    /// A path parameter was empty.
    #[error("Path segment '{0}' must not be empty")]
    EmptySegment(&'static str),

    /// Attachment upload without a usable `Content-Length`.
    #[error("Attachment uploads must declare a Content-Length")]
    LengthRequired,

    /// Inbound payload exceeds the configured limit.
    #[error("Payload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    /// Reading the inbound body failed.
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// The upstream URL or request could not be built.
    #[error("Invalid upstream target: {0}")]
    InvalidTarget(String),

    /// Connection to the upstream could not be established.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The connection failed after it was established (reset, protocol error).
    #[error("Upstream request failed: {0}")]
    UpstreamTransport(String),

    /// The upstream did not answer within the per-call deadline.
    #[error("Upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),
}

impl FacadeError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            FacadeError::MissingRevision
            | FacadeError::InvalidQuery(_)
            | FacadeError::EmptySegment(_)
            | FacadeError::BodyRead(_) => StatusCode::BAD_REQUEST,
            FacadeError::LengthRequired => StatusCode::LENGTH_REQUIRED,
            FacadeError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            FacadeError::InvalidTarget(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FacadeError::UpstreamUnreachable(_) | FacadeError::UpstreamTransport(_) => {
                StatusCode::BAD_GATEWAY
            }
            FacadeError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short machine-readable kind, used as the `error` field and as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            FacadeError::MissingRevision
            | FacadeError::InvalidQuery(_)
            | FacadeError::EmptySegment(_)
            | FacadeError::BodyRead(_) => "bad_request",
            FacadeError::LengthRequired => "length_required",
            FacadeError::PayloadTooLarge { .. } => "too_large",
            FacadeError::InvalidTarget(_) => "internal_error",
            FacadeError::UpstreamUnreachable(_) => "upstream_unreachable",
            FacadeError::UpstreamTransport(_) => "upstream_error",
            FacadeError::UpstreamTimeout(_) => "upstream_timeout",
        }
    }
}

impl IntoResponse for FacadeError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.kind(),
            "reason": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for facade operations.
pub type FacadeResult<T> = Result<T, FacadeError>;
