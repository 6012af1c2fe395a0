//! Request identification and inbound request helpers.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID when the caller did not send one
//! - Extract the request ID for logging and upstream propagation
//! - Read the declared body length of an inbound request
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer) for tracing
//! - A caller-supplied `x-request-id` is kept as-is

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::{FacadeError, FacadeResult};

/// Header carrying the request ID, inbound, upstream and outbound.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs for [`tower_http::request_id::SetRequestIdLayer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID header value, if present.
pub fn request_id(headers: &HeaderMap) -> Option<HeaderValue> {
    headers.get(X_REQUEST_ID).cloned()
}

/// The request ID as text for log fields.
pub fn request_id_str(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// The body length declared by `Content-Length`.
///
/// Chunked uploads carry no length and are refused: the upstream
/// `Content-Length` must be set before the first byte is streamed.
pub fn declared_length(headers: &HeaderMap) -> FacadeResult<u64> {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return Err(FacadeError::LengthRequired);
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or(FacadeError::LengthRequired)
}
