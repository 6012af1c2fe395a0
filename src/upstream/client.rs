//! Pooled HTTP client for the upstream CouchDB instance.
//!
//! # Responsibilities
//! - Own the single long-lived connection pool
//! - Turn an [`UpstreamRequest`] into an HTTP request against the base URL
//! - Enforce the connect timeout and the per-call deadline
//! - Classify transport failures (unreachable / broken / timed out)
//!
//! # Design Decisions
//! - Constructed once at startup and injected into handler state; clones
//!   share the same pool
//! - No retries: one call per inbound request
//! - Dropping the returned future aborts the call, so a caller disconnect
//!   cancels the upstream request as well

use std::error::Error as StdError;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{FacadeError, FacadeResult};
use crate::http::request::X_REQUEST_ID;
use crate::upstream::request::{
    UpstreamBody, UpstreamRequest, ATTACHMENT_CONTENT_TYPE, DOCUMENT_CONTENT_TYPE,
};

/// Client for the upstream database, safe to share across requests.
#[derive(Clone)]
pub struct UpstreamClient {
    base: Url,
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl UpstreamClient {
    /// Build the client and its connection pool from configuration.
    pub fn new(config: &UpstreamConfig) -> FacadeResult<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            FacadeError::InvalidTarget(format!("base URL '{}': {}", config.base_url, e))
        })?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build(connector);

        Ok(Self {
            base,
            client,
            request_timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Issue exactly one upstream call and return the response unread.
    pub async fn send(&self, request: UpstreamRequest) -> FacadeResult<Response<Incoming>> {
        let target = request.path.target(&self.base, request.rev.as_deref())?;
        let operation = request.operation;
        let http_request = build_request(request, &target)?;

        tracing::debug!(
            operation = %operation,
            method = %http_request.method(),
            target = %target,
            "Forwarding to upstream"
        );

        match tokio::time::timeout(self.request_timeout, self.client.request(http_request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                let err = classify(&e);
                tracing::error!(operation = %operation, target = %target, error = %err, "Upstream error");
                Err(err)
            }
            Err(_) => {
                tracing::error!(
                    operation = %operation,
                    target = %target,
                    timeout = ?self.request_timeout,
                    "Upstream timed out"
                );
                Err(FacadeError::UpstreamTimeout(self.request_timeout))
            }
        }
    }
}

/// Build the HTTP request for one upstream call.
///
/// Only the request id is carried over from the caller; content headers are
/// set here per body kind.
fn build_request(request: UpstreamRequest, target: &Url) -> FacadeResult<Request<Body>> {
    let uri: Uri = target
        .as_str()
        .parse()
        .map_err(|e| FacadeError::InvalidTarget(format!("{target}: {e}")))?;
    let method = request.method();

    let mut builder = Request::builder().method(method.clone()).uri(uri);
    if let Some(id) = request.request_id {
        builder = builder.header(X_REQUEST_ID, id);
    }

    let body = match request.body {
        UpstreamBody::Empty => {
            if method == Method::PUT {
                builder = builder.header(header::CONTENT_LENGTH, HeaderValue::from(0u64));
            }
            Body::empty()
        }
        UpstreamBody::Document(bytes) => {
            builder = builder
                .header(header::CONTENT_TYPE, DOCUMENT_CONTENT_TYPE)
                .header(header::CONTENT_LENGTH, HeaderValue::from(bytes.len() as u64));
            Body::from(bytes)
        }
        UpstreamBody::Attachment { body, length } => {
            builder = builder
                .header(header::CONTENT_TYPE, ATTACHMENT_CONTENT_TYPE)
                .header(header::CONTENT_LENGTH, HeaderValue::from(length));
            body
        }
    };

    builder
        .body(body)
        .map_err(|e| FacadeError::InvalidTarget(e.to_string()))
}

fn classify(error: &hyper_util::client::legacy::Error) -> FacadeError {
    let detail = describe(error);
    if error.is_connect() {
        FacadeError::UpstreamUnreachable(detail)
    } else {
        FacadeError::UpstreamTransport(detail)
    }
}

// The top-level client error only says "client error (Connect)"; the cause is in the chain.
fn describe(error: &(dyn StdError + 'static)) -> String {
    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}
