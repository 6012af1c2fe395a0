//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router from the operation route templates
//! - Wire up middleware (request ID, tracing)
//! - Build the shared upstream client and inject it as state
//! - Serve until the shutdown signal fires, then drain

use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{FacadeConfig, LimitsConfig};
use crate::error::FacadeResult;
use crate::http::handlers;
use crate::http::request::{request_id_str, MakeUuidRequestId, X_REQUEST_ID};
use crate::lifecycle::ShutdownSignal;
use crate::routing::Operation;
use crate::upstream::UpstreamClient;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub limits: LimitsConfig,
}

/// HTTP server for the facade.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given (validated) configuration.
    pub fn new(config: &FacadeConfig) -> FacadeResult<Self> {
        let upstream = UpstreamClient::new(&config.upstream)?;

        tracing::info!(
            upstream = %upstream.base_url(),
            request_timeout_secs = config.upstream.request_timeout_secs,
            "Upstream client ready"
        );

        let state = AppState {
            upstream: Arc::new(upstream),
            limits: config.limits.clone(),
        };

        Ok(Self {
            router: build_router(state),
        })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            Operation::GetDatabase.template(),
            get(handlers::get_database)
                .put(handlers::create_database)
                .delete(handlers::delete_database),
        )
        .route(
            Operation::GetDocument.template(),
            get(handlers::get_document).put(handlers::put_document),
        )
        .route(
            Operation::GetAttachment.template(),
            get(handlers::get_attachment).put(handlers::put_attachment),
        )
        .fallback(handlers::unsupported)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeUuidRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id_str(request.headers()),
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
}
