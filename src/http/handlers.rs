//! Handlers for the supported operations.
//!
//! Each handler validates its preconditions, builds one [`UpstreamRequest`]
//! and hands it to [`forward`]. Preconditions fail before any upstream call
//! is made.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde::Deserialize;

use crate::error::{FacadeError, FacadeResult};
use crate::http::request::{declared_length, request_id, request_id_str};
use crate::http::response::relay;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::{Operation, ResourcePath};
use crate::upstream::UpstreamRequest;

/// `?rev=` query parameter. An empty value counts as absent.
#[derive(Debug, Default, Deserialize)]
pub struct RevisionQuery {
    pub rev: Option<String>,
}

/// Extract the revision for `operation`, failing when the operation needs one
/// and none was given.
fn revision(
    query: Result<Query<RevisionQuery>, QueryRejection>,
    operation: Operation,
) -> FacadeResult<Option<String>> {
    let Query(query) = query.map_err(|rejection| FacadeError::InvalidQuery(rejection.body_text()))?;
    let rev = query.rev.filter(|rev| !rev.is_empty());
    if rev.is_none() && operation.requires_revision() {
        return Err(FacadeError::MissingRevision);
    }
    Ok(rev)
}

pub async fn create_database(
    State(state): State<AppState>,
    Path(dbname): Path<String>,
    headers: HeaderMap,
) -> Response {
    let op = Operation::CreateDatabase;
    let request = ResourcePath::database(dbname).map(|path| UpstreamRequest::new(op, path));
    dispatch(&state, op, &headers, request).await
}

pub async fn get_database(
    State(state): State<AppState>,
    Path(dbname): Path<String>,
    headers: HeaderMap,
) -> Response {
    let op = Operation::GetDatabase;
    let request = ResourcePath::database(dbname).map(|path| UpstreamRequest::new(op, path));
    dispatch(&state, op, &headers, request).await
}

pub async fn delete_database(
    State(state): State<AppState>,
    Path(dbname): Path<String>,
    headers: HeaderMap,
) -> Response {
    let op = Operation::DeleteDatabase;
    let request = ResourcePath::database(dbname).map(|path| UpstreamRequest::new(op, path));
    dispatch(&state, op, &headers, request).await
}

pub async fn put_document(
    State(state): State<AppState>,
    Path((dbname, docid)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let request = prepare_document(dbname, docid, body, state.limits.max_document_bytes).await;
    dispatch(&state, Operation::PutDocument, &headers, request).await
}

async fn prepare_document(
    dbname: String,
    docid: String,
    body: Body,
    limit: usize,
) -> FacadeResult<UpstreamRequest> {
    let path = ResourcePath::document(dbname, docid)?;
    let document = axum::body::to_bytes(body, limit).await.map_err(|e| {
        let inner = e.into_inner();
        if inner.is::<LengthLimitError>() {
            FacadeError::PayloadTooLarge { limit: limit as u64 }
        } else {
            FacadeError::BodyRead(inner.to_string())
        }
    })?;
    Ok(UpstreamRequest::put_document(path, document))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path((dbname, docid)): Path<(String, String)>,
    query: Result<Query<RevisionQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Response {
    let op = Operation::GetDocument;
    let request = ResourcePath::document(dbname, docid).and_then(|path| {
        let rev = revision(query, op)?;
        Ok(UpstreamRequest::new(op, path).with_rev(rev))
    });
    dispatch(&state, op, &headers, request).await
}

pub async fn put_attachment(
    State(state): State<AppState>,
    Path((dbname, docid, attname)): Path<(String, String, String)>,
    query: Result<Query<RevisionQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let path = ResourcePath::attachment(dbname, docid, attname);
    let request = path.and_then(|path| {
        prepare_attachment(path, query, &headers, body, state.limits.max_attachment_bytes)
    });
    dispatch(&state, Operation::PutAttachment, &headers, request).await
}

fn prepare_attachment(
    path: ResourcePath,
    query: Result<Query<RevisionQuery>, QueryRejection>,
    headers: &HeaderMap,
    body: Body,
    limit: Option<u64>,
) -> FacadeResult<UpstreamRequest> {
    let rev = revision(query, Operation::PutAttachment)?;
    let length = declared_length(headers)?;
    if let Some(limit) = limit {
        if length > limit {
            return Err(FacadeError::PayloadTooLarge { limit });
        }
    }
    Ok(UpstreamRequest::put_attachment(path, body, length).with_rev(rev))
}

pub async fn get_attachment(
    State(state): State<AppState>,
    Path((dbname, docid, attname)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let op = Operation::GetAttachment;
    let request = ResourcePath::attachment(dbname, docid, attname)
        .map(|path| UpstreamRequest::new(op, path));
    dispatch(&state, op, &headers, request).await
}

/// Paths and methods outside the route set.
pub async fn unsupported(method: Method, uri: Uri) -> Response {
    tracing::debug!(method = %method, path = %uri.path(), "Unsupported route");
    let body = serde_json::json!({
        "error": "not_found",
        "reason": format!("{} {} is not a supported operation", method, uri.path()),
    });
    (axum::http::StatusCode::NOT_FOUND, axum::Json(body)).into_response()
}

/// Forward a prepared request, or answer a precondition failure without
/// touching the upstream.
async fn dispatch(
    state: &AppState,
    operation: Operation,
    headers: &HeaderMap,
    request: FacadeResult<UpstreamRequest>,
) -> Response {
    match request {
        Ok(request) => forward(state, request.with_request_id(request_id(headers))).await,
        Err(err) => {
            tracing::warn!(
                request_id = %request_id_str(headers),
                operation = %operation,
                error = %err,
                "Rejected before forwarding"
            );
            metrics::record_rejected(operation, err.kind());
            err.into_response()
        }
    }
}

/// Issue the single upstream call and relay its response verbatim.
pub async fn forward(state: &AppState, request: UpstreamRequest) -> Response {
    let start_time = Instant::now();
    let operation = request.operation;
    let method = request.method();

    match state.upstream.send(request).await {
        Ok(response) => {
            metrics::record_request(operation, &method, response.status().as_u16(), start_time);
            relay(response)
        }
        Err(err) => {
            metrics::record_request(operation, &method, err.status().as_u16(), start_time);
            err.into_response()
        }
    }
}
