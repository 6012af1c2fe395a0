//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use couchdb_facade::{FacadeConfig, HttpServer, Shutdown};

/// One request as seen by a fake upstream.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Recorded {
    pub method: String,
    pub path_and_query: String,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub request_id: Option<String>,
}

struct Attachment {
    content_type: String,
    data: Bytes,
}

struct Doc {
    seq: u64,
    rev: String,
    body: Map<String, Value>,
    attachments: HashMap<String, Attachment>,
}

impl Doc {
    fn bump(&mut self) -> String {
        self.seq += 1;
        self.rev = format!("{}-{}", self.seq, uuid::Uuid::new_v4().simple());
        self.rev.clone()
    }

    fn to_json(&self, id: &str) -> Value {
        let mut body = self.body.clone();
        body.insert("_id".into(), json!(id));
        body.insert("_rev".into(), json!(self.rev));
        if !self.attachments.is_empty() {
            let stubs: Map<String, Value> = self
                .attachments
                .iter()
                .map(|(name, att)| {
                    (
                        name.clone(),
                        json!({"content_type": att.content_type, "length": att.data.len(), "stub": true}),
                    )
                })
                .collect();
            body.insert("_attachments".into(), Value::Object(stubs));
        }
        Value::Object(body)
    }
}

/// In-memory stand-in for a CouchDB instance.
#[derive(Clone, Default)]
pub struct FakeCouch {
    dbs: Arc<Mutex<HashMap<String, HashMap<String, Doc>>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

#[allow(dead_code)]
impl FakeCouch {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<Recorded> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[derive(Deserialize)]
struct RevQuery {
    rev: Option<String>,
}

fn couch_error(status: StatusCode, error: &str, reason: &str) -> Response {
    (status, Json(json!({"error": error, "reason": reason}))).into_response()
}

fn db_missing() -> Response {
    couch_error(StatusCode::NOT_FOUND, "not_found", "Database does not exist.")
}

fn conflict() -> Response {
    couch_error(StatusCode::CONFLICT, "conflict", "Document update conflict.")
}

async fn record(State(fake): State<FakeCouch>, request: Request, next: Next) -> Response {
    // The header closure borrows the request, which must not live across the await.
    let entry = {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Recorded {
            method: request.method().to_string(),
            path_and_query: request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default(),
            content_type: header("content-type"),
            content_length: header("content-length"),
            request_id: header("x-request-id"),
        }
    };
    fake.requests.lock().unwrap().push(entry);
    next.run(request).await
}

async fn create_db(State(fake): State<FakeCouch>, Path(db): Path<String>) -> Response {
    let mut dbs = fake.dbs.lock().unwrap();
    if dbs.contains_key(&db) {
        return couch_error(
            StatusCode::PRECONDITION_FAILED,
            "file_exists",
            "The database could not be created, the file already exists.",
        );
    }
    dbs.insert(db, HashMap::new());
    (StatusCode::CREATED, Json(json!({"ok": true}))).into_response()
}

async fn db_info(State(fake): State<FakeCouch>, Path(db): Path<String>) -> Response {
    let dbs = fake.dbs.lock().unwrap();
    match dbs.get(&db) {
        Some(docs) => Json(json!({"db_name": db, "doc_count": docs.len()})).into_response(),
        None => db_missing(),
    }
}

async fn delete_db(State(fake): State<FakeCouch>, Path(db): Path<String>) -> Response {
    match fake.dbs.lock().unwrap().remove(&db) {
        Some(_) => Json(json!({"ok": true})).into_response(),
        None => db_missing(),
    }
}

async fn put_doc(
    State(fake): State<FakeCouch>,
    Path((db, id)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let mut body: Map<String, Value> = match serde_json::from_slice(&body) {
        Ok(map) => map,
        Err(_) => {
            return couch_error(StatusCode::BAD_REQUEST, "bad_request", "Document must be a JSON object")
        }
    };
    let given_rev = body.remove("_rev").and_then(|v| v.as_str().map(str::to_string));
    body.remove("_id");

    let mut dbs = fake.dbs.lock().unwrap();
    let Some(docs) = dbs.get_mut(&db) else {
        return db_missing();
    };

    let rev = match docs.get_mut(&id) {
        Some(doc) => {
            if given_rev.as_deref() != Some(doc.rev.as_str()) {
                return conflict();
            }
            doc.body = body;
            doc.bump()
        }
        None => {
            if given_rev.is_some() {
                return conflict();
            }
            let mut doc = Doc {
                seq: 0,
                rev: String::new(),
                body,
                attachments: HashMap::new(),
            };
            let rev = doc.bump();
            docs.insert(id.clone(), doc);
            rev
        }
    };

    (
        StatusCode::CREATED,
        [(header::ETAG, format!("\"{rev}\""))],
        Json(json!({"ok": true, "id": id, "rev": rev})),
    )
        .into_response()
}

async fn get_doc(
    State(fake): State<FakeCouch>,
    Path((db, id)): Path<(String, String)>,
    Query(query): Query<RevQuery>,
) -> Response {
    let dbs = fake.dbs.lock().unwrap();
    let Some(docs) = dbs.get(&db) else {
        return db_missing();
    };
    match docs.get(&id) {
        Some(doc) if query.rev.as_deref().map_or(true, |rev| rev == doc.rev) => {
            Json(doc.to_json(&id)).into_response()
        }
        _ => couch_error(StatusCode::NOT_FOUND, "not_found", "missing"),
    }
}

async fn put_att(
    State(fake): State<FakeCouch>,
    Path((db, id, name)): Path<(String, String, String)>,
    Query(query): Query<RevQuery>,
    headers: HeaderMap,
    data: Bytes,
) -> Response {
    let mut dbs = fake.dbs.lock().unwrap();
    let Some(docs) = dbs.get_mut(&db) else {
        return db_missing();
    };
    let Some(doc) = docs.get_mut(&id) else {
        return couch_error(StatusCode::NOT_FOUND, "not_found", "missing");
    };
    if query.rev.as_deref() != Some(doc.rev.as_str()) {
        return conflict();
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    doc.attachments.insert(name, Attachment { content_type, data });
    let rev = doc.bump();

    (StatusCode::CREATED, Json(json!({"ok": true, "id": id, "rev": rev}))).into_response()
}

async fn get_att(
    State(fake): State<FakeCouch>,
    Path((db, id, name)): Path<(String, String, String)>,
) -> Response {
    let dbs = fake.dbs.lock().unwrap();
    let attachment = dbs
        .get(&db)
        .and_then(|docs| docs.get(&id))
        .and_then(|doc| doc.attachments.get(&name));
    match attachment {
        Some(att) => (
            [(header::CONTENT_TYPE, att.content_type.clone())],
            att.data.clone(),
        )
            .into_response(),
        None => couch_error(StatusCode::NOT_FOUND, "not_found", "Document is missing attachment"),
    }
}

/// Start an in-memory fake CouchDB on an ephemeral port.
pub async fn start_fake_couch() -> (SocketAddr, FakeCouch) {
    let fake = FakeCouch::default();
    let app = Router::new()
        .route("/{db}", get(db_info).put(create_db).delete(delete_db))
        .route("/{db}/{doc}", get(get_doc).put(put_doc))
        .route("/{db}/{doc}/{att}", get(get_att).put(put_att))
        .layer(middleware::from_fn_with_state(fake.clone(), record))
        .with_state(fake.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, fake)
}

/// Start a raw backend that answers every connection with a fixed status and body.
/// Returns the number of connections it has served so far.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<AtomicU32>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let f = f.clone();
            tokio::spawn(async move {
                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    409 => "409 Conflict",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (addr, hits)
}

/// Start a backend that accepts connections and never answers.
#[allow(dead_code)]
pub async fn start_stalled_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Start a backend that reads the start of each request, then closes the
/// connection without answering.
#[allow(dead_code)]
pub async fn start_hangup_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            drop(socket);
        }
    });
    addr
}

/// An address with nothing listening on it.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start the facade in front of `upstream`, with optional config tweaks.
pub async fn spawn_facade_with<F>(upstream: &str, tweak: F) -> (SocketAddr, Shutdown)
where
    F: FnOnce(&mut FacadeConfig),
{
    let mut config = FacadeConfig::default();
    config.upstream.base_url = upstream.to_string();
    config.listener.bind_address = "127.0.0.1:0".into();
    tweak(&mut config);

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config).unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });
    (addr, shutdown)
}

#[allow(dead_code)]
pub async fn spawn_facade(upstream: &str) -> (SocketAddr, Shutdown) {
    spawn_facade_with(upstream, |_| {}).await
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
