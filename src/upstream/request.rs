//! The translated call to the backend.

use std::fmt;

use axum::body::Body;
use axum::http::{HeaderValue, Method};
use bytes::Bytes;

use crate::routing::{Operation, ResourcePath};

/// Content type sent with every attachment upload, whatever the caller declared.
pub const ATTACHMENT_CONTENT_TYPE: &str = "application/octet";

/// Content type sent with document bodies.
pub const DOCUMENT_CONTENT_TYPE: &str = "application/json";

/// Body of an upstream request.
pub enum UpstreamBody {
    /// No payload. Sent with `Content-Length: 0` on writes.
    Empty,
    /// Fully buffered JSON document.
    Document(Bytes),
    /// Streamed attachment with its declared length.
    Attachment { body: Body, length: u64 },
}

impl fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamBody::Empty => f.write_str("Empty"),
            UpstreamBody::Document(bytes) => write!(f, "Document({} bytes)", bytes.len()),
            UpstreamBody::Attachment { length, .. } => write!(f, "Attachment({length} bytes)"),
        }
    }
}

/// One upstream call, created per inbound request.
#[derive(Debug)]
pub struct UpstreamRequest {
    pub operation: Operation,
    pub path: ResourcePath,
    pub rev: Option<String>,
    pub body: UpstreamBody,
    pub request_id: Option<HeaderValue>,
}

impl UpstreamRequest {
    /// A request without a body or revision.
    pub fn new(operation: Operation, path: ResourcePath) -> Self {
        Self {
            operation,
            path,
            rev: None,
            body: UpstreamBody::Empty,
            request_id: None,
        }
    }

    pub fn put_document(path: ResourcePath, document: Bytes) -> Self {
        Self {
            body: UpstreamBody::Document(document),
            ..Self::new(Operation::PutDocument, path)
        }
    }

    /// Attachment upload streaming `length` bytes. The revision is set with [`Self::with_rev`].
    pub fn put_attachment(path: ResourcePath, body: Body, length: u64) -> Self {
        Self {
            body: UpstreamBody::Attachment { body, length },
            ..Self::new(Operation::PutAttachment, path)
        }
    }

    pub fn with_rev(mut self, rev: Option<String>) -> Self {
        self.rev = rev;
        self
    }

    pub fn with_request_id(mut self, request_id: Option<HeaderValue>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn method(&self) -> Method {
        self.operation.method()
    }
}
