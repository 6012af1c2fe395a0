//! Route descriptors and upstream target composition.
//!
//! # Responsibilities
//! - Enumerate the supported operation shapes (method + path template)
//! - Validate inbound path parameters (non-empty segments)
//! - Compose the upstream URL by joining segments onto the base URL
//!
//! # Design Decisions
//! - Segments are joined through `url`'s segment API, so each one is
//!   percent-encoded exactly once during the join and never reinterpreted
//! - A base URL path prefix is kept; segments are appended after it

use std::fmt;

use axum::http::Method;
use url::Url;

use crate::error::{FacadeError, FacadeResult};

/// One supported operation shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateDatabase,
    GetDatabase,
    DeleteDatabase,
    PutDocument,
    GetDocument,
    PutAttachment,
    GetAttachment,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::CreateDatabase,
        Operation::GetDatabase,
        Operation::DeleteDatabase,
        Operation::PutDocument,
        Operation::GetDocument,
        Operation::PutAttachment,
        Operation::GetAttachment,
    ];

    /// HTTP method, identical inbound and upstream.
    pub fn method(&self) -> Method {
        match self {
            Operation::CreateDatabase | Operation::PutDocument | Operation::PutAttachment => {
                Method::PUT
            }
            Operation::GetDatabase | Operation::GetDocument | Operation::GetAttachment => {
                Method::GET
            }
            Operation::DeleteDatabase => Method::DELETE,
        }
    }

    /// Path template in axum route syntax.
    pub fn template(&self) -> &'static str {
        match self.params().len() {
            1 => "/{dbname}",
            2 => "/{dbname}/{docid}",
            _ => "/{dbname}/{docid}/{attname}",
        }
    }

    /// Names of the path parameters, outermost first.
    pub fn params(&self) -> &'static [&'static str] {
        match self {
            Operation::CreateDatabase | Operation::GetDatabase | Operation::DeleteDatabase => {
                &["dbname"]
            }
            Operation::PutDocument | Operation::GetDocument => &["dbname", "docid"],
            Operation::PutAttachment | Operation::GetAttachment => {
                &["dbname", "docid", "attname"]
            }
        }
    }

    /// Whether the upstream call requires a `rev` query parameter.
    pub fn requires_revision(&self) -> bool {
        matches!(self, Operation::PutAttachment)
    }

    /// Stable name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateDatabase => "create_database",
            Operation::GetDatabase => "get_database",
            Operation::DeleteDatabase => "delete_database",
            Operation::PutDocument => "put_document",
            Operation::GetDocument => "get_document",
            Operation::PutAttachment => "put_attachment",
            Operation::GetAttachment => "get_attachment",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated path parameters of one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// `/{dbname}`
    pub fn database(dbname: String) -> FacadeResult<Self> {
        Self::from_segments(vec![("dbname", dbname)])
    }

    /// `/{dbname}/{docid}`
    pub fn document(dbname: String, docid: String) -> FacadeResult<Self> {
        Self::from_segments(vec![("dbname", dbname), ("docid", docid)])
    }

    /// `/{dbname}/{docid}/{attname}`
    pub fn attachment(dbname: String, docid: String, attname: String) -> FacadeResult<Self> {
        Self::from_segments(vec![("dbname", dbname), ("docid", docid), ("attname", attname)])
    }

    fn from_segments(named: Vec<(&'static str, String)>) -> FacadeResult<Self> {
        let mut segments = Vec::with_capacity(named.len());
        for (name, value) in named {
            if value.is_empty() {
                return Err(FacadeError::EmptySegment(name));
            }
            segments.push(value);
        }
        Ok(Self { segments })
    }

    /// Compose the upstream URL for this path, with an optional revision.
    pub fn target(&self, base: &Url, rev: Option<&str>) -> FacadeResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| FacadeError::InvalidTarget(format!("'{base}' cannot be a base URL")))?
            .pop_if_empty()
            .extend(&self.segments);

        if let Some(rev) = rev {
            url.query_pairs_mut().append_pair("rev", rev);
        }
        Ok(url)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
