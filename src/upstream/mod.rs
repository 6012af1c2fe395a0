//! Upstream subsystem: the single CouchDB instance behind the facade.
//!
//! # Data Flow
//! ```text
//! handler
//!     → request.rs (UpstreamRequest: operation, path, rev, body)
//!     → client.rs (compose URL, set content headers, pooled call with deadline)
//!     → Response<Incoming> relayed by http/response.rs
//! ```

pub mod client;
pub mod request;

pub use client::UpstreamClient;
pub use request::{UpstreamBody, UpstreamRequest, ATTACHMENT_CONTENT_TYPE};
