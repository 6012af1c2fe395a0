//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID + trace layers)
//!     → route table (one entry per Operation template)
//!     → handlers.rs (preconditions, build UpstreamRequest)
//!     → upstream client (single pooled call)
//!     → response.rs (relay status, headers, streamed body)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeUuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
