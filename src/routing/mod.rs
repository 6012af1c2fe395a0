//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (method, path, ?rev)
//!     → axum route table built from Operation templates (http/server.rs)
//!     → route.rs: ResourcePath (validated segments)
//!     → route.rs: target URL = base URL + encoded segments [+ ?rev]
//! ```
//!
//! # Design Decisions
//! - The route set is fixed at compile time; no configurable routes
//! - Deterministic: same inbound path always maps to the same upstream URL
//! - No passthrough for paths outside the route set

pub mod route;

pub use route::{Operation, ResourcePath};
