//! CouchDB facade library.
//!
//! Exposes a fixed subset of the CouchDB REST API (database lifecycle,
//! documents, attachments) and forwards each request to one upstream
//! CouchDB instance, relaying status, headers and body back verbatim.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod upstream;

pub use config::FacadeConfig;
pub use error::FacadeError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
