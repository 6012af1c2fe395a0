//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → config file (TOML, optional)   loader.rs
//!     → environment overrides           loader.rs
//!     → CLI flags                       main.rs
//!     → validation.rs (semantic checks)
//!     → FacadeConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults except the upstream base URL
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{FacadeConfig, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig, UpstreamConfig};
pub use validation::{validate_config, ValidationError};
