//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! handlers / upstream client produce:
//!     → logging.rs (structured log events, request ID in span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
