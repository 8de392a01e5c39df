//! Metrics and structured logging for zbstat.
//!
//! - Prometheus metrics for connection state and message flow
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
