//! Prometheus metrics and structured logging for tickstop.
//!
//! Provides:
//! - `tracing` subscriber setup (JSON in production, pretty otherwise)
//! - Prometheus collectors for the connection, the dispatcher, the depth
//!   pipeline and the trigger

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
