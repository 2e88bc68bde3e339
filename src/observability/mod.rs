//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → request_log.rs (received / completed events)
//!     → redaction.rs (mask secrets in the logged payload)
//!     → metrics.rs (counters, latency histogram)
//!
//! Startup:
//!     → logging.rs (subscriber, format, level)
//!     → metrics.rs (optional Prometheus endpoint)
//! ```
//!
//! # Design Decisions
//! - Structured fields, not formatted strings, for every event
//! - Request ID flows into both request events
//! - Redaction touches only the logged copy

pub mod logging;
pub mod metrics;
pub mod redaction;
pub mod request_log;

pub use request_log::{request_log_middleware, RequestLogger};
