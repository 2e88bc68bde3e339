//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after the request logger):
//!     → admission.rs (path allow-list, 403 otherwise)
//!     → rate_limit.rs (shared fixed-window budget, 429 over budget)
//!     → Pass to panic boundary and handlers
//! ```
//!
//! # Design Decisions
//! - Gate before limiter: refused paths never consume budget
//! - Fail closed by default: a counter store failure rejects the request
//! - No in-process locking; coordination lives in the counter store

pub mod admission;
pub mod rate_limit;

pub use admission::{admission_middleware, AdmissionGate};
pub use rate_limit::{rate_limit_middleware, RateLimiter, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING};
