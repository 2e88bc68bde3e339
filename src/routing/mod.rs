//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     defaults.rs (/, /favicon.ico, /healthz)
//!     v1/ (grouped under the API prefix)
//!     → router.rs (RouteRegistry collects registrations)
//!     → axum Router handed to the pipeline
//! ```
//!
//! # Design Decisions
//! - Routes are registered once at startup and never change
//! - Handlers know nothing about the pipeline around them
//! - Paths outside the admission allow-list may be registered but stay unreachable

pub mod defaults;
pub mod router;
pub mod v1;

pub use router::RouteRegistry;

/// Every route the service exposes, mounted under `api_prefix` for versioned groups.
pub fn routes(api_prefix: &str) -> RouteRegistry {
    let registry = defaults::register(RouteRegistry::new());
    registry.group(api_prefix, v1::register)
}
