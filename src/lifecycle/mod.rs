//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Bind listener → spawn serve task → Serving
//!
//! Shutdown (orchestrator.rs):
//!     Signal (signals.rs) or token (shutdown.rs) → Draining
//!     → bounded drain → cleanup.rs callbacks in order → Closed
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, release shared clients
//! - Shutdown has a timeout: remaining connections are dropped after the deadline
//! - Cleanup is best-effort: one failing callback never skips the next

pub mod cleanup;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;

pub use cleanup::{CleanupFailure, CleanupRegistry};
pub use orchestrator::{LifecycleError, LifecycleState, ServerLifecycle, ShutdownReport};
pub use shutdown::Shutdown;
