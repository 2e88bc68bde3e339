//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, peer address, graceful shutdown)
//!     → pipeline.rs (CORS, request ID, logger, gate, limiter, panic boundary)
//!     → request.rs (client address, identity)
//!     → route handlers
//!     → response.rs (envelope)
//! ```

pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use pipeline::{build_cors, Pipeline};
pub use request::{ClientAddrResolver, CurrentUser, GUEST_IDENTITY, X_REQUEST_ID};
pub use response::Envelope;
pub use server::HttpServer;
