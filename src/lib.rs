//! Request gate: an HTTP middleware pipeline with a shared rate-limit budget.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod persistence;
pub mod routing;
pub mod security;
pub mod store;

pub use config::schema::GatewayConfig;
pub use error::PipelineError;
pub use http::{HttpServer, Pipeline};
pub use lifecycle::{ServerLifecycle, Shutdown, ShutdownReport};
