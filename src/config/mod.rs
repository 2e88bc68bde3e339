//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides, .env honoured by the binary)
//!     → validation.rs (required values, ranges)
//!     → GatewayConfig (validated, immutable)
//!     → handed by value/reference to subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults; required values are enforced by validation
//! - Environment variable names match the deployed service (PORT, REDIS_URL, DB_*)

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdmissionConfig, AppConfig, CorsConfig, CounterStoreConfig, GatewayConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, PersistenceConfig, RateLimitConfig, RateLimitScope,
    ShutdownConfig, StoreFailurePolicy,
};
pub use validation::ValidationError;
