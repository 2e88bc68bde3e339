//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind host, port, body limit).
    pub listener: ListenerConfig,

    /// Public-facing application settings.
    pub app: AppConfig,

    /// Shared counter store (Redis) connection.
    pub counter_store: CounterStoreConfig,

    /// Persistence pool settings.
    pub persistence: PersistenceConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Path allow-list for the admission gate.
    pub admission: AdmissionConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Shutdown timing.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Service port. Kept as a string because it usually arrives through `PORT`.
    pub port: String,

    /// Maximum request body size buffered by the request logger, in bytes.
    pub max_body_size: usize,
}

impl ListenerConfig {
    /// `host:port` pair handed to the TCP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: String::new(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Application-level settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// External base URL of the service. Its host is the only proxy whose
    /// forwarding headers are trusted when resolving client addresses.
    pub external_base_url: String,
}

/// Shared counter store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CounterStoreConfig {
    /// Redis address, either `host:port` or a full `redis://` URL.
    pub address: String,

    /// Namespace prepended to every rate-limit key.
    pub key_prefix: String,
}

impl Default for CounterStoreConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            key_prefix: "rateL".to_string(),
        }
    }
}

/// Persistence pool configuration.
///
/// Either `connection_string` is given directly, or it is assembled from the
/// individual parts by the loader.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub connection_string: String,

    pub host: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub port: String,
    pub sslmode: String,

    /// Maximum open connections in the pool.
    pub max_connections: u32,

    /// Maximum lifetime of a pooled connection, in seconds.
    pub max_lifetime_secs: u64,

    /// Idle timeout of a pooled connection, in seconds.
    pub idle_timeout_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            host: String::new(),
            username: String::new(),
            password: String::new(),
            database: String::new(),
            port: String::new(),
            sslmode: String::new(),
            max_connections: 20,
            max_lifetime_secs: 20 * 60,
            idle_timeout_secs: 5 * 60,
        }
    }
}

/// Dimension a rate-limit key is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitScope {
    /// Client network address only.
    #[default]
    Global,
    /// Authenticated identity plus request path.
    Scoped,
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Global => "global",
            RateLimitScope::Scoped => "scoped",
        }
    }
}

impl std::str::FromStr for RateLimitScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(RateLimitScope::Global),
            "scoped" => Ok(RateLimitScope::Scoped),
            other => Err(format!("unknown rate limit scope '{}'", other)),
        }
    }
}

/// What the limiter does when the counter store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreFailurePolicy {
    /// Reject the request with a 500.
    #[default]
    Closed,
    /// Let the request through unlimited.
    Open,
}

impl std::str::FromStr for StoreFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "closed" => Ok(StoreFailurePolicy::Closed),
            "open" => Ok(StoreFailurePolicy::Open),
            other => Err(format!("unknown store failure policy '{}'", other)),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per key per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Key derivation scope.
    pub scope: RateLimitScope,

    /// Behaviour when the counter store fails.
    pub on_store_error: StoreFailurePolicy,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 5,
            window_secs: 60,
            scope: RateLimitScope::Global,
            on_store_error: StoreFailurePolicy::Closed,
        }
    }
}

/// Admission gate allow-list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Paths admitted on exact match.
    pub root_paths: Vec<String>,

    /// Prefix under which every path is admitted.
    pub api_prefix: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            root_paths: vec![
                "/".to_string(),
                "/docs".to_string(),
                "/favico".to_string(),
                "/favicon.ico".to_string(),
                "/healthz".to_string(),
            ],
            api_prefix: "/api/v1".to_string(),
        }
    }
}

/// Cross-origin policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. Empty mirrors the request origin.
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            allow_methods: ["GET", "PUT", "POST", "PATCH", "DELETE"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: ["Authorization", "Content-Type", "X-Refresh-Token"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            expose_headers: vec!["Content-Length".to_string()],
            allow_credentials: true,
            max_age_secs: 12 * 60 * 60,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time allowed for in-flight connections to finish, in seconds.
    pub drain_timeout_secs: u64,
}

impl ShutdownConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 5,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
