//! Shared counter store subsystem.
//!
//! # Data Flow
//! ```text
//! Rate limiter
//!     → CounterStore::incr (atomic, server-side)
//!     → CounterStore::expire (only when the count is 1)
//!
//! Backends:
//!     redis.rs  (production, shared across instances)
//!     memory.rs (single process, tests and local development)
//! ```
//!
//! # Design Decisions
//! - Atomicity is the store's contract; callers never read-then-write
//! - Clients are constructed once and passed explicitly, never global
//! - `close` releases the connection exactly once; later calls fail with `Closed`

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::InMemoryCounterStore;
pub use self::redis::RedisCounterStore;

/// Errors surfaced by counter store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing service returned an error or could not be reached.
    #[error("counter store error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// The configured address could not be turned into a connection URL.
    #[error("invalid counter store address `{0}`")]
    InvalidAddress(String),

    /// The client has already been closed.
    #[error("counter store connection is closed")]
    Closed,

    /// Generic backend failure (used by non-Redis stores).
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Atomic counter service with per-key expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key` by one and return the new value.
    /// Creates the key at 1 if it does not exist.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Attach a time-to-live to `key`. Returns false if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Round-trip health check.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<(), StoreError>;
}
