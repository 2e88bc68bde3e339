//! In-process counter store with Redis-compatible INCR/PEXPIRE semantics.
//!
//! Counters live in a sharded map; an increment holds the shard lock for the
//! read-modify-write, which gives the same atomicity the shared store does.
//! Expiry is evaluated lazily against `tokio::time::Instant`, so tests can
//! pause and advance the clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::{CounterStore, StoreError};

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: i64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Single-process counter store.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: DashMap<String, Counter>,
    closed: AtomicBool,
    unavailable: AtomicBool,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Current count for `key`, if it exists and has not expired.
    pub fn count(&self, key: &str) -> Option<i64> {
        let now = Instant::now();
        self.counters
            .get(key)
            .filter(|c| !c.is_expired(now))
            .map(|c| c.count)
    }

    /// Remaining time-to-live for `key`, if one is attached.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.counters
            .get(key)
            .filter(|c| !c.is_expired(now))
            .and_then(|c| c.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.check()?;
        let now = Instant::now();

        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: None,
        });
        if counter.is_expired(now) {
            *counter = Counter {
                count: 0,
                expires_at: None,
            };
        }
        counter.count += 1;
        Ok(counter.count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.check()?;
        let now = Instant::now();

        match self.counters.get_mut(key) {
            Some(mut counter) if !counter.is_expired(now) => {
                counter.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        self.counters.clear();
        Ok(())
    }
}
