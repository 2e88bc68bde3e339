//! Redis-backed counter store.

use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

use super::{CounterStore, StoreError};

/// Counter store client over a Redis connection manager.
///
/// The manager multiplexes one connection and reconnects on its own; each
/// call works on a cheap clone of it. `close` swaps the manager out so the
/// connection drops once in-flight calls finish.
pub struct RedisCounterStore {
    conn: ArcSwapOption<ConnectionManager>,
}

impl RedisCounterStore {
    /// Connect to the store at `address` (`host:port` or `redis://…`).
    pub async fn connect(address: &str) -> Result<Self, StoreError> {
        let url = connection_url(address)?;
        let client = redis::Client::open(url.as_str())?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!(address = %address, "Counter store connected");

        Ok(Self {
            conn: ArcSwapOption::from_pointee(conn),
        })
    }

    fn connection(&self) -> Result<ConnectionManager, StoreError> {
        self.conn
            .load_full()
            .map(|conn| ConnectionManager::clone(&conn))
            .ok_or(StoreError::Closed)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection()?;
        let count: i64 = conn.incr(key, 1).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.connection()?;
        let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let applied: bool = conn.pexpire(key, millis).await?;
        Ok(applied)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        match self.conn.swap(None) {
            Some(_) => {
                tracing::info!("Counter store connection closed");
                Ok(())
            }
            None => Err(StoreError::Closed),
        }
    }
}

/// Normalise a configured address into a `redis://` URL.
fn connection_url(address: &str) -> Result<String, StoreError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(StoreError::InvalidAddress(address.to_string()));
    }
    if address.contains("://") {
        Ok(address.to_string())
    } else {
        Ok(format!("redis://{}", address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url() {
        assert_eq!(connection_url("localhost:6379").unwrap(), "redis://localhost:6379");
        assert_eq!(
            connection_url("rediss://cache.internal:6380/0").unwrap(),
            "rediss://cache.internal:6380/0"
        );
        assert!(matches!(connection_url("  "), Err(StoreError::InvalidAddress(_))));
    }
}
