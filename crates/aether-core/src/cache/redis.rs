//! Remote key-value tier.
//!
//! A thin wrapper over the endpoint's `GET key` / `SET key value PX
//! <ttl-ms>` convention. This tier is always fail-open: connection or
//! command errors produce a miss (or a dropped write) and a debug log,
//! never an error to the caller.

use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

/// Fail-open remote cache tier.
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    /// Creates the tier for the given endpoint address. Returns `None`
    /// when the address does not parse; no connection is attempted yet.
    #[must_use]
    pub fn new(address: &str) -> Option<Self> {
        match redis::Client::open(address) {
            Ok(client) => Some(Self { client }),
            Err(e) => {
                debug!(address, error = %e, "remote cache disabled, bad address");
                None
            },
        }
    }

    /// Fetches an entry; any failure is a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                debug!(error = %e, "remote cache connect failed");
                return None;
            },
        };
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "remote cache get failed");
                None
            },
        }
    }

    /// Stores an entry with a millisecond TTL; failures are swallowed.
    pub async fn set(&self, key: &str, bytes: &[u8], ttl: Duration) {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                debug!(error = %e, "remote cache connect failed");
                return;
            },
        };
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let result: redis::RedisResult<()> = redis::cmd("SET")
            .arg(key)
            .arg(bytes)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            debug!(error = %e, "remote cache set failed");
        }
    }
}
