//! Production [`Store`] backed by Redis. The Go original used
//! `github.com/go-redis/redis`; this translates the same operations to the
//! `redis` crate's async API.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{NotificationStream, Store};
use crate::error::Result;

/// A `Store` implementation talking to a real Redis (or Redis-protocol
/// compatible) server.
///
/// Cloning is cheap: the underlying `ConnectionManager` is itself an `Arc`
/// over a reconnecting multiplexed connection, so `RedisStore` can be shared
/// across tasks the same way the Go source shares a single `*redis.Client`.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { client, conn })
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    // Redis TTLs are whole seconds; round up so a sub-second caller-supplied
    // ttl never collapses to "no expiry".
    ttl.as_secs().max(1)
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        // SET key value NX EX ttl: atomic set-if-absent with expiry in one
        // round trip.
        let acquired: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(acquired.is_some())
    }

    async fn set_and_publish(
        &self,
        value_key: &str,
        value: &str,
        ttl: Duration,
        channel: &str,
    ) -> Result<()> {
        let mut conn = self.conn.clone();
        // Single pipelined round trip: the value becomes visible and the
        // notification goes out atomically with respect to this connection.
        let _: () = redis::pipe()
            .atomic()
            .set_ex(value_key, value, ttl_secs(ttl))
            .publish(channel, value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn psubscribe(&self, pattern: &str) -> Result<NotificationStream> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe(pattern).await?;
        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let channel = msg.get_channel_name().to_string();
            match msg.get_payload::<String>() {
                Ok(payload) => Some((channel, payload)),
                Err(_) => None,
            }
        });
        Ok(Box::pin(stream))
    }
}
