//! The store contract: anything providing atomic set-if-absent with TTL,
//! get, unconditional set, publish, and pattern-subscribe suffices as a
//! backend for [`crate::Coordinator`].

mod redis_store;

pub use redis_store::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::Result;

/// A stream of `(channel, payload)` pairs delivered by a pattern
/// subscription, in delivery order, at most once per subscriber.
pub type NotificationStream = BoxStream<'static, (String, String)>;

/// Key-value store with pattern pub/sub.
///
/// Implementations must be safe to share across many concurrent callers:
/// `Coordinator` holds an `Arc<dyn Store>` and calls these methods from many
/// tasks at once.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// `GET(key)`. `Ok(None)` means the key is absent; `Ok(Some(_))` is a
    /// hit. A real backend error must never be conflated with "missing".
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// `SET(key, value, ttl)`, unconditional.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// `SETNX(key, value, ttl)`. Returns `true` if this call set the key
    /// (i.e. the caller acquired the lock), `false` if it was already
    /// present.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Sets `value_key` to `value` with `ttl` and publishes `value` on
    /// `channel`, as a single batched exchange with the store where the
    /// backend supports pipelining.
    async fn set_and_publish(
        &self,
        value_key: &str,
        value: &str,
        ttl: Duration,
        channel: &str,
    ) -> Result<()>;

    /// `PSUBSCRIBE(pattern)`. The returned stream must deliver
    /// at-most-once per subscriber, ordered per channel, for the lifetime
    /// of the coordinator.
    async fn psubscribe(&self, pattern: &str) -> Result<NotificationStream>;
}
