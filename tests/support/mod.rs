//! Hand-rolled in-memory `Store` double used across the integration tests.
//!
//! Uses `tokio::sync::broadcast` to fan a published payload out to many
//! pattern subscribers, without any real network I/O.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::stream;
use memolock::store::{NotificationStream, Store};
use memolock::{Error, Result};
use tokio::sync::broadcast;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Deterministic, network-free [`Store`]. Expiry is honored on read (lazy,
/// like a real TTL store's key disappearing at the server rather than on a
/// client-side timer). `set_nx` is atomic with respect to other calls on the
/// same `FakeStore` because the whole map is behind one mutex.
pub struct FakeStore {
    data: Mutex<HashMap<String, Entry>>,
    notify: broadcast::Sender<(String, String)>,
    fail_get: std::sync::atomic::AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(256);
        Self {
            data: Mutex::new(HashMap::new()),
            notify,
            fail_get: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Makes the next `get` call return `Error::StoreUnavailable`, simulating
    /// a backend outage.
    pub fn fail_next_get(&self) {
        self.fail_get.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn unavailable() -> Error {
        Error::StoreUnavailable(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "fake store: simulated outage",
        )))
    }
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_get.swap(false, std::sync::atomic::Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let mut data = self.data.lock().unwrap();
        if let Some(entry) = data.get(key) {
            if entry.expires_at <= Instant::now() {
                data.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        if let Some(entry) = data.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(false);
            }
        }
        data.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn set_and_publish(
        &self,
        value_key: &str,
        value: &str,
        ttl: Duration,
        channel: &str,
    ) -> Result<()> {
        self.set(value_key, value, ttl).await?;
        // No subscribers is not an error for a real pub/sub channel either.
        let _ = self.notify.send((channel.to_string(), value.to_string()));
        Ok(())
    }

    async fn psubscribe(&self, pattern: &str) -> Result<NotificationStream> {
        let rx = self.notify.subscribe();
        let prefix = pattern.trim_end_matches('*').to_string();
        Ok(Box::pin(stream::unfold(
            (rx, prefix),
            |(mut rx, prefix)| async move {
                loop {
                    match rx.recv().await {
                        Ok((channel, payload)) if channel.starts_with(&prefix) => {
                            return Some(((channel, payload), (rx, prefix)));
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            },
        )))
    }
}
