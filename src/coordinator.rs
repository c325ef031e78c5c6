//! The request path state machine and coordinator lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::keys;
use crate::registry::{self, ControlHandle};
use crate::store::Store;

/// Coordinates single-flight computation of resources under one
/// `resourceTag`, atop a shared [`Store`].
///
/// Construction subscribes the store's `{tag}/notif:*` pattern and starts
/// the dispatcher task; [`Coordinator::close`] tears both down.
pub struct Coordinator {
    store: Arc<dyn Store>,
    tag: String,
    control: ControlHandle,
}

impl Coordinator {
    /// Subscribes `{tag}/notif:*` on `store` and starts the dispatcher.
    /// Failure to establish the pattern subscription is fatal.
    pub async fn new(store: Arc<dyn Store>, tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        let pattern = keys::notif_pattern(&tag);
        let notifications = store.psubscribe(&pattern).await?;
        let control = registry::spawn(notifications);
        log::debug!("memolock coordinator for tag {tag:?} subscribed to {pattern:?}");
        Ok(Self {
            store,
            tag,
            control,
        })
    }

    /// Stops the dispatcher. Every outstanding `get_resource` call waiting on
    /// a notification resolves with `Error::Closing`; calls made afterward
    /// also fail the same way, since the dispatcher is no longer there to
    /// register or notify subscriptions. Takes `&self`, not `self`, so it is
    /// reachable through a shared `Arc<Coordinator>` while other callers are
    /// still waiting (mirroring the Go source's `Close()`, a
    /// pointer-receiver method rather than one that consumes the client).
    pub fn close(&self) {
        self.control.shutdown();
        log::debug!("memolock coordinator for tag {:?} closed", self.tag);
    }

    /// Fast-path read, try-lock, compute-or-subscribe, recheck, wait.
    ///
    /// `compute` produces `(value, cache_ttl)` on success. `ttl` bounds how
    /// long the caller is willing to let a winner hold the compute lock; it
    /// is unrelated to `cache_ttl`, which bounds how long the computed value
    /// stays fresh in the store.
    pub async fn get_resource<F, Fut, E>(
        &self,
        id: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<(String, Duration), E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let value_key = keys::value_key(&self.tag, id);
        let lock_key = keys::lock_key(&self.tag, id);
        let notif_channel = keys::notif_channel(&self.tag, id);

        // Step 1: fast path read.
        if let Some(value) = self.store.get(&value_key).await? {
            return Ok(value);
        }

        // Step 2: try to become the computer.
        let token = Uuid::new_v4().to_string();
        let acquired = self.store.set_nx(&lock_key, &token, ttl).await?;

        if acquired {
            // Step 3: winner branch.
            let (value, cache_ttl) = compute()
                .await
                .map_err(|err| Error::ComputeFailed(Box::new(err)))?;
            self.store
                .set_and_publish(&value_key, &value, cache_ttl, &notif_channel)
                .await?;
            return Ok(value);
        }

        // Step 4: loser branch, subscribe before recheck.
        let (sink_id, waiter) = self.control.subscribe(notif_channel.clone()).await?;

        // Step 5: recheck, closing the race between the first read and the
        // subscription becoming active.
        match self.store.get(&value_key).await {
            Ok(Some(value)) => {
                self.control.unsubscribe(notif_channel, sink_id);
                return Ok(value);
            }
            Ok(None) => {}
            Err(err) => {
                self.control.unsubscribe(notif_channel, sink_id);
                return Err(err);
            }
        }

        // Step 6: wait for exactly one event on the sink.
        match waiter.await {
            Ok(registry::SinkSignal::Value(value)) => Ok(value),
            Ok(registry::SinkSignal::Lost) => Err(Error::SubscriptionLost),
            Err(_) => Err(Error::Closing),
        }
    }
}
