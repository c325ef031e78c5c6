//! Subscription registry and dispatcher.
//!
//! The dispatcher is the single owner of the subscription registry and the
//! sole consumer of the store's pub/sub stream, eliminating locking on the
//! hot path and keeping lost-wakeup reasoning local to one task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};

use crate::store::NotificationStream;

/// What a waiter sink is resolved with.
pub(crate) enum SinkSignal {
    /// The payload published on the channel the waiter was subscribed to.
    Value(String),
    /// The store's pattern subscription stream ended. Distinct from a
    /// dispatcher shutdown: the coordinator is not closing on purpose, its
    /// connection to the store's notifications broke.
    Lost,
}

/// A single-slot delivery point for one waiting caller.
///
/// `oneshot::Sender::send` never blocks, even if the paired `Receiver` was
/// already dropped (an abandoned waiter, e.g. a cancelled caller). The
/// dispatcher's write into this sink must never block, and this primitive
/// gives that for free.
pub type WaiterSink = oneshot::Sender<SinkSignal>;

/// Unique id assigned to each waiter sink so it can be removed from the
/// registry by identity. `oneshot::Sender` has no `PartialEq`, so the source
/// material's "remove this channel from the list" (a pointer comparison in
/// Go) is realized here as a removal by id instead.
pub type SinkId = u64;

#[derive(Default)]
struct SinkIdAllocator(AtomicU64);

impl SinkIdAllocator {
    fn next(&self) -> SinkId {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Requests sent from a request path to the dispatcher.
pub(crate) enum ControlMsg {
    Subscribe {
        channel: String,
        sink_id: SinkId,
        sink: WaiterSink,
        /// Fired once the sink is recorded in the registry. Awaiting this
        /// is what lets the request path prove "my subscription is live"
        /// before issuing its recheck `GET`, a stronger, more explicit
        /// realization of the Go source's zero-buffer rendezvous channel,
        /// since `tokio::sync::mpsc` has no zero-capacity variant to rely
        /// on for ordering.
        ack: oneshot::Sender<()>,
    },
    Unsubscribe {
        channel: String,
        sink_id: SinkId,
    },
    /// Stops the dispatcher. Sent through the same handle every clone of a
    /// `Coordinator` shares, rather than modeled as dropping the sender,
    /// because shutdown must be reachable through `&self` (mirroring the Go
    /// source's `Close()`, a pointer-receiver method, not one that consumes
    /// the only handle to the client).
    Shutdown,
}

/// Handle used by request paths to talk to the dispatcher.
#[derive(Clone)]
pub(crate) struct ControlHandle {
    tx: mpsc::Sender<ControlMsg>,
    ids: std::sync::Arc<SinkIdAllocator>,
}

impl ControlHandle {
    /// Registers a waiter sink for `channel` and waits for the dispatcher's
    /// acknowledgement that it is live. Returns the sink's id (needed to
    /// unsubscribe later) and the receiving half of the sink.
    pub(crate) async fn subscribe(
        &self,
        channel: String,
    ) -> Result<(SinkId, oneshot::Receiver<SinkSignal>), crate::error::Error> {
        let sink_id = self.ids.next();
        let (sink, recv) = oneshot::channel();
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(ControlMsg::Subscribe {
                channel,
                sink_id,
                sink,
                ack: ack_tx,
            })
            .await
            .map_err(|_| crate::error::Error::Closing)?;
        ack_rx.await.map_err(|_| crate::error::Error::Closing)?;
        Ok((sink_id, recv))
    }

    /// Fire-and-forget unsubscribe: no later step depends on this having
    /// completed, so a dropped message on a full channel is acceptable; the
    /// sink is simply read at most once regardless, per its single-slot
    /// contract.
    pub(crate) fn unsubscribe(&self, channel: String, sink_id: SinkId) {
        let _ = self.tx.try_send(ControlMsg::Unsubscribe { channel, sink_id });
    }

    /// Requests dispatcher shutdown. Idempotent: once the dispatcher has
    /// exited, the channel is closed and this becomes a no-op.
    pub(crate) fn shutdown(&self) {
        let _ = self.tx.try_send(ControlMsg::Shutdown);
    }
}

/// Owns the registry (`channel name` → ordered waiter sinks) and the sole
/// consumer end of the store's notification stream.
pub(crate) struct Dispatcher {
    control_rx: mpsc::Receiver<ControlMsg>,
    notifications: NotificationStream,
    registry: HashMap<String, Vec<(SinkId, WaiterSink)>>,
}

/// Spawns the dispatcher task and returns the handle request paths use to
/// reach it.
pub(crate) fn spawn(notifications: NotificationStream) -> ControlHandle {
    let (tx, rx) = mpsc::channel(64);
    let dispatcher = Dispatcher {
        control_rx: rx,
        notifications,
        registry: HashMap::new(),
    };
    tokio::spawn(dispatcher.run());
    ControlHandle {
        tx,
        ids: std::sync::Arc::new(SinkIdAllocator::default()),
    }
}

impl Dispatcher {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                control = self.control_rx.recv() => {
                    match control {
                        Some(ControlMsg::Shutdown) => {
                            log::debug!("memolock dispatcher: shutdown requested");
                            break;
                        }
                        Some(msg) => self.handle_control(msg),
                        None => {
                            log::debug!("memolock dispatcher: control handle dropped, shutting down");
                            break;
                        }
                    }
                }

                notification = self.notifications.next() => {
                    match notification {
                        Some((channel, payload)) => self.handle_notification(channel, payload),
                        None => {
                            log::error!("memolock dispatcher: pattern subscription stream ended");
                            self.notify_subscription_lost();
                            break;
                        }
                    }
                }
            }
        }
        self.shutdown();
    }

    fn handle_control(&mut self, msg: ControlMsg) {
        match msg {
            ControlMsg::Subscribe {
                channel,
                sink_id,
                sink,
                ack,
            } => {
                self.registry
                    .entry(channel)
                    .or_default()
                    .push((sink_id, sink));
                // Registry mutation happens-before this ack is observed by
                // the waiting request path.
                let _ = ack.send(());
            }
            ControlMsg::Unsubscribe { channel, sink_id } => {
                if let Some(list) = self.registry.get_mut(&channel) {
                    list.retain(|(id, _)| *id != sink_id);
                    if list.is_empty() {
                        self.registry.remove(&channel);
                    }
                }
            }
            ControlMsg::Shutdown => unreachable!("handled in run() before reaching handle_control"),
        }
    }

    fn handle_notification(&mut self, channel: String, payload: String) {
        if let Some(sinks) = self.registry.remove(&channel) {
            for (_, sink) in sinks {
                // Abandoned waiters (cancelled callers) simply drop the
                // receiver; `send` returning an error here is expected and
                // harmless, never a reason to block or retry.
                let _ = sink.send(SinkSignal::Value(payload.clone()));
            }
        }
    }

    /// Resolves every registered waiter with `SinkSignal::Lost` instead of
    /// leaving them to find out only once the sender is dropped, which
    /// would otherwise be indistinguishable from an ordinary shutdown.
    fn notify_subscription_lost(&mut self) {
        for (_, sinks) in self.registry.drain() {
            for (_, sink) in sinks {
                let _ = sink.send(SinkSignal::Lost);
            }
        }
    }

    fn shutdown(mut self) {
        // Any sink still registered here belongs to a waiter that has not
        // been told about a lost subscription; dropping its sender without
        // sending resolves the paired receiver to `RecvError`, which request
        // paths map to `Error::Closing`.
        self.registry.clear();
    }
}
