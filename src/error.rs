//! Error kinds the coordinator distinguishes.
//!
//! The core never retries (see `Coordinator::get_resource`); every variant
//! here is surfaced to the caller as-is, per the recovery policy.

/// Errors produced by the coordinator and the stores it talks to.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A store operation (`GET`, `SETNX`, `SET`, `PUBLISH`, `PSUBSCRIBE`)
    /// failed. Never retried internally; the caller owns retry policy.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] redis::RedisError),

    /// The caller-supplied `compute` closure returned an error. The lock key
    /// is intentionally left in place to expire with its TTL rather than
    /// being deleted, to avoid a thundering herd against a persistently
    /// failing dependency.
    #[error("compute failed: {0}")]
    ComputeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The coordinator was closed while this call was waiting for a
    /// notification.
    #[error("operation canceled by coordinator shutdown")]
    Closing,

    /// The store's pattern-subscription stream ended on its own, not
    /// because `Coordinator::close` was called. Every waiter registered at
    /// the time is resolved with this error and the dispatcher shuts down;
    /// calls made afterward instead see `Closing`, the same as any other
    /// call made after shutdown.
    #[error("pattern subscription stream ended")]
    SubscriptionLost,

    /// Configuration could not be loaded or parsed (ambient concern, not
    /// part of the core request path).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
