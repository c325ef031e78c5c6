//! Key and channel name derivation.
//!
//! A resource is identified by a caller-supplied id; everything else is
//! derived from the coordinator's `resourceTag` and this id. Bit-exact with
//! the templates the original Go implementation used, so a Rust coordinator
//! and the Go original can interoperate against the same store if ever run
//! side by side.

/// `{tag}:{id}`, holds the cached value, expires after the compute TTL.
pub fn value_key(tag: &str, id: &str) -> String {
    format!("{tag}:{id}")
}

/// `{tag}/lock:{id}`, holds a per-attempt unique token while a compute is
/// in flight, expires after the lock TTL.
pub fn lock_key(tag: &str, id: &str) -> String {
    format!("{tag}/lock:{id}")
}

/// `{tag}/notif:{id}`, carries exactly one message per successful compute.
pub fn notif_channel(tag: &str, id: &str) -> String {
    format!("{tag}/notif:{id}")
}

/// `{tag}/notif:*`, the single pattern subscribed at construction time,
/// multiplexing notifications for every resource under `tag`.
pub fn notif_pattern(tag: &str) -> String {
    format!("{tag}/notif:*")
}
