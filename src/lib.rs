//! Distributed single-flight memoization lock.
//!
//! [`Coordinator`] sits between application callers and a remote key-value
//! store that also provides pattern-based publish/subscribe (see
//! [`store::Store`]). When many concurrent callers ask for the value of the
//! same resource, exactly one of them computes it while the rest wait and
//! receive the same result as soon as it is ready.
//!
//! ```no_run
//! # use memolock::{Coordinator, store::Store};
//! # use std::{sync::Arc, time::Duration};
//! # async fn run(store: Arc<dyn Store>) -> memolock::Result<()> {
//! let coordinator = Coordinator::new(store, "query").await?;
//! let value = coordinator
//!     .get_resource("some-id", Duration::from_secs(5), || async {
//!         Ok::<_, Box<dyn std::error::Error + Send + Sync>>((
//!             "computed value".to_string(),
//!             Duration::from_secs(60),
//!         ))
//!     })
//!     .await?;
//! # let _ = value;
//! coordinator.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod keys;
mod registry;
pub mod store;

pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use error::{Error, Result};
