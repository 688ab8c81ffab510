//! `oneflow-sync`: optimistic cache synchronization against REST collections.
//!
//! A [`Synchronizer`] owns one [`EntityCache`] and one [`RemoteCollection`].
//! Every user-initiated create/update/delete is applied to the cache first,
//! sent to the backend, then either reconciled with the backend's answer or
//! rolled back to the pre-call snapshot.
//!
//! - Mutations on the same id run one at a time, in call order.
//! - Remote calls are wrapped in a per-operation [`RetryPolicy`].
//! - Every settlement is logged through `tracing` and published as a
//!   [`oneflow_events::SyncEvent`].

pub mod cache;
pub mod error;
mod locks;
mod pending;
pub mod remote;
pub mod retry;
pub mod synchronizer;

pub use cache::EntityCache;
pub use error::{SyncError, SyncResult};
pub use remote::{InMemoryCollection, RemoteCollection, RemoteOp};
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};
pub use synchronizer::Synchronizer;
