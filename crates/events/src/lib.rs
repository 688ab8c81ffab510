//! Sync notifications and the pub/sub plumbing that carries them.

pub mod bus;
pub mod in_memory_bus;
pub mod sync_event;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use sync_event::{MutationKind, MutationOutcome, SyncEvent};
