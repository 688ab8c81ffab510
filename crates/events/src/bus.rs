//! Publish/subscribe abstraction for sync notifications.
//!
//! Synchronizers publish one message per settled mutation or load. The bus is
//! fire-and-forget from the publisher's point of view: a failed publish is
//! logged by the caller, never turned into a sync failure.
//!
//! - Broadcast: every live subscription receives every message.
//! - Ordering: messages from one publisher arrive in publish order.
//! - No persistence: a subscription only sees messages published after it was
//!   created.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a message stream.
///
/// ```ignore
/// let events = session.subscribe();
///
/// while let Ok(event) = events.try_recv() {
///     if event.outcome == MutationOutcome::RolledBack {
///         notify_user(&event);
///     }
/// }
/// ```
///
/// Dropping the subscription unregisters it on the next publish.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything published so far that has not been received yet.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Transport-agnostic pub/sub bus.
///
/// Implementations must be shareable across tasks; several synchronizers may
/// publish to one bus concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
