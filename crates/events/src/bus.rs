//! Publish/subscribe abstraction for outbound messages.
//!
//! The bus is the **transport layer** for messages that leave the domain core
//! (dashboard broadcasts, channel notifications). It sits strictly *after*
//! the owning unit of work: domain state is committed first, messages are
//! published second, so a failing transport can never roll back a ledger
//! mutation.
//!
//! Design constraints:
//!
//! - **Transport-agnostic**: in-memory channels for tests/dev, Redis pub/sub
//!   or a broker in deployment.
//! - **Best-effort**: at-most-once is acceptable for broadcasts; subscribers
//!   that need stronger guarantees must source state elsewhere.
//! - **No storage assumptions**: the bus distributes, it does not persist.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a message stream.
///
/// Each subscription receives a copy of every message published to the bus
/// after the subscription was taken (broadcast semantics). Subscriptions are
/// designed for single-threaded consumption; hand out one per consumer
/// thread.
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
}

/// Message bus (pub/sub abstraction).
///
/// `publish()` can fail (transport unreachable, bus full). Callers in the
/// broadcast layer log such failures and move on; they are never surfaced
/// as domain errors. The trait requires `Send + Sync` so one bus instance
/// can be shared across worker threads.
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
