//! Channel side of change notification.
//!
//! Callbacks suit views that re-render inline; a [`Subscription`] suits
//! consumers on another thread (a background sync, a log shipper) that pull
//! snapshots at their own pace. Every subscription receives its own copy of
//! every published snapshot, in publish order.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// Receiving end of a channel subscription.
///
/// ```ignore
/// let changes = store.subscribe_channel();
/// while let Some(snapshot) = changes.next_timeout(Duration::from_secs(1)) {
///     sync_profile(snapshot.as_ref());
/// }
/// ```
///
/// Dropping it detaches; the publisher prunes the closed sender on its next
/// publish.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub(crate) fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Next snapshot if one is already buffered.
    pub fn try_next(&self) -> Option<M> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next snapshot. `None` on timeout or once
    /// the publisher is gone.
    pub fn next_timeout(&self, timeout: Duration) -> Option<M> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every buffered snapshot, oldest first.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }

    /// Skip to the most recent buffered snapshot, discarding older ones.
    ///
    /// `None` means nothing changed since the last read.
    pub fn latest(&self) -> Option<M> {
        self.receiver.try_iter().last()
    }
}

/// Publisher contract for in-process snapshot fan-out.
///
/// Publishing is synchronous and never blocks on slow subscribers.
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
