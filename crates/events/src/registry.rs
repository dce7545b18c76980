//! In-process listener registry (callbacks + channels).

use std::sync::{Arc, Mutex, Weak, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

type Callback<M> = Arc<dyn Fn(&M) + Send + Sync>;

/// Handle identifying one registered callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl core::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Publish failed due to internal lock poisoning.
    #[error("listener registry lock poisoned")]
    Poisoned,
}

struct Listeners<M> {
    next_id: u64,
    callbacks: Vec<(ListenerId, Callback<M>)>,
    channels: Vec<mpsc::Sender<M>>,
}

impl<M> Default for Listeners<M> {
    fn default() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
            channels: Vec::new(),
        }
    }
}

/// Ordered set of listeners with snapshot fan-out.
///
/// - Callbacks run in registration order, outside the registry lock, over a
///   copy of the listener list. A callback may therefore unsubscribe itself
///   (or anyone else) while a notification is in flight; removals take
///   effect from the next notification.
/// - Channel subscribers get a clone of every message; dead receivers are
///   pruned while publishing.
pub struct ListenerRegistry<M> {
    listeners: Arc<Mutex<Listeners<M>>>,
}

impl<M> ListenerRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Keep the returned token to remove it later.
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&M) + Send + Sync + 'static,
        M: Send + 'static,
    {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let id = ListenerId(listeners.next_id);
        listeners.next_id += 1;
        listeners.callbacks.push((id, Arc::new(callback)));

        let weak: Weak<Mutex<Listeners<M>>> = Arc::downgrade(&self.listeners);
        Unsubscribe {
            id,
            detach: Box::new(move |id| {
                let Some(listeners) = weak.upgrade() else {
                    return false;
                };
                let mut listeners = listeners
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let before = listeners.callbacks.len();
                listeners.callbacks.retain(|(existing, _)| *existing != id);
                listeners.callbacks.len() != before
            }),
        }
    }

    /// Number of registered callbacks (channel subscribers excluded).
    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .map(|listeners| listeners.callbacks.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M: Clone> ListenerRegistry<M> {
    /// Deliver `message` to every listener. Returns how many received it.
    pub fn notify(&self, message: &M) -> Result<usize, RegistryError> {
        let (callbacks, channel_count) = {
            let mut listeners = self.listeners.lock().map_err(|_| RegistryError::Poisoned)?;

            // Drop any dead channel subscribers while publishing.
            listeners.channels.retain(|tx| tx.send(message.clone()).is_ok());

            let callbacks: Vec<Callback<M>> = listeners
                .callbacks
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect();
            (callbacks, listeners.channels.len())
        };

        for callback in &callbacks {
            callback(message);
        }

        tracing::trace!(
            callbacks = callbacks.len(),
            channels = channel_count,
            "listeners notified"
        );

        Ok(callbacks.len() + channel_count)
    }
}

impl<M> Default for ListenerRegistry<M> {
    fn default() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }
}

impl<M> core::fmt::Debug for ListenerRegistry<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("callbacks", &self.len())
            .finish()
    }
}

impl<M> EventBus<M> for ListenerRegistry<M>
where
    M: Clone + Send + 'static,
{
    type Error = RegistryError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        self.notify(&message).map(|_| ())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages.
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.channels.push(tx);
        }

        Subscription::new(rx)
    }
}

/// Token returned by [`ListenerRegistry::subscribe`].
///
/// Dropping the token does **not** remove the listener; call
/// [`Unsubscribe::unsubscribe`].
#[must_use = "the listener stays registered until `unsubscribe` is called"]
pub struct Unsubscribe {
    id: ListenerId,
    detach: Box<dyn FnOnce(ListenerId) -> bool + Send>,
}

impl Unsubscribe {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener. Returns `false` when it was already gone (or the
    /// registry itself has been dropped).
    pub fn unsubscribe(self) -> bool {
        (self.detach)(self.id)
    }
}

impl core::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Unsubscribe").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn callbacks_run_in_registration_order() {
        let registry = ListenerRegistry::<u32>::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let _a = {
            let seen = Arc::clone(&seen);
            registry.subscribe(move |m| seen.lock().unwrap().push(("a", *m)))
        };
        let _b = {
            let seen = Arc::clone(&seen);
            registry.subscribe(move |m| seen.lock().unwrap().push(("b", *m)))
        };

        assert_eq!(registry.notify(&7).unwrap(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let registry = ListenerRegistry::<u32>::new();
        let hits = Arc::new(StdMutex::new(Vec::new()));

        let a = {
            let hits = Arc::clone(&hits);
            registry.subscribe(move |_| hits.lock().unwrap().push("a"))
        };
        let _b = {
            let hits = Arc::clone(&hits);
            registry.subscribe(move |_| hits.lock().unwrap().push("b"))
        };

        assert!(a.unsubscribe());
        registry.notify(&1).unwrap();

        assert_eq!(*hits.lock().unwrap(), vec!["b"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn listener_can_unsubscribe_itself_during_notify() {
        let registry = ListenerRegistry::<u32>::new();
        let slot: Arc<StdMutex<Option<Unsubscribe>>> = Arc::new(StdMutex::new(None));
        let calls = Arc::new(StdMutex::new(0u32));

        let token = {
            let slot = Arc::clone(&slot);
            let calls = Arc::clone(&calls);
            registry.subscribe(move |_| {
                *calls.lock().unwrap() += 1;
                if let Some(token) = slot.lock().unwrap().take() {
                    token.unsubscribe();
                }
            })
        };
        *slot.lock().unwrap() = Some(token);

        registry.notify(&1).unwrap();
        registry.notify(&2).unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn unsubscribe_after_registry_dropped_is_harmless() {
        let registry = ListenerRegistry::<u32>::new();
        let token = registry.subscribe(|_| {});
        drop(registry);
        assert!(!token.unsubscribe());
    }

    #[test]
    fn channel_subscribers_receive_and_are_pruned() {
        let registry = ListenerRegistry::<&'static str>::new();
        let live = EventBus::subscribe(&registry);
        let dead = EventBus::subscribe(&registry);
        drop(dead);

        registry.publish("first").unwrap();
        assert_eq!(registry.notify(&"second").unwrap(), 1);
        assert_eq!(live.drain(), vec!["first", "second"]);
    }
}
