//! `provilink-events`: change notification fan-out.
//!
//! Mechanics only: the session store publishes snapshots, consumers receive
//! them either through registered callbacks or through channel subscriptions.

pub mod bus;
pub mod registry;

pub use bus::{EventBus, Subscription};
pub use registry::{ListenerId, ListenerRegistry, RegistryError, Unsubscribe};
