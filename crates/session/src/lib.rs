//! `provilink-session`: the storefront's session store and per-view accessor.
//!
//! The store owns "who is signed in" for one client context: it authenticates
//! against a [`CredentialDirectory`](provilink_auth::CredentialDirectory),
//! mirrors the current identity into a persisted slot and notifies listeners
//! after every transition. Views read it through a [`SessionAccessor`].

pub mod accessor;
pub mod config;
pub mod error;
pub mod slot;
pub mod store;

pub use accessor::SessionAccessor;
pub use config::{ConfigError, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use slot::{FileSlot, MemorySlot, SlotError, SlotStorage, default_data_dir};
pub use store::{SessionSnapshot, SessionStore, load_persisted};
