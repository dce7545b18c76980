//! The session store: single source of truth for who is signed in.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use provilink_auth::{CredentialDirectory, Identity, MockDirectory, RegistrationProfile};
use provilink_events::{EventBus, ListenerRegistry, Subscription, Unsubscribe};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::slot::{MemorySlot, SlotStorage};

/// Snapshot delivered to listeners after every transition.
pub type SessionSnapshot = Option<Identity>;

/// Holds at most one current [`Identity`], mirrors it into a persisted slot
/// and fans changes out to listeners.
///
/// Build one per client (or per request when rendering server-side) and
/// share it as `Arc<SessionStore>`.
///
/// ## Concurrency
///
/// Transitions (`login`, `register`, `logout`) are serialized: setting the
/// identity, persisting it and queueing its snapshot happen under one lock,
/// so the persisted value always equals the last queued snapshot. Two racing
/// logins resolve last-writer-wins.
///
/// Snapshots are delivered in transition order, outside that lock. A
/// listener may start a transition itself (e.g. `logout` on a notification);
/// its snapshot is delivered after the current round finishes.
pub struct SessionStore {
    current: RwLock<SessionSnapshot>,
    transition: Mutex<()>,
    outbox: Mutex<Outbox>,
    listeners: ListenerRegistry<SessionSnapshot>,
    slot: Arc<dyn SlotStorage>,
    directory: Arc<dyn CredentialDirectory>,
    config: SessionConfig,
}

impl SessionStore {
    /// Open the store, recovering from a bad persisted slot.
    ///
    /// A corrupt record is discarded (and removed) with a single warning;
    /// an unreadable slot is treated as empty.
    ///
    /// Fails only when `config` does not validate.
    pub fn open(
        config: SessionConfig,
        slot: Arc<dyn SlotStorage>,
        directory: Arc<dyn CredentialDirectory>,
    ) -> SessionResult<Self> {
        config.validate()?;

        let initial = match load_persisted(slot.as_ref(), &config.storage_key) {
            Ok(identity) => identity,
            Err(SessionError::CorruptState(reason)) => {
                tracing::warn!(
                    key = %config.storage_key,
                    %reason,
                    "discarding corrupt persisted session"
                );
                if let Err(err) = slot.remove(&config.storage_key) {
                    tracing::error!("failed to remove corrupt session slot: {err}");
                }
                None
            }
            Err(err) => {
                tracing::warn!(key = %config.storage_key, "persisted session unreadable, starting signed out: {err}");
                None
            }
        };

        Ok(Self::with_initial(config, slot, directory, initial))
    }

    /// Open the store, failing on an invalid config or a corrupt or
    /// unreadable slot.
    pub fn open_strict(
        config: SessionConfig,
        slot: Arc<dyn SlotStorage>,
        directory: Arc<dyn CredentialDirectory>,
    ) -> SessionResult<Self> {
        config.validate()?;
        let initial = load_persisted(slot.as_ref(), &config.storage_key)?;
        Ok(Self::with_initial(config, slot, directory, initial))
    }

    /// Default config, seeded storefront directory, in-memory slot.
    pub fn in_memory() -> Self {
        Self::with_initial(
            SessionConfig::default(),
            Arc::new(MemorySlot::new()),
            Arc::new(MockDirectory::storefront()),
            None,
        )
    }

    fn with_initial(
        config: SessionConfig,
        slot: Arc<dyn SlotStorage>,
        directory: Arc<dyn CredentialDirectory>,
        initial: SessionSnapshot,
    ) -> Self {
        if let Some(identity) = &initial {
            tracing::info!(identity_id = %identity.id, role = %identity.role, "restored persisted session");
        }

        Self {
            current: RwLock::new(initial),
            transition: Mutex::new(()),
            outbox: Mutex::new(Outbox::default()),
            listeners: ListenerRegistry::new(),
            slot,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn get_current(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Same answer as [`is_authenticated`](Self::is_authenticated).
    pub fn require_auth(&self) -> bool {
        self.is_authenticated()
    }

    /// Look up `email`/`password` in the directory and make the match current.
    ///
    /// Waits the configured latency first. On failure the current identity is
    /// left untouched.
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<Identity> {
        tokio::time::sleep(self.config.login_latency()).await;

        let Some(identity) = self.directory.authenticate(email, password) else {
            tracing::warn!(email, "login rejected: invalid credentials");
            return Err(SessionError::InvalidCredentials);
        };

        self.transition(Some(identity.clone()));
        tracing::info!(identity_id = %identity.id, role = %identity.role, "signed in");
        Ok(identity)
    }

    /// Create a new identity from `profile` and make it current.
    ///
    /// Never fails: there is no uniqueness check against existing emails.
    pub async fn register(&self, profile: &RegistrationProfile) -> Identity {
        tokio::time::sleep(self.config.login_latency()).await;

        let identity = Identity::register(profile, self.config.default_location.clone());
        self.transition(Some(identity.clone()));
        tracing::info!(identity_id = %identity.id, role = %identity.role, "registered and signed in");
        identity
    }

    /// Clear the current identity and the persisted slot.
    ///
    /// Listeners are notified even when nobody was signed in.
    pub fn logout(&self) {
        let previous = self.transition(None);
        match previous {
            Some(identity) => tracing::info!(identity_id = %identity.id, "signed out"),
            None => tracing::debug!("logout without an active session"),
        }
    }

    /// Register a callback invoked with the new identity (or `None`) after
    /// every transition.
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        self.listeners
            .subscribe(move |snapshot: &SessionSnapshot| callback(snapshot.as_ref()))
    }

    /// Channel flavour of [`subscribe`](Self::subscribe).
    pub fn subscribe_channel(&self) -> Subscription<SessionSnapshot> {
        EventBus::subscribe(&self.listeners)
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Replace the current identity, persist, notify. Returns the previous one.
    fn transition(&self, next: SessionSnapshot) -> SessionSnapshot {
        let previous = {
            let _serialized = self.transition.lock().unwrap_or_else(PoisonError::into_inner);

            let previous = {
                let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
                std::mem::replace(&mut *current, next.clone())
            };

            self.persist(next.as_ref());
            self.outbox
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pending
                .push_back(next);
            previous
        };

        self.deliver();
        previous
    }

    /// Drain queued snapshots to listeners, one round at a time.
    ///
    /// Only one caller delivers at once; anyone arriving while a round is in
    /// progress (including a listener re-entering the store) leaves its
    /// snapshot queued for the active deliverer.
    fn deliver(&self) {
        {
            let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
            if outbox.delivering {
                return;
            }
            outbox.delivering = true;
        }
        let _unwind = ResetOnPanic(&self.outbox);

        loop {
            let snapshot = {
                let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
                match outbox.pending.pop_front() {
                    Some(snapshot) => snapshot,
                    None => {
                        outbox.delivering = false;
                        return;
                    }
                }
            };

            match self.listeners.notify(&snapshot) {
                Ok(delivered) => tracing::debug!(delivered, "session change notified"),
                Err(err) => tracing::error!("failed to notify session listeners: {err}"),
            }
        }
    }

    fn persist(&self, identity: Option<&Identity>) {
        let key = &self.config.storage_key;
        let result = match identity {
            Some(identity) => match serde_json::to_string(identity) {
                Ok(payload) => self.slot.write(key, &payload),
                Err(err) => {
                    tracing::error!("failed to serialize identity for the session slot: {err}");
                    return;
                }
            },
            None => self.slot.remove(key),
        };

        if let Err(err) = result {
            tracing::error!(key = %key, "failed to update session slot: {err}");
        }
    }
}

#[derive(Debug, Default)]
struct Outbox {
    pending: VecDeque<SessionSnapshot>,
    delivering: bool,
}

/// Releases the delivery role when a listener panics mid-round; queued
/// snapshots go out with the next transition.
struct ResetOnPanic<'a>(&'a Mutex<Outbox>);

impl Drop for ResetOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .delivering = false;
        }
    }
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .field("subscribers", &self.subscriber_count())
            .field("slot", &self.slot)
            .field("config", &self.config)
            .finish()
    }
}

/// Read and validate the persisted identity, if any.
pub fn load_persisted(slot: &dyn SlotStorage, key: &str) -> SessionResult<SessionSnapshot> {
    let Some(raw) = slot.read(key)? else {
        return Ok(None);
    };

    let identity: Identity =
        serde_json::from_str(&raw).map_err(|e| SessionError::CorruptState(e.to_string()))?;
    identity
        .validate()
        .map_err(|e| SessionError::CorruptState(e.to_string()))?;

    Ok(Some(identity))
}
