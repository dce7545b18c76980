//! Per-view handle over a shared [`SessionStore`].
//!
//! A view attaches an accessor, reads the mirrored identity and derived flags,
//! and drops it when it goes away. The accessor tracks a `loading` flag for
//! its own pending `login`/`register` calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use provilink_auth::{
    ActionDecision, GuardDecision, Identity, NavigationItem, ProtectedAction, RegistrationProfile,
};
use provilink_events::Unsubscribe;

use crate::error::SessionResult;
use crate::store::SessionStore;

#[derive(Debug, Default)]
struct Mirror {
    value: Option<Identity>,
    notified: bool,
}

pub struct SessionAccessor {
    store: Arc<SessionStore>,
    mirror: Arc<Mutex<Mirror>>,
    in_flight: AtomicUsize,
    subscription: Mutex<Option<Unsubscribe>>,
}

impl SessionAccessor {
    /// Subscribe to `store` and seed the mirror with its current identity.
    pub fn attach(store: Arc<SessionStore>) -> Self {
        let mirror = Arc::new(Mutex::new(Mirror::default()));

        let token = {
            let mirror = Arc::clone(&mirror);
            store.subscribe(move |identity| {
                let mut mirror = mirror.lock().unwrap_or_else(PoisonError::into_inner);
                mirror.value = identity.cloned();
                mirror.notified = true;
            })
        };

        // Seed after subscribing; a transition that lands in between wins.
        {
            let mut seeded = mirror.lock().unwrap_or_else(PoisonError::into_inner);
            if !seeded.notified {
                seeded.value = store.get_current();
            }
        }

        tracing::trace!(listener = %token.id(), "session accessor attached");

        Self {
            store,
            mirror,
            in_flight: AtomicUsize::new(0),
            subscription: Mutex::new(Some(token)),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.mirror
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.mirror
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .is_some()
    }

    /// True while a `login` or `register` started here is pending.
    pub fn loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn require_auth(&self) -> bool {
        self.store.require_auth()
    }

    pub async fn login(&self, email: &str, password: &str) -> SessionResult<Identity> {
        let _loading = LoadingGuard::start(&self.in_flight);
        self.store.login(email, password).await
    }

    pub async fn register(&self, profile: &RegistrationProfile) -> Identity {
        let _loading = LoadingGuard::start(&self.in_flight);
        self.store.register(profile).await
    }

    pub fn logout(&self) {
        self.store.logout();
    }

    /// Navigation entries for the mirrored identity.
    pub fn navigation_items(&self) -> Vec<NavigationItem> {
        let mirror = self.mirror.lock().unwrap_or_else(PoisonError::into_inner);
        provilink_auth::compute_items(mirror.value.as_ref())
    }

    /// Route guard decision for `path` against the mirrored identity.
    pub fn guard(&self, path: &str) -> GuardDecision {
        let mirror = self.mirror.lock().unwrap_or_else(PoisonError::into_inner);
        provilink_auth::guard(path, mirror.value.as_ref())
    }

    /// Whether an in-page `action` may run for the mirrored identity.
    pub fn guard_action(&self, action: ProtectedAction) -> ActionDecision {
        let mirror = self.mirror.lock().unwrap_or_else(PoisonError::into_inner);
        provilink_auth::guard_action(action, mirror.value.as_ref())
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }
}

impl Drop for SessionAccessor {
    fn drop(&mut self) {
        let token = self
            .subscription
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            let id = token.id();
            if token.unsubscribe() {
                tracing::trace!(listener = %id, "session accessor detached");
            }
        }
    }
}

impl core::fmt::Debug for SessionAccessor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionAccessor")
            .field("authenticated", &self.is_authenticated())
            .field("loading", &self.loading())
            .finish_non_exhaustive()
    }
}

/// Holds the loading counter up for the lifetime of one call, including when
/// the future is dropped before completion.
struct LoadingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> LoadingGuard<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
