//! `provilink-auth`: identity model and role-gated navigation policy.
//!
//! This crate is intentionally decoupled from storage and async: everything
//! here is pure and deterministic except for id generation on registration.

pub mod authorize;
pub mod directory;
pub mod identity;
pub mod navigation;
pub mod roles;

pub use authorize::{
    ActionDecision, AuthzError, GuardDecision, LOGIN_PATH, Notice, NoticeVariant, ProtectedAction,
    RouteAccess, authorize, guard, guard_action, normalize_path, route_access,
};
pub use directory::{CredentialDirectory, DirectoryEntry, MockDirectory};
pub use identity::{Identity, MAX_RATING, RegistrationProfile};
pub use navigation::{NavItemId, NavigationItem, compute_items, items_for};
pub use roles::Role;
