use serde::Serialize;
use thiserror::Error;

use crate::Identity;

/// Where the guard sends anonymous visitors.
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,
}

/// Require a signed-in identity.
///
/// - No IO
/// - No panics
/// - Binary gate: any role passes
pub fn authorize(identity: Option<&Identity>) -> Result<&Identity, AuthzError> {
    identity.ok_or(AuthzError::Unauthenticated)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAccess {
    Public,
    Protected,
}

/// The storefront's route table.
///
/// `:name` matches exactly one segment, a trailing `*` matches one or more.
/// Literal segments compare ASCII case-insensitively, like the browser router.
const ROUTES: &[(&str, RouteAccess)] = &[
    ("/", RouteAccess::Public),
    ("/login", RouteAccess::Public),
    ("/register", RouteAccess::Public),
    ("/categories", RouteAccess::Public),
    ("/category/:id", RouteAccess::Public),
    ("/search", RouteAccess::Public),
    ("/product/:id", RouteAccess::Public),
    ("/profile", RouteAccess::Protected),
    ("/supplier/:name", RouteAccess::Protected),
    ("/profile/edit", RouteAccess::Protected),
    ("/messages", RouteAccess::Protected),
    ("/messages/new", RouteAccess::Protected),
    ("/publish", RouteAccess::Protected),
    ("/orders", RouteAccess::Protected),
    ("/products", RouteAccess::Protected),
    ("/admin", RouteAccess::Protected),
    ("/admin/*", RouteAccess::Protected),
];

/// Canonical form used for matching: query and fragment dropped, empty
/// segments collapsed, no trailing slash (except the root).
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.trim().is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/').filter(|s| !s.is_empty());
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some("*"), Some(_)) => return true,
            (Some(p), Some(s)) if p.starts_with(':') || p.eq_ignore_ascii_case(s) => continue,
            _ => return false,
        }
    }
}

/// Access level of `path`. Unknown paths are public (they render the
/// not-found page).
pub fn route_access(path: &str) -> RouteAccess {
    let path = normalize_path(path);
    ROUTES
        .iter()
        .find(|(pattern, _)| matches(pattern, &path))
        .map(|(_, access)| *access)
        .unwrap_or(RouteAccess::Public)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// A toast shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: &'static str,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn restricted_access() -> Self {
        Self::login_required("acceder a esta función")
    }

    /// "Debes iniciar sesión para {what}".
    pub fn login_required(what: &str) -> Self {
        Self {
            title: "Acceso restringido",
            description: format!("Debes iniciar sesión para {what}"),
            variant: NoticeVariant::Destructive,
        }
    }
}

/// In-page actions that need a session, independent of the current route.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectedAction {
    AddToFavorites,
    ContactSupplier,
    RequestQuote,
}

impl ProtectedAction {
    pub const ALL: [ProtectedAction; 3] = [
        ProtectedAction::AddToFavorites,
        ProtectedAction::ContactSupplier,
        ProtectedAction::RequestQuote,
    ];

    /// Phrase completing "Debes iniciar sesión para ...".
    pub fn phrase(&self) -> &'static str {
        match self {
            ProtectedAction::AddToFavorites => "agregar a favoritos",
            ProtectedAction::ContactSupplier => "contactar proveedor",
            ProtectedAction::RequestQuote => "solicitar cotización",
        }
    }
}

impl core::fmt::Display for ProtectedAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.phrase())
    }
}

/// Outcome of an attempted in-page action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ActionDecision {
    Proceed,
    Redirect { to: &'static str, notice: Notice },
}

impl ActionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ActionDecision::Proceed)
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self {
            ActionDecision::Proceed => None,
            ActionDecision::Redirect { notice, .. } => Some(notice),
        }
    }
}

/// Outcome of an attempted navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow {
        path: String,
    },
    Redirect {
        requested: String,
        to: &'static str,
        notice: Notice,
    },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow { .. })
    }

    /// Path the router should actually navigate to.
    pub fn target(&self) -> &str {
        match self {
            GuardDecision::Allow { path } => path,
            GuardDecision::Redirect { to, .. } => to,
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self {
            GuardDecision::Allow { .. } => None,
            GuardDecision::Redirect { notice, .. } => Some(notice),
        }
    }
}

/// Decide an attempted navigation to `path`.
///
/// Evaluated on every attempt; nothing is cached.
pub fn guard(path: &str, identity: Option<&Identity>) -> GuardDecision {
    let requested = normalize_path(path);

    if route_access(&requested) == RouteAccess::Public {
        return GuardDecision::Allow { path: requested };
    }

    match authorize(identity) {
        Ok(_) => GuardDecision::Allow { path: requested },
        Err(AuthzError::Unauthenticated) => {
            tracing::debug!(path = %requested, "protected route requested without a session; redirecting to login");
            GuardDecision::Redirect {
                requested,
                to: LOGIN_PATH,
                notice: Notice::restricted_access(),
            }
        }
    }
}

/// Decide whether `action` may run. Anonymous visitors are sent to login
/// with a notice naming the action.
pub fn guard_action(action: ProtectedAction, identity: Option<&Identity>) -> ActionDecision {
    match authorize(identity) {
        Ok(_) => ActionDecision::Proceed,
        Err(AuthzError::Unauthenticated) => {
            tracing::debug!(%action, "protected action requested without a session; redirecting to login");
            ActionDecision::Redirect {
                to: LOGIN_PATH,
                notice: Notice::login_required(action.phrase()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockDirectory, Role};

    fn seeded(role: Role) -> Identity {
        MockDirectory::storefront()
            .entries()
            .iter()
            .find(|e| e.identity.role == role)
            .map(|e| e.identity.clone())
            .unwrap()
    }

    #[test]
    fn normalizes_paths() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("publish"), "/publish");
        assert_eq!(normalize_path("/messages/"), "/messages");
        assert_eq!(normalize_path("//admin//users?tab=1#top"), "/admin/users");
    }

    #[test]
    fn route_table_classifies_paths() {
        assert_eq!(route_access("/"), RouteAccess::Public);
        assert_eq!(route_access("/product/42"), RouteAccess::Public);
        assert_eq!(route_access("/supplier/Distribuidora%20ABC"), RouteAccess::Protected);
        assert_eq!(route_access("/messages/new"), RouteAccess::Protected);
        assert_eq!(route_access("/admin"), RouteAccess::Protected);
        assert_eq!(route_access("/admin/users"), RouteAccess::Protected);
        assert_eq!(route_access("/admin/reports/2024"), RouteAccess::Protected);
        assert_eq!(route_access("/product"), RouteAccess::Public);
        assert_eq!(route_access("/does-not-exist"), RouteAccess::Public);
    }

    #[test]
    fn anonymous_publish_redirects_to_login() {
        let decision = guard("/publish", None);
        assert!(!decision.is_allowed());
        assert_eq!(decision.target(), LOGIN_PATH);
        assert_eq!(decision.notice(), Some(&Notice::restricted_access()));
        assert_eq!(
            decision.notice().map(|n| n.variant),
            Some(NoticeVariant::Destructive)
        );
    }

    #[test]
    fn protected_routes_match_regardless_of_case() {
        for path in ["/PUBLISH", "/Publish", "/Admin/Users", "/ORDERS/", "/Messages/New"] {
            let decision = guard(path, None);
            assert!(!decision.is_allowed(), "{path}");
            assert_eq!(decision.target(), LOGIN_PATH);
        }
        assert_eq!(route_access("/Category/Electronica"), RouteAccess::Public);
    }

    #[test]
    fn supplier_profile_page_needs_a_session() {
        let decision = guard("/supplier/Distribuidora%20ABC", None);
        assert!(!decision.is_allowed());

        let merchant = seeded(Role::Merchant);
        let decision = guard("/supplier/Distribuidora%20ABC", Some(&merchant));
        assert_eq!(decision.target(), "/supplier/Distribuidora%20ABC");
    }

    #[test]
    fn anonymous_action_gets_action_specific_notice() {
        let decision = guard_action(ProtectedAction::ContactSupplier, None);
        assert!(!decision.is_allowed());
        let notice = decision.notice().unwrap();
        assert_eq!(notice.title, "Acceso restringido");
        assert_eq!(notice.description, "Debes iniciar sesión para contactar proveedor");
        assert_eq!(notice.variant, NoticeVariant::Destructive);
        assert_eq!(
            decision,
            ActionDecision::Redirect {
                to: LOGIN_PATH,
                notice: Notice::login_required("contactar proveedor"),
            }
        );
    }

    #[test]
    fn signed_in_actions_proceed() {
        let supplier = seeded(Role::Supplier);
        for action in ProtectedAction::ALL {
            assert_eq!(guard_action(action, Some(&supplier)), ActionDecision::Proceed);
            assert!(
                guard_action(action, None)
                    .notice()
                    .is_some_and(|n| n.description.ends_with(action.phrase())),
                "{action}"
            );
        }
    }

    #[test]
    fn route_notice_keeps_generic_wording() {
        assert_eq!(
            Notice::restricted_access().description,
            "Debes iniciar sesión para acceder a esta función"
        );
    }

    #[test]
    fn supplier_publish_is_allowed() {
        let supplier = seeded(Role::Supplier);
        let decision = guard("/publish", Some(&supplier));
        assert_eq!(
            decision,
            GuardDecision::Allow {
                path: "/publish".to_string()
            }
        );
    }

    #[test]
    fn gate_is_binary_not_role_based() {
        let merchant = seeded(Role::Merchant);
        assert!(guard("/admin/users", Some(&merchant)).is_allowed());
    }

    #[test]
    fn public_routes_never_redirect() {
        for path in ["/", "/login", "/register", "/categories", "/search?q=arroz"] {
            assert!(guard(path, None).is_allowed(), "{path}");
        }
    }

    #[test]
    fn authorize_requires_identity() {
        assert_eq!(authorize(None), Err(AuthzError::Unauthenticated));
        let admin = seeded(Role::Administrator);
        assert!(authorize(Some(&admin)).is_ok());
    }

    #[test]
    fn redirect_serializes_with_tag() {
        let json = serde_json::to_value(guard("/orders", None)).unwrap();
        assert_eq!(json["decision"], "redirect");
        assert_eq!(json["to"], "/login");
        assert_eq!(json["requested"], "/orders");
    }
}
