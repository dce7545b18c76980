//! Role-aware navigation items.
//!
//! Pure functions: the visible item list is recomputed from the current
//! identity on every render and never stored.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::authorize::normalize_path;
use crate::{Identity, Role};

/// Every navigation entry the storefront knows about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavItemId {
    Home,
    Categories,
    Login,
    Users,
    Reports,
    Settings,
    Profile,
    Messages,
    Orders,
    Publish,
    Products,
}

const ANONYMOUS_ITEMS: &[NavItemId] = &[NavItemId::Home, NavItemId::Categories, NavItemId::Login];

const ADMINISTRATOR_ITEMS: &[NavItemId] = &[
    NavItemId::Home,
    NavItemId::Users,
    NavItemId::Reports,
    NavItemId::Settings,
    NavItemId::Profile,
];

const MERCHANT_ITEMS: &[NavItemId] = &[
    NavItemId::Home,
    NavItemId::Categories,
    NavItemId::Messages,
    NavItemId::Orders,
    NavItemId::Profile,
];

const SUPPLIER_ITEMS: &[NavItemId] = &[
    NavItemId::Home,
    NavItemId::Publish,
    NavItemId::Products,
    NavItemId::Messages,
    NavItemId::Profile,
];

impl NavItemId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavItemId::Home => "home",
            NavItemId::Categories => "categories",
            NavItemId::Login => "login",
            NavItemId::Users => "users",
            NavItemId::Reports => "reports",
            NavItemId::Settings => "settings",
            NavItemId::Profile => "profile",
            NavItemId::Messages => "messages",
            NavItemId::Orders => "orders",
            NavItemId::Publish => "publish",
            NavItemId::Products => "products",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NavItemId::Home => "Inicio",
            NavItemId::Categories => "Categorías",
            NavItemId::Login => "Ingresar",
            NavItemId::Users => "Usuarios",
            NavItemId::Reports => "Reportes",
            NavItemId::Settings => "Sistema",
            NavItemId::Profile => "Mi Cuenta",
            NavItemId::Messages => "Mensajes",
            NavItemId::Orders => "Pedidos",
            NavItemId::Publish => "Publicar",
            NavItemId::Products => "Productos",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NavItemId::Home => "🏠",
            NavItemId::Categories => "🗂️",
            NavItemId::Login => "🔑",
            NavItemId::Users => "👥",
            NavItemId::Reports => "📊",
            NavItemId::Settings => "⚙️",
            NavItemId::Profile => "👤",
            NavItemId::Messages => "💬",
            NavItemId::Orders => "📦",
            NavItemId::Publish => "➕",
            NavItemId::Products => "🏷️",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            NavItemId::Home => "/",
            NavItemId::Categories => "/categories",
            NavItemId::Login => "/login",
            NavItemId::Users => "/admin/users",
            NavItemId::Reports => "/admin/reports",
            NavItemId::Settings => "/admin/settings",
            NavItemId::Profile => "/profile",
            NavItemId::Messages => "/messages",
            NavItemId::Orders => "/orders",
            NavItemId::Publish => "/publish",
            NavItemId::Products => "/products",
        }
    }

    pub fn requires_auth(&self) -> bool {
        match self {
            NavItemId::Home | NavItemId::Categories | NavItemId::Login => false,
            NavItemId::Users
            | NavItemId::Reports
            | NavItemId::Settings
            | NavItemId::Profile
            | NavItemId::Messages
            | NavItemId::Orders
            | NavItemId::Publish
            | NavItemId::Products => true,
        }
    }

    /// Roles whose curated list contains this item.
    pub fn allowed_roles(&self) -> BTreeSet<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| items_for(Some(*role)).contains(self))
            .collect()
    }
}

/// A rendered navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub id: NavItemId,
    pub label: &'static str,
    pub icon: &'static str,
    pub path: &'static str,
    pub requires_auth: bool,
    pub allowed_roles: BTreeSet<Role>,
}

impl NavigationItem {
    pub fn from_id(id: NavItemId) -> Self {
        Self {
            id,
            label: id.label(),
            icon: id.icon(),
            path: id.path(),
            requires_auth: id.requires_auth(),
            allowed_roles: id.allowed_roles(),
        }
    }

    /// Highlight state: the current location is exactly this item's path.
    pub fn is_active(&self, current_path: &str) -> bool {
        normalize_path(current_path) == self.path
    }
}

/// Ordered item ids for a role, or the anonymous list for `None`.
pub fn items_for(role: Option<Role>) -> &'static [NavItemId] {
    match role {
        None => ANONYMOUS_ITEMS,
        Some(Role::Administrator) => ADMINISTRATOR_ITEMS,
        Some(Role::Merchant) => MERCHANT_ITEMS,
        Some(Role::Supplier) => SUPPLIER_ITEMS,
    }
}

/// Navigation items visible to `identity`.
pub fn compute_items(identity: Option<&Identity>) -> Vec<NavigationItem> {
    items_for(identity.map(|i| i.role))
        .iter()
        .copied()
        .map(NavigationItem::from_id)
        .collect()
}
