use core::str::FromStr;

use serde::{Deserialize, Serialize};

use provilink_core::DomainError;

/// Closed set of storefront roles.
///
/// Role gates navigation and the profile dashboard. It is fixed for the
/// lifetime of an identity.
///
/// Serialized in English (`administrator`, `merchant`, `supplier`); the
/// storefront's earlier Spanish spellings are still accepted when reading.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "administrador")]
    Administrator,
    #[serde(alias = "comerciante")]
    Merchant,
    #[serde(alias = "proveedor")]
    Supplier,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Administrator, Role::Merchant, Role::Supplier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Merchant => "merchant",
            Role::Supplier => "supplier",
        }
    }

    /// Label shown under the user's name on the profile card.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrador",
            Role::Merchant => "Comerciante",
            Role::Supplier => "Proveedor",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Role::Administrator => "👨‍💼",
            Role::Merchant => "🏢",
            Role::Supplier => "🏭",
        }
    }

    /// Dashboard tabs on the profile page, first one selected by default.
    pub fn dashboard_tabs(&self) -> &'static [&'static str] {
        match self {
            Role::Administrator => &["users", "reports", "system"],
            Role::Merchant => &["orders", "favorites", "ratings"],
            Role::Supplier => &["products", "orders", "ratings"],
        }
    }

    /// Administrators only exist in the directory; the registration form
    /// offers merchant and supplier.
    pub fn is_self_registrable(&self) -> bool {
        match self {
            Role::Administrator => false,
            Role::Merchant | Role::Supplier => true,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "administrator" | "administrador" => Ok(Role::Administrator),
            "merchant" | "comerciante" => Ok(Role::Merchant),
            "supplier" | "proveedor" => Ok(Role::Supplier),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
