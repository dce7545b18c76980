//! Credential directory consulted by `login`.
//!
//! Stands in for `POST /login {email, password} -> Identity | 401`. The mock
//! holds plain-text passwords; nothing here is meant to be secure.

use std::collections::HashSet;

use provilink_core::{DomainError, DomainResult, IdentityId};

use crate::{Identity, Role};

/// Resolves credentials to an identity.
pub trait CredentialDirectory: Send + Sync {
    /// Exact match on both fields; `None` when nothing matches.
    fn authenticate(&self, email: &str, password: &str) -> Option<Identity>;
}

/// One seeded account.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub email: String,
    pub password: String,
    pub identity: Identity,
}

/// Fixed, in-memory directory.
#[derive(Debug, Clone)]
pub struct MockDirectory {
    entries: Vec<DirectoryEntry>,
}

impl MockDirectory {
    /// Build a directory. Emails must be unique.
    pub fn new(entries: Vec<DirectoryEntry>) -> DomainResult<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.email.as_str()) {
                return Err(DomainError::validation(format!(
                    "duplicate directory email '{}'",
                    entry.email
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The three demo accounts shipped with the storefront.
    pub fn storefront() -> Self {
        let entries = vec![
            DirectoryEntry {
                email: "admin@sistema.com".to_string(),
                password: "123456".to_string(),
                identity: Identity {
                    id: IdentityId::from_static("admin-1"),
                    name: "Ana Administradora".to_string(),
                    email: "admin@sistema.com".to_string(),
                    role: Role::Administrator,
                    company: "Sistema B2B".to_string(),
                    tax_id: None,
                    phone: None,
                    avatar_url: None,
                    rating: None,
                    location: Some("Lima, Perú".to_string()),
                },
            },
            DirectoryEntry {
                email: "comerciante@test.com".to_string(),
                password: "654321".to_string(),
                identity: Identity {
                    id: IdentityId::from_static("comerciante-1"),
                    name: "María García".to_string(),
                    email: "comerciante@test.com".to_string(),
                    role: Role::Merchant,
                    company: "Tienda XYZ".to_string(),
                    tax_id: Some("20123456789".to_string()),
                    phone: Some("+51987654321".to_string()),
                    avatar_url: None,
                    rating: Some(4.2),
                    location: Some("Lima, Perú".to_string()),
                },
            },
            DirectoryEntry {
                email: "proveedor@test.com".to_string(),
                password: "789012".to_string(),
                identity: Identity {
                    id: IdentityId::from_static("proveedor-1"),
                    name: "Juan Pérez".to_string(),
                    email: "proveedor@test.com".to_string(),
                    role: Role::Supplier,
                    company: "Distribuidora ABC".to_string(),
                    tax_id: Some("20123456789".to_string()),
                    phone: Some("+51987654321".to_string()),
                    avatar_url: None,
                    rating: Some(4.5),
                    location: Some("Lima, Perú".to_string()),
                },
            },
        ];

        Self { entries }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.entries.iter().any(|e| e.email == email)
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::storefront()
    }
}

impl CredentialDirectory for MockDirectory {
    fn authenticate(&self, email: &str, password: &str) -> Option<Identity> {
        self.entries
            .iter()
            .find(|e| e.email == email && e.password == password)
            .map(|e| e.identity.clone())
    }
}
