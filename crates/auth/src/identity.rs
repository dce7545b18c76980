//! The authenticated principal and the registration form payload.

use serde::{Deserialize, Serialize};

use provilink_core::{DomainError, DomainResult, IdentityId};

use crate::Role;

/// Upper bound of the marketplace rating scale.
pub const MAX_RATING: f64 = 5.0;

/// Identity of a signed-in storefront user.
///
/// This is also the persisted record: one JSON object, camelCase fields.
/// Older records written with `type`, `ruc` and `avatar` keys still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    #[serde(alias = "type")]
    pub role: Role,
    pub company: String,
    #[serde(default, alias = "ruc", skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Identity {
    /// Build a fresh identity from a registration form.
    ///
    /// Always succeeds: a new id is minted, the rating starts at zero and the
    /// location is the storefront default. The password is not retained.
    pub fn register(profile: &RegistrationProfile, location: impl Into<String>) -> Self {
        Self {
            id: IdentityId::generate(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            role: profile.role,
            company: profile.company.clone(),
            tax_id: Some(profile.tax_id.clone()),
            phone: profile.phone.clone(),
            avatar_url: None,
            rating: Some(0.0),
            location: Some(location.into()),
        }
    }

    /// Structural checks applied to records read back from storage.
    pub fn validate(&self) -> DomainResult<()> {
        if self.id.is_empty() {
            return Err(DomainError::invalid_id("identity id is empty"));
        }
        if !self.email.contains('@') {
            return Err(DomainError::validation(format!(
                "identity {} has malformed email",
                self.id
            )));
        }
        if let Some(rating) = self.rating
            && !(0.0..=MAX_RATING).contains(&rating)
        {
            return Err(DomainError::validation(format!(
                "rating {rating} outside 0..={MAX_RATING}"
            )));
        }
        Ok(())
    }

    /// Rating as shown on the profile card (a zero rating is hidden).
    pub fn visible_rating(&self) -> Option<f64> {
        self.rating.filter(|r| *r > 0.0)
    }
}

/// Payload of the registration form.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    pub company: String,
    #[serde(alias = "ruc")]
    pub tax_id: String,
    #[serde(alias = "type")]
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RegistrationProfile {
    /// Required-field check run by the form before it calls the store.
    ///
    /// The store itself never rejects a profile.
    pub fn validate(&self) -> DomainResult<()> {
        let required = [
            ("name", &self.name),
            ("email", &self.email),
            ("password", &self.password),
            ("company", &self.company),
            ("tax id", &self.tax_id),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(DomainError::validation(format!("{field} is required")));
        }
        if !self.email.contains('@') {
            return Err(DomainError::validation("email is malformed"));
        }
        if !self.role.is_self_registrable() {
            return Err(DomainError::validation(format!(
                "role '{}' cannot be self-registered",
                self.role
            )));
        }
        Ok(())
    }
}

impl core::fmt::Debug for RegistrationProfile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegistrationProfile")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("company", &self.company)
            .field("tax_id", &self.tax_id)
            .field("role", &self.role)
            .field("phone", &self.phone)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> RegistrationProfile {
        RegistrationProfile {
            name: "Lucía Torres".to_string(),
            email: "lucia@bodega.pe".to_string(),
            password: "secreto".to_string(),
            company: "Bodega Torres".to_string(),
            tax_id: "20999888777".to_string(),
            role: Role::Merchant,
            phone: None,
        }
    }

    #[test]
    fn register_sets_defaults() {
        let identity = Identity::register(&profile(), "Lima, Perú");
        assert_eq!(identity.rating, Some(0.0));
        assert_eq!(identity.location.as_deref(), Some("Lima, Perú"));
        assert_eq!(identity.tax_id.as_deref(), Some("20999888777"));
        assert_eq!(identity.role, Role::Merchant);
        assert!(identity.validate().is_ok());
        assert_eq!(identity.visible_rating(), None);
    }

    #[test]
    fn register_mints_distinct_ids() {
        let a = Identity::register(&profile(), "Lima, Perú");
        let b = Identity::register(&profile(), "Lima, Perú");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serialized_record_uses_camel_case_and_skips_absent_fields() {
        let mut identity = Identity::register(&profile(), "Lima, Perú");
        identity.phone = None;
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["taxId"], "20999888777");
        assert_eq!(json["role"], "merchant");
        assert!(json.get("phone").is_none());
        assert!(json.get("avatarUrl").is_none());
    }

    #[test]
    fn legacy_record_loads() {
        let raw = r#"{
            "id": "proveedor-1",
            "name": "Juan Pérez",
            "email": "proveedor@test.com",
            "type": "proveedor",
            "company": "Distribuidora ABC",
            "ruc": "20123456789",
            "rating": 4.5
        }"#;
        let identity: Identity = serde_json::from_str(raw).unwrap();
        assert_eq!(identity.role, Role::Supplier);
        assert_eq!(identity.tax_id.as_deref(), Some("20123456789"));
        assert_eq!(identity.visible_rating(), Some(4.5));
    }

    #[test]
    fn validate_rejects_out_of_range_rating() {
        let mut identity = Identity::register(&profile(), "Lima, Perú");
        identity.rating = Some(7.0);
        assert!(matches!(identity.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn profile_validation_reports_first_missing_field() {
        let mut p = profile();
        p.company = "  ".to_string();
        assert_eq!(
            p.validate().unwrap_err(),
            DomainError::validation("company is required")
        );
    }

    #[test]
    fn profile_validation_rejects_administrator() {
        let mut p = profile();
        p.role = Role::Administrator;
        assert!(p.validate().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", profile());
        assert!(!rendered.contains("secreto"));
    }
}
