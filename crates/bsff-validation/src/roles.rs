//! # Role Context
//!
//! Which of emitter, destination and transporter the acting user is on a
//! document. Sealed-rule exceptions consult these roles (an emitter may
//! still edit some emitter fields after signing, for instance).

use std::collections::{HashMap, HashSet};

use bsff_state::{Document, UserRoles};

/// Resolves the roles a user holds on a document.
///
/// Implementations must be `Send + Sync` to be shared behind an `Arc`.
pub trait RoleResolver: Send + Sync {
    /// Roles of `user` on `document`.
    fn roles(&self, user: &str, document: &Document) -> UserRoles;
}

/// Roles derived from a fixed user → company membership table. A user
/// holds a role when one of their companies (by SIRET or VAT number)
/// occupies it on the document.
#[derive(Debug, Clone, Default)]
pub struct StaticRoles {
    memberships: HashMap<String, HashSet<String>>,
}

impl StaticRoles {
    /// Empty table: every user holds no role.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `user` belongs to the company identified by `company_key`.
    pub fn with_membership(mut self, user: impl Into<String>, company_key: impl Into<String>) -> Self {
        self.memberships
            .entry(user.into())
            .or_default()
            .insert(company_key.into());
        self
    }
}

impl RoleResolver for StaticRoles {
    fn roles(&self, user: &str, document: &Document) -> UserRoles {
        let Some(companies) = self.memberships.get(user) else {
            return UserRoles::default();
        };
        let member = |key: Option<&str>| key.is_some_and(|k| companies.contains(k));
        UserRoles {
            is_emitter: member(document.emitter.company.registry_key()),
            is_destination: member(document.destination.company.registry_key()),
            is_transporter: document
                .transporters
                .iter()
                .any(|t| member(t.company.registry_key())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsff_core::{DocumentId, Siret, Timestamp, TransporterId, VatNumber};
    use bsff_state::Transporter;

    fn document() -> Document {
        let mut d = Document::new_draft(
            DocumentId("FF-1".into()),
            Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        );
        d.emitter.company.siret = Some(Siret("11111111111111".into()));
        d.destination.company.siret = Some(Siret("22222222222222".into()));
        let mut t = Transporter::new(TransporterId("t1".into()), 1);
        t.company.vat_number = Some(VatNumber("BE0541696005".into()));
        d.transporters.push(t);
        d
    }

    #[test]
    fn test_roles_from_memberships() {
        let roles = StaticRoles::new()
            .with_membership("jane", "11111111111111")
            .with_membership("jane", "BE0541696005");
        let resolved = roles.roles("jane", &document());
        assert!(resolved.is_emitter);
        assert!(!resolved.is_destination);
        assert!(resolved.is_transporter);
    }

    #[test]
    fn test_unknown_user_has_no_role() {
        assert_eq!(StaticRoles::new().roles("bob", &document()), UserRoles::default());
    }
}
