//! # Company Descriptor
//!
//! Identification block shared by emitters, transporters, destinations and
//! next destinations. Every attribute is optional while a document is a
//! draft; the rule tables decide which become required at which stage.

use serde::{Deserialize, Serialize};

use crate::identity::{Siret, VatNumber};

/// Identification and contact details of a company acting on a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyDescriptor {
    /// Legal name.
    pub name: Option<String>,
    /// French establishment number.
    pub siret: Option<Siret>,
    /// VAT number, used by foreign companies.
    pub vat_number: Option<VatNumber>,
    /// Postal address.
    pub address: Option<String>,
    /// Contact person.
    pub contact: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// E-mail address.
    pub mail: Option<String>,
}

impl CompanyDescriptor {
    /// The identifier the company registry is queried with: SIRET first,
    /// VAT number otherwise.
    pub fn registry_key(&self) -> Option<&str> {
        self.siret
            .as_ref()
            .map(Siret::as_str)
            .or_else(|| self.vat_number.as_ref().map(VatNumber::as_str))
            .filter(|s| !s.is_empty())
    }

    /// Whether the company is identified by a foreign VAT number.
    pub fn is_foreign(&self) -> bool {
        self.vat_number.as_ref().is_some_and(VatNumber::is_foreign)
    }

    /// Whether two descriptors designate the same company: equal SIRET, or
    /// equal VAT number when neither carries a SIRET.
    pub fn same_company(&self, other: &CompanyDescriptor) -> bool {
        match (&self.siret, &other.siret) {
            (Some(a), Some(b)) => a == b,
            (None, None) => match (&self.vat_number, &other.vat_number) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            _ => false,
        }
    }
}
