//! # Identity Newtypes
//!
//! Newtype wrappers for document, container, transporter and company
//! identifiers. A `ContainerId` cannot be passed where a `DocumentId` is
//! expected, which matters in lineage checks that juggle both.
//!
//! Document identifiers follow the `FF-YYYYMMDD-XXXXXXXXX` readable format.
//! Container and transporter identifiers are opaque.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BsffError;
use crate::temporal::Timestamp;

/// Identifier of a shipment document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// Identifier of a container shipped inside a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub String);

/// Identifier of a transporter slot record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransporterId(pub String);

/// Identifier of an intervention sheet (small-quantity collection).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterventionSheetId(pub String);

/// French establishment number: 14 digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Siret(pub String);

/// Intra-community VAT number. The two-letter prefix is the country.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VatNumber(pub String);

impl DocumentId {
    /// Generate a readable identifier dated at `at`.
    pub fn generate(at: Timestamp) -> Self {
        let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
        Self(format!("FF-{}-{}", at.as_datetime().format("%Y%m%d"), &suffix[..9]))
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ContainerId {
    /// Generate a new random container identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

impl TransporterId {
    /// Generate a new random transporter identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TransporterId {
    fn default() -> Self {
        Self::new()
    }
}

impl InterventionSheetId {
    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Siret {
    /// Parse a SIRET, accepting embedded spaces.
    ///
    /// # Errors
    ///
    /// Returns [`BsffError::InvalidIdentifier`] unless the input holds
    /// exactly 14 ASCII digits.
    pub fn parse(s: &str) -> Result<Self, BsffError> {
        let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() == 14 && digits.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(digits))
        } else {
            Err(BsffError::InvalidIdentifier {
                kind: "SIRET",
                value: s.to_string(),
            })
        }
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl VatNumber {
    /// Parse a VAT number: two-letter country prefix then alphanumerics.
    ///
    /// # Errors
    ///
    /// Returns [`BsffError::InvalidIdentifier`] on a malformed input.
    pub fn parse(s: &str) -> Result<Self, BsffError> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        let well_formed = compact.len() > 2
            && compact.chars().take(2).all(|c| c.is_ascii_alphabetic())
            && compact.chars().skip(2).all(|c| c.is_ascii_alphanumeric());
        if well_formed {
            Ok(Self(compact))
        } else {
            Err(BsffError::InvalidIdentifier {
                kind: "VAT number",
                value: s.to_string(),
            })
        }
    }

    /// Two-letter country prefix.
    pub fn country(&self) -> &str {
        self.0.get(..2).unwrap_or("")
    }

    /// Whether this VAT number belongs to a company outside France.
    pub fn is_foreign(&self) -> bool {
        !self.0.is_empty() && !self.country().eq_ignore_ascii_case("FR")
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for TransporterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for InterventionSheetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for Siret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for VatNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
