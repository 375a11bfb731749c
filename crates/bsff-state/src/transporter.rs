//! # Transporter Slot
//!
//! One carrier leg of a shipment. The slot `number` (1..5) selects the
//! `TRANSPORT(number)` stage governing the slot's fields: every field
//! becomes sealed once that slot's transport signature is recorded.

use serde::{Deserialize, Serialize};

use bsff_core::{CompanyDescriptor, DocumentId, Timestamp, TransportMode, TransporterId};

use crate::document::Signature;

/// Professional registration receipt of a road carrier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recepisse {
    /// Carrier declared itself exempt.
    pub is_exempted: Option<bool>,
    /// Receipt number.
    pub number: Option<String>,
    /// Issuing department.
    pub department: Option<String>,
    /// End of validity.
    pub validity_limit: Option<Timestamp>,
}

/// Transport block of a slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transport {
    /// How the waste travels.
    pub mode: Option<TransportMode>,
    /// Vehicle plates, at most two.
    pub plates: Vec<String>,
    /// When the carrier took over the waste.
    pub taken_over_at: Option<Timestamp>,
    /// Transport signature.
    pub signature: Option<Signature>,
}

/// A transporter slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transporter {
    /// Slot record identity.
    pub id: TransporterId,
    /// Owning document, once attached.
    #[serde(default)]
    pub document_id: Option<DocumentId>,
    /// Position 1..5.
    pub number: u8,
    /// Carrier company.
    #[serde(default)]
    pub company: CompanyDescriptor,
    /// Free text for the carrier's own bookkeeping.
    #[serde(default)]
    pub custom_info: Option<String>,
    /// Registration receipt.
    #[serde(default)]
    pub recepisse: Recepisse,
    /// Transport block.
    #[serde(default)]
    pub transport: Transport,
}

impl Transporter {
    /// Empty slot at position `number`.
    pub fn new(id: TransporterId, number: u8) -> Self {
        Self {
            id,
            document_id: None,
            number,
            company: CompanyDescriptor::default(),
            custom_info: None,
            recepisse: Recepisse::default(),
            transport: Transport::default(),
        }
    }

    /// Whether this slot's transport signature is recorded.
    pub fn is_signed(&self) -> bool {
        self.transport.signature.is_some()
    }

    /// Whether the carrier travels by road.
    pub fn is_road(&self) -> bool {
        self.transport.mode == Some(TransportMode::Road)
    }

    /// Recepisse data is mandatory: road transport, not exempted, not foreign.
    pub fn requires_recepisse(&self) -> bool {
        !self.recepisse.is_exempted.unwrap_or(false) && self.is_road() && !self.company.is_foreign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsff_core::VatNumber;

    #[test]
    fn test_recepisse_required_for_french_road_carrier() {
        let mut t = Transporter::new(TransporterId::new(), 1);
        t.transport.mode = Some(TransportMode::Road);
        assert!(t.requires_recepisse());

        t.recepisse.is_exempted = Some(true);
        assert!(!t.requires_recepisse());

        t.recepisse.is_exempted = Some(false);
        t.company.vat_number = Some(VatNumber("BE0541696005".into()));
        assert!(!t.requires_recepisse());

        t.company.vat_number = None;
        t.transport.mode = Some(TransportMode::Rail);
        assert!(!t.requires_recepisse());
    }
}
