//! # Container
//!
//! An individually tracked unit of fluid inside a document. Each container
//! is accepted (or refused) and then operated on its own, so a document
//! reaches ACCEPTATION and OPERATION only once all of its containers have.
//!
//! ## Correction window
//!
//! Acceptance and operation data stay editable after their signature
//! until the container is *locked*:
//!
//! - it was linked into a successor document (`next_container_id` set), or
//! - the correction window elapsed since its closing signature (operation
//!   signature, or acceptance signature for a refused container).

use serde::{Deserialize, Serialize};

use bsff_core::{
    AcceptationStatus, CompanyDescriptor, ContainerId, DocumentId, OperationCode, OperationMode,
    PackagingType, Timestamp,
};

use crate::document::Signature;

/// Destination's inspection of the container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Acceptation {
    /// Inspection date.
    pub date: Option<Timestamp>,
    /// Accepted or refused.
    pub status: Option<AcceptationStatus>,
    /// Weighed quantity in kilograms. Zero when refused.
    pub weight: Option<f64>,
    /// Waste code found on inspection; defaults to the document's.
    pub waste_code: Option<String>,
    /// Fluid found on inspection.
    pub waste_description: Option<String>,
    /// Why the container was refused.
    pub refusal_reason: Option<String>,
    /// Acceptance signature.
    pub signature: Option<Signature>,
}

/// Where an intermediately treated container goes next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NextDestination {
    /// Next facility.
    pub company: CompanyDescriptor,
    /// Operation planned there.
    pub planned_operation_code: Option<OperationCode>,
    /// Prior acceptance certificate at the next facility.
    pub cap: Option<String>,
}

/// Treatment performed by the destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Operation {
    /// Treatment date.
    pub date: Option<Timestamp>,
    /// Treatment code.
    pub code: Option<OperationCode>,
    /// Treatment mode compatible with the code.
    pub mode: Option<OperationMode>,
    /// Free-text description of the treatment.
    pub description: Option<String>,
    /// Traceability is interrupted after this operation.
    pub no_traceability: Option<bool>,
    /// Next facility, for non-final operations.
    pub next_destination: NextDestination,
    /// Operation signature.
    pub signature: Option<Signature>,
}

impl Operation {
    /// `no_traceability`, absent meaning `false`.
    pub fn no_traceability(&self) -> bool {
        self.no_traceability.unwrap_or(false)
    }

    /// Whether the recorded code ends traceability. `None` without a code.
    pub fn is_final(&self) -> Option<bool> {
        self.code.map(|code| code.is_final(self.no_traceability()))
    }
}

/// A container shipped inside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Identity.
    pub id: ContainerId,
    /// Owning document, once attached.
    #[serde(default)]
    pub document_id: Option<DocumentId>,
    /// Physical form.
    #[serde(default, rename = "type")]
    pub packaging_type: Option<PackagingType>,
    /// Description when `packaging_type` is `OTHER`.
    #[serde(default)]
    pub other: Option<String>,
    /// Capacity in litres.
    #[serde(default)]
    pub volume: Option<f64>,
    /// Declared fluid weight in kilograms.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Container number declared at emission.
    #[serde(default)]
    pub emission_numero: Option<String>,
    /// Container number.
    #[serde(default)]
    pub numero: Option<String>,
    /// Antecedent containers whose content ended up in this one.
    #[serde(default)]
    pub previous_containers: Vec<ContainerId>,
    /// Successor container, set once this one is grouped, forwarded or repackaged.
    #[serde(default)]
    pub next_container_id: Option<ContainerId>,
    /// Acceptance block.
    #[serde(default)]
    pub acceptation: Acceptation,
    /// Operation block.
    #[serde(default)]
    pub operation: Operation,
}

impl Container {
    /// Empty container.
    pub fn new(id: ContainerId) -> Self {
        Self {
            id,
            document_id: None,
            packaging_type: None,
            other: None,
            volume: None,
            weight: None,
            emission_numero: None,
            numero: None,
            previous_containers: Vec::new(),
            next_container_id: None,
            acceptation: Acceptation::default(),
            operation: Operation::default(),
        }
    }

    /// Acceptance signature recorded.
    pub fn is_acceptation_signed(&self) -> bool {
        self.acceptation.signature.is_some()
    }

    /// Operation signature recorded.
    pub fn is_operation_signed(&self) -> bool {
        self.operation.signature.is_some()
    }

    /// Acceptance recorded the container as refused.
    pub fn is_refused(&self) -> bool {
        self.acceptation.status == Some(AcceptationStatus::Refused)
    }

    /// Refused, with the refusal signed.
    pub fn is_signed_refused(&self) -> bool {
        self.is_acceptation_signed() && self.is_refused()
    }

    /// Signature closing the container's lifecycle, if any.
    pub fn closing_signature(&self) -> Option<&Signature> {
        if self.is_signed_refused() {
            self.acceptation.signature.as_ref()
        } else {
            self.operation.signature.as_ref()
        }
    }

    /// Whether acceptance and operation data can no longer be corrected.
    pub fn is_locked(&self, now: &Timestamp, correction_window_days: i64) -> bool {
        if self.next_container_id.is_some() {
            return true;
        }
        self.closing_signature()
            .is_some_and(|sig| sig.date.days_until(now) > correction_window_days)
    }

    /// Restore the links only the system writes: the owning document and
    /// the successor container. A container with no persisted record
    /// starts without a successor.
    pub fn keep_system_links(&mut self, persisted: Option<&Container>) {
        match persisted {
            Some(old) => {
                self.document_id = old.document_id.clone();
                self.next_container_id = old.next_container_id.clone();
            }
            None => self.next_container_id = None,
        }
    }

    /// Waste code after acceptance, falling back to `document_code`.
    pub fn effective_waste_code<'a>(&'a self, document_code: Option<&'a str>) -> Option<&'a str> {
        self.acceptation
            .waste_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or(document_code)
            .filter(|c| !c.trim().is_empty())
    }
}
