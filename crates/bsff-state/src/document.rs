//! # Shipment Document
//!
//! The top-level record tracking one batch of fluid waste from its emitter
//! to its final treatment. A document owns its transporters and containers;
//! it only references, by id, the antecedent containers it groups, forwards
//! or repackages.
//!
//! ## Invariants
//!
//! - At most one of `forwarding`, `grouping`, `repackaging` is non-empty,
//!   and only for the matching [`DocumentKind`].
//! - Signatures are recorded once and never removed.

use serde::{Deserialize, Serialize};

use bsff_core::{
    CompanyDescriptor, ContainerId, DocumentId, DocumentKind, DocumentStatus,
    InterventionSheetId, OperationCode, Timestamp,
};

use crate::container::Container;
use crate::signing::SignatureRecord;
use crate::transporter::Transporter;

/// Who signed a stage, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Name of the signing person.
    pub author: String,
    /// Signature date.
    pub date: Timestamp,
}

/// Emitter block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Emitter {
    /// Emitting company.
    pub company: CompanyDescriptor,
    /// Free text for the emitter's own bookkeeping.
    pub custom_info: Option<String>,
    /// Emission signature.
    pub emission_signature: Option<Signature>,
}

/// Waste description block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Waste {
    /// Waste-list code, e.g. `"14 06 01*"`.
    pub code: Option<String>,
    /// Fluid name.
    pub description: Option<String>,
    /// Dangerous-goods transport mention.
    pub adr: Option<String>,
}

/// Total weight declared by the emitter, in kilograms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Weight {
    /// Declared quantity.
    pub value: Option<f64>,
    /// Whether `value` is an estimate.
    pub is_estimate: Option<bool>,
}

/// Destination block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Destination {
    /// Treatment facility.
    pub company: CompanyDescriptor,
    /// Prior acceptance certificate number.
    pub cap: Option<String>,
    /// Operation the emitter expects the destination to perform.
    pub planned_operation_code: Option<OperationCode>,
    /// Free text for the destination's own bookkeeping.
    pub custom_info: Option<String>,
    /// Date the waste physically arrived.
    pub reception_date: Option<Timestamp>,
    /// Reception signature.
    pub reception_signature: Option<Signature>,
}

/// A fluid-waste shipment document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Readable identifier.
    pub id: DocumentId,
    /// Drafts cannot be signed.
    #[serde(default)]
    pub is_draft: bool,
    /// Soft-deletion flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// Creation time; selects the cut-over rules that apply.
    pub created_at: Timestamp,
    /// Stored status, updated by signatures.
    #[serde(default = "initial_status")]
    pub status: DocumentStatus,
    /// Shipment pattern.
    #[serde(default)]
    pub kind: Option<DocumentKind>,
    /// Emitter block.
    #[serde(default)]
    pub emitter: Emitter,
    /// Waste block.
    #[serde(default)]
    pub waste: Waste,
    /// Total weight.
    #[serde(default)]
    pub weight: Weight,
    /// Destination block.
    #[serde(default)]
    pub destination: Destination,
    /// Ordered transporter slots (at most 5).
    #[serde(default)]
    pub transporters: Vec<Transporter>,
    /// Containers shipped on this document.
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Intervention sheets, small-quantity collection only.
    #[serde(default)]
    pub intervention_sheets: Vec<InterventionSheetId>,
    /// Antecedent containers forwarded unchanged.
    #[serde(default)]
    pub forwarding: Vec<ContainerId>,
    /// Antecedent containers grouped together.
    #[serde(default)]
    pub grouping: Vec<ContainerId>,
    /// Antecedent containers merged into one new container.
    #[serde(default)]
    pub repackaging: Vec<ContainerId>,
    /// Ordered log of recorded signatures.
    #[serde(default)]
    pub transitions: Vec<SignatureRecord>,
}

fn initial_status() -> DocumentStatus {
    DocumentStatus::Initial
}

impl Document {
    /// Create an empty draft.
    pub fn new_draft(id: DocumentId, created_at: Timestamp) -> Self {
        Self {
            id,
            is_draft: true,
            is_deleted: false,
            created_at,
            status: DocumentStatus::Initial,
            kind: None,
            emitter: Emitter::default(),
            waste: Waste::default(),
            weight: Weight::default(),
            destination: Destination::default(),
            transporters: Vec::new(),
            containers: Vec::new(),
            intervention_sheets: Vec::new(),
            forwarding: Vec::new(),
            grouping: Vec::new(),
            repackaging: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Whether the document is of the given kind.
    pub fn is_kind(&self, kind: DocumentKind) -> bool {
        self.kind == Some(kind)
    }

    /// The transporter occupying slot `number` (1-based).
    pub fn transporter(&self, number: u8) -> Option<&Transporter> {
        self.transporters.iter().find(|t| t.number == number)
    }

    /// Mutable access to the transporter occupying slot `number`.
    pub fn transporter_mut(&mut self, number: u8) -> Option<&mut Transporter> {
        self.transporters.iter_mut().find(|t| t.number == number)
    }

    /// Transporters in slot order.
    pub fn sorted_transporters(&self) -> Vec<&Transporter> {
        let mut sorted: Vec<&Transporter> = self.transporters.iter().collect();
        sorted.sort_by_key(|t| t.number);
        sorted
    }

    /// Whether the transporter in slot `number` has signed.
    pub fn is_transport_signed(&self, number: u8) -> bool {
        self.transporter(number).is_some_and(Transporter::is_signed)
    }

    /// The container with the given id.
    pub fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.iter().find(|c| &c.id == id)
    }

    /// Mutable access to the container with the given id.
    pub fn container_mut(&mut self, id: &ContainerId) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| &c.id == id)
    }

    /// Reference lists as `(kind, ids)` pairs, in a fixed order.
    pub fn reference_lists(&self) -> [(DocumentKind, &[ContainerId]); 3] {
        [
            (DocumentKind::Forwarding, self.forwarding.as_slice()),
            (DocumentKind::Grouping, self.grouping.as_slice()),
            (DocumentKind::Repackaging, self.repackaging.as_slice()),
        ]
    }

    /// Every antecedent container referenced by this document.
    pub fn antecedent_ids(&self) -> Vec<ContainerId> {
        self.reference_lists()
            .into_iter()
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// Pin system-managed container links to their persisted values.
    /// Containers new to the proposal start unlinked.
    pub fn keep_container_links(&mut self, persisted: Option<&Document>) {
        for container in &mut self.containers {
            let old = persisted.and_then(|p| p.container(&container.id));
            container.keep_system_links(old);
        }
    }

    /// Renumber transporters 1..n in their current slot order.
    pub fn renumber_transporters(&mut self) {
        self.transporters.sort_by_key(|t| t.number);
        for (idx, transporter) in self.transporters.iter_mut().enumerate() {
            transporter.number = u8::try_from(idx + 1).unwrap_or(u8::MAX);
        }
    }
}
