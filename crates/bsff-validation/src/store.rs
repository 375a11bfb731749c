//! # Container Store
//!
//! The persistence collaborator. The validation pipeline only ever reads
//! from it: antecedent containers for lineage checks, transporter and
//! container records to attach, intervention sheets. Writes stay with the
//! caller, who applies a [`LineagePlan`] inside its own transaction.
//!
//! ## Architecture
//!
//! [`ContainerStore`] is `Send + Sync` and object-safe so a validator can
//! hold it behind an `Arc`. [`InMemoryStore`] backs the tests and the CLI;
//! it also implements the write side (`apply_plan`) so that end-to-end
//! scenarios can chain several documents.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use bsff_core::{
    CompanyDescriptor, ContainerId, DocumentId, InterventionSheetId, Siret, TransporterId,
};
use bsff_state::{derive_document_status, Container, Document, SuccessorIndex, Transporter};

use crate::issue::LookupError;
use crate::lineage::LineagePlan;

// ─── Records ─────────────────────────────────────────────────────────

/// A container referenced as an antecedent, with the fields of its owning
/// document the lineage checks need.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AntecedentContainer {
    /// The antecedent container.
    pub container: Container,
    /// Document carrying it.
    pub document_id: DocumentId,
    /// Waste code of that document.
    pub document_waste_code: Option<String>,
    /// Destination company of that document.
    pub destination: CompanyDescriptor,
    /// Document owning `container.next_container_id`, when set and known.
    pub next_document_id: Option<DocumentId>,
}

impl AntecedentContainer {
    /// Acceptance waste code, falling back to the owning document's.
    pub fn waste_code(&self) -> Option<&str> {
        self.container
            .effective_waste_code(self.document_waste_code.as_deref())
    }

    /// Container number, empty when unset.
    pub fn numero(&self) -> &str {
        self.container.numero.as_deref().unwrap_or_default()
    }
}

/// An intervention sheet attached to a small-quantity collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionSheet {
    /// Identity.
    pub id: InterventionSheetId,
    /// Readable number.
    pub numero: String,
    /// Operator who performed the intervention.
    pub operator_siret: Option<Siret>,
}

// ─── Collaborator trait ──────────────────────────────────────────────

/// Read access to persisted containers, transporters and intervention
/// sheets.
///
/// Implementations must be `Send + Sync` to be shared across async tasks
/// behind an `Arc`. Every method is a batched lookup; ids that do not
/// resolve are simply absent from the result.
#[async_trait]
pub trait ContainerStore: Send + Sync {
    /// Containers referenced as antecedents, with their document context.
    async fn find_antecedents(
        &self,
        ids: &[ContainerId],
    ) -> Result<Vec<AntecedentContainer>, LookupError>;

    /// Container records by id.
    async fn find_containers(&self, ids: &[ContainerId]) -> Result<Vec<Container>, LookupError>;

    /// Transporter records by id.
    async fn find_transporters(
        &self,
        ids: &[TransporterId],
    ) -> Result<Vec<Transporter>, LookupError>;

    /// Intervention sheets by id.
    async fn find_intervention_sheets(
        &self,
        ids: &[InterventionSheetId],
    ) -> Result<Vec<InterventionSheet>, LookupError>;
}

// ─── In-memory implementation ────────────────────────────────────────

#[derive(Debug, Default)]
struct StoreState {
    documents: HashMap<DocumentId, Document>,
    transporters: HashMap<TransporterId, Transporter>,
    containers: HashMap<ContainerId, Container>,
    sheets: HashMap<InterventionSheetId, InterventionSheet>,
}

impl StoreState {
    fn owner_of(&self, id: &ContainerId) -> Option<&Document> {
        self.documents.values().find(|d| d.container(id).is_some())
    }
}

/// Store keeping everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `documents`.
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        for document in documents {
            store.insert_document(document);
        }
        store
    }

    /// Insert or replace a document.
    pub fn insert_document(&self, document: Document) {
        self.state.write().documents.insert(document.id.clone(), document);
    }

    /// Insert a transporter record not yet attached to a document.
    pub fn insert_transporter(&self, transporter: Transporter) {
        self.state
            .write()
            .transporters
            .insert(transporter.id.clone(), transporter);
    }

    /// Insert a container record not yet attached to a document.
    pub fn insert_container(&self, container: Container) {
        self.state
            .write()
            .containers
            .insert(container.id.clone(), container);
    }

    /// Insert an intervention sheet.
    pub fn insert_intervention_sheet(&self, sheet: InterventionSheet) {
        self.state.write().sheets.insert(sheet.id.clone(), sheet);
    }

    /// A copy of the document with the given id.
    pub fn document(&self, id: &DocumentId) -> Option<Document> {
        self.state.read().documents.get(id).cloned()
    }

    /// Copies of every document, sorted by id.
    pub fn documents(&self) -> Vec<Document> {
        let mut documents: Vec<Document> = self.state.read().documents.values().cloned().collect();
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        documents
    }

    /// Apply a lineage plan: point every linked antecedent at its
    /// successor, clear the pointers of released antecedents, then
    /// recompute the stored status of every affected document.
    pub fn apply_plan(&self, plan: &LineagePlan) {
        let mut state = self.state.write();
        let mut affected: HashSet<DocumentId> = HashSet::new();

        for link in &plan.links {
            if let Some(document) = state.documents.get_mut(&link.previous_document) {
                if let Some(container) = document.container_mut(&link.previous) {
                    container.next_container_id = Some(link.next.clone());
                    affected.insert(document.id.clone());
                }
            }
        }
        for released in &plan.released {
            for document in state.documents.values_mut() {
                if let Some(container) = document.container_mut(released) {
                    container.next_container_id = None;
                    affected.insert(document.id.clone());
                }
            }
        }

        let updates: Vec<(DocumentId, _)> = {
            let index = SuccessorIndex::from_documents(state.documents.values());
            affected
                .iter()
                .filter_map(|id| state.documents.get(id))
                .map(|d| (d.id.clone(), derive_document_status(d, &index)))
                .collect()
        };
        for (id, status) in updates {
            if let Some(document) = state.documents.get_mut(&id) {
                if document.status != status {
                    tracing::debug!(document_id = %id, status = %status, "status updated by lineage");
                    document.status = status;
                }
            }
        }
    }
}

#[async_trait]
impl ContainerStore for InMemoryStore {
    async fn find_antecedents(
        &self,
        ids: &[ContainerId],
    ) -> Result<Vec<AntecedentContainer>, LookupError> {
        let state = self.state.read();
        let found = ids
            .iter()
            .filter_map(|id| {
                let document = state.owner_of(id)?;
                let container = document.container(id)?;
                let next_document_id = container
                    .next_container_id
                    .as_ref()
                    .and_then(|next| state.owner_of(next))
                    .map(|d| d.id.clone());
                Some(AntecedentContainer {
                    container: container.clone(),
                    document_id: document.id.clone(),
                    document_waste_code: document.waste.code.clone(),
                    destination: document.destination.company.clone(),
                    next_document_id,
                })
            })
            .collect();
        Ok(found)
    }

    async fn find_containers(&self, ids: &[ContainerId]) -> Result<Vec<Container>, LookupError> {
        let state = self.state.read();
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .containers
                    .get(id)
                    .or_else(|| state.owner_of(id).and_then(|d| d.container(id)))
                    .cloned()
            })
            .collect())
    }

    async fn find_transporters(
        &self,
        ids: &[TransporterId],
    ) -> Result<Vec<Transporter>, LookupError> {
        let state = self.state.read();
        Ok(ids
            .iter()
            .filter_map(|id| {
                state.transporters.get(id).cloned().or_else(|| {
                    state
                        .documents
                        .values()
                        .flat_map(|d| d.transporters.iter())
                        .find(|t| &t.id == id)
                        .cloned()
                })
            })
            .collect())
    }

    async fn find_intervention_sheets(
        &self,
        ids: &[InterventionSheetId],
    ) -> Result<Vec<InterventionSheet>, LookupError> {
        let state = self.state.read();
        Ok(ids.iter().filter_map(|id| state.sheets.get(id).cloned()).collect())
    }
}
