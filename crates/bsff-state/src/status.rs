//! # Status Aggregator
//!
//! Derives a document's status from the independent states of its
//! containers.
//!
//! ## Reduction
//!
//! Each container contributes four booleans, computed on its *terminal*
//! successor (a container grouped, forwarded or repackaged into another
//! document inherits the state of the last container of that chain):
//!
//! | flag | holds when |
//! |---|---|
//! | `accepted` | acceptance signed, status ACCEPTED |
//! | `refused` | acceptance signed, status REFUSED |
//! | `processed` | refused, or operation signed with a final code |
//! | `intermediately_processed` | refused, or operation signed with a non-final code |
//!
//! Every `all_*` flag starts at `true` and is ANDed across containers.
//! The decision table is evaluated top to bottom, first match wins:
//!
//! 1. all refused → `REFUSED`
//! 2. all processed → `PROCESSED`
//! 3. all intermediately processed, or every container processed or
//!    intermediately processed → `INTERMEDIATELY_PROCESSED`
//! 4. all accepted → `ACCEPTED`
//! 5. every container accepted or refused → `PARTIALLY_REFUSED`
//! 6. otherwise the stored status, unchanged.
//!
//! The reduction is commutative, so container order never matters.

use std::collections::{HashMap, HashSet};

use bsff_core::{AcceptationStatus, ContainerId, DocumentStatus};

use crate::container::Container;
use crate::document::Document;

/// Per-container state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerOutcome {
    /// Acceptance signed as ACCEPTED.
    pub accepted: bool,
    /// Acceptance signed as REFUSED.
    pub refused: bool,
    /// Refused, or operated with a final code.
    pub processed: bool,
    /// Refused, or operated with a non-final code.
    pub intermediately_processed: bool,
}

impl ContainerOutcome {
    /// Flags of a single container.
    pub fn of(container: &Container) -> Self {
        let signed_status = container
            .acceptation
            .signature
            .as_ref()
            .and(container.acceptation.status);
        let accepted = signed_status == Some(AcceptationStatus::Accepted);
        let refused = signed_status == Some(AcceptationStatus::Refused);
        let finality = if container.is_operation_signed() {
            container.operation.is_final()
        } else {
            None
        };
        Self {
            accepted,
            refused,
            processed: refused || finality == Some(true),
            intermediately_processed: refused || finality == Some(false),
        }
    }
}

/// Aggregated flags over a set of containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reduction {
    all_accepted: bool,
    all_refused: bool,
    all_processed: bool,
    all_intermediately_processed: bool,
    all_processed_or_intermediately_processed: bool,
    all_accepted_or_refused: bool,
}

impl Reduction {
    fn start() -> Self {
        Self {
            all_accepted: true,
            all_refused: true,
            all_processed: true,
            all_intermediately_processed: true,
            all_processed_or_intermediately_processed: true,
            all_accepted_or_refused: true,
        }
    }

    fn fold(self, o: ContainerOutcome) -> Self {
        Self {
            all_accepted: self.all_accepted && o.accepted,
            all_refused: self.all_refused && o.refused,
            all_processed: self.all_processed && o.processed,
            all_intermediately_processed: self.all_intermediately_processed
                && o.intermediately_processed,
            all_processed_or_intermediately_processed: self
                .all_processed_or_intermediately_processed
                && (o.processed || o.intermediately_processed),
            all_accepted_or_refused: self.all_accepted_or_refused && (o.accepted || o.refused),
        }
    }

    fn decide(self, stored: DocumentStatus) -> DocumentStatus {
        if self.all_refused {
            DocumentStatus::Refused
        } else if self.all_processed {
            DocumentStatus::Processed
        } else if self.all_intermediately_processed || self.all_processed_or_intermediately_processed
        {
            DocumentStatus::IntermediatelyProcessed
        } else if self.all_accepted {
            DocumentStatus::Accepted
        } else if self.all_accepted_or_refused {
            DocumentStatus::PartiallyRefused
        } else {
            stored
        }
    }
}

/// Derive a document's status from already-resolved container states.
///
/// `containers` are the terminal successors of the document's containers
/// (see [`SuccessorIndex::terminal`]). Without containers the stored status
/// is returned.
pub fn derive_status(document: &Document, containers: &[&Container]) -> DocumentStatus {
    if containers.is_empty() {
        return document.status;
    }
    containers
        .iter()
        .map(|c| ContainerOutcome::of(c))
        .fold(Reduction::start(), Reduction::fold)
        .decide(document.status)
}

/// Derive a document's status, following each container's successor chain
/// through `successors`.
pub fn derive_document_status(document: &Document, successors: &SuccessorIndex<'_>) -> DocumentStatus {
    let terminals: Vec<&Container> = document
        .containers
        .iter()
        .map(|c| successors.terminal(c))
        .collect();
    derive_status(document, &terminals)
}

/// Lookup of containers by id, used to follow `next_container_id` chains.
#[derive(Debug, Default)]
pub struct SuccessorIndex<'a> {
    by_id: HashMap<&'a ContainerId, &'a Container>,
}

impl<'a> SuccessorIndex<'a> {
    /// Index every container in `containers`.
    pub fn new(containers: impl IntoIterator<Item = &'a Container>) -> Self {
        Self {
            by_id: containers.into_iter().map(|c| (&c.id, c)).collect(),
        }
    }

    /// Index the containers of several documents.
    pub fn from_documents(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        Self::new(documents.into_iter().flat_map(|d| d.containers.iter()))
    }

    /// The last known container of `container`'s successor chain. Stops at
    /// an unknown successor or on a cycle.
    pub fn terminal(&self, container: &'a Container) -> &'a Container {
        let mut current = container;
        let mut visited = HashSet::new();
        visited.insert(&container.id);
        while let Some(next) = current
            .next_container_id
            .as_ref()
            .and_then(|id| self.by_id.get(id).copied())
        {
            if !visited.insert(&next.id) {
                break;
            }
            current = next;
        }
        current
    }
}
