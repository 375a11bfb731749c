//! # Signature Transitions
//!
//! Records stage signatures on a document and keeps its stored status in
//! step. Every transition checks its preconditions first and leaves the
//! document untouched on error; successful transitions append a
//! [`SignatureRecord`] to the document's transition log.
//!
//! ```text
//! INITIAL ──emission──▶ SIGNED_BY_EMITTER ──transport──▶ SENT ──reception──▶ RECEIVED
//!   RECEIVED ──acceptation──▶ derived ──operation──▶ derived
//! ```
//!
//! Acceptance and operation are signed per container (or for every pending
//! container at once); the status after them is derived by the status
//! aggregator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bsff_core::{ContainerId, DocumentId, DocumentStatus, Timestamp};

use crate::container::Container;
use crate::document::{Document, Signature};
use crate::stage::Stage;
use crate::status::derive_status;

// ─── Error Types ─────────────────────────────────────────────────────

/// Errors from signature transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Drafts cannot be signed.
    #[error("document {document} is a draft and cannot be signed")]
    DraftDocument {
        /// The draft document.
        document: DocumentId,
    },

    /// The stage was already signed.
    #[error("stage {stage} is already signed")]
    AlreadySigned {
        /// The stage.
        stage: Stage,
    },

    /// A preceding stage is missing.
    #[error("stage {stage} cannot be signed before {requires}")]
    OutOfOrder {
        /// The stage being signed.
        stage: Stage,
        /// The stage that must be signed first.
        requires: Stage,
    },

    /// No transporter occupies the slot.
    #[error("no transporter in slot {number}")]
    UnknownTransporter {
        /// Requested slot.
        number: u8,
    },

    /// The container is not part of the document.
    #[error("container {id} is not part of the document")]
    UnknownContainer {
        /// Requested container.
        id: ContainerId,
    },

    /// A refused container has no operation.
    #[error("container {id} was refused and cannot be operated")]
    RefusedContainer {
        /// The refused container.
        id: ContainerId,
    },

    /// Acceptance and operation need at least one pending container.
    #[error("no container is awaiting a {stage} signature")]
    NoContainers {
        /// The stage being signed.
        stage: Stage,
    },
}

// ─── Transition log ──────────────────────────────────────────────────

/// A recorded signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    /// Signed stage.
    pub stage: Stage,
    /// Container signed, for acceptance and operation signatures.
    #[serde(default)]
    pub container_id: Option<ContainerId>,
    /// Signing person.
    pub author: String,
    /// Signature date.
    pub timestamp: Timestamp,
    /// Stored status after the signature.
    pub status_after: DocumentStatus,
}

/// Previous-container pointers freed by refused containers. The caller
/// clears `next_container_id` on each of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleasedContainers(pub Vec<ContainerId>);

// ─── Transitions ─────────────────────────────────────────────────────

impl Document {
    /// Sign the emission.
    pub fn sign_emission(&mut self, signature: Signature) -> Result<(), SignatureError> {
        self.require_signable()?;
        if self.emitter.emission_signature.is_some() {
            return Err(SignatureError::AlreadySigned {
                stage: Stage::Emission,
            });
        }
        self.record(Stage::Emission, None, &signature, DocumentStatus::SignedByEmitter);
        self.emitter.emission_signature = Some(signature);
        Ok(())
    }

    /// Sign the pickup of transporter slot `number`.
    pub fn sign_transport(&mut self, number: u8, signature: Signature) -> Result<(), SignatureError> {
        self.require_signable()?;
        let stage = Stage::transport(usize::from(number))
            .ok_or(SignatureError::UnknownTransporter { number })?;
        self.require_reached(stage, Stage::Emission, self.emitter.emission_signature.is_some())?;
        if number > 1 {
            let previous = Stage::Transport(number - 1);
            self.require_reached(stage, previous, self.is_transport_signed(number - 1))?;
        }
        let transporter = self
            .transporter(number)
            .ok_or(SignatureError::UnknownTransporter { number })?;
        if transporter.is_signed() {
            return Err(SignatureError::AlreadySigned { stage });
        }
        self.record(stage, None, &signature, DocumentStatus::Sent);
        if let Some(transporter) = self.transporter_mut(number) {
            transporter.transport.signature = Some(signature);
        }
        Ok(())
    }

    /// Sign the reception. At least the first transporter must have signed.
    pub fn sign_reception(&mut self, signature: Signature) -> Result<(), SignatureError> {
        self.require_signable()?;
        self.require_reached(Stage::Reception, Stage::Transport(1), self.is_transport_signed(1))?;
        if self.destination.reception_signature.is_some() {
            return Err(SignatureError::AlreadySigned {
                stage: Stage::Reception,
            });
        }
        self.record(Stage::Reception, None, &signature, DocumentStatus::Received);
        self.destination.reception_signature = Some(signature);
        Ok(())
    }

    /// Sign the acceptance of one container, or of every container whose
    /// acceptance is pending when `container` is `None`.
    ///
    /// The acceptance waste code defaults to the document's. Returns the
    /// previous containers of refused containers, which become available
    /// for another grouping, forwarding or repackaging.
    pub fn sign_acceptation(
        &mut self,
        container: Option<&ContainerId>,
        signature: Signature,
    ) -> Result<ReleasedContainers, SignatureError> {
        self.require_signable()?;
        self.require_reached(
            Stage::Acceptation,
            Stage::Reception,
            self.destination.reception_signature.is_some(),
        )?;
        let targets = self.pending(container, Stage::Acceptation, Container::is_acceptation_signed)?;

        let document_code = self.waste.code.clone();
        let mut released = Vec::new();
        for id in &targets {
            if let Some(c) = self.container_mut(id) {
                if c.acceptation.waste_code.as_deref().map_or(true, |s| s.trim().is_empty()) {
                    c.acceptation.waste_code = document_code.clone();
                }
                c.acceptation.signature = Some(signature.clone());
                if c.is_refused() {
                    released.extend(c.previous_containers.iter().cloned());
                }
            }
        }
        let status = self.derived_status();
        for id in targets {
            self.record(Stage::Acceptation, Some(id), &signature, status);
        }
        Ok(ReleasedContainers(released))
    }

    /// Sign the operation of one container, or of every accepted container
    /// whose operation is pending when `container` is `None`.
    pub fn sign_operation(
        &mut self,
        container: Option<&ContainerId>,
        signature: Signature,
    ) -> Result<(), SignatureError> {
        self.require_signable()?;
        let targets = match container {
            Some(id) => {
                let c = self
                    .container(id)
                    .ok_or_else(|| SignatureError::UnknownContainer { id: id.clone() })?;
                if !c.is_acceptation_signed() {
                    return Err(SignatureError::OutOfOrder {
                        stage: Stage::Operation,
                        requires: Stage::Acceptation,
                    });
                }
                if c.is_refused() {
                    return Err(SignatureError::RefusedContainer { id: id.clone() });
                }
                if c.is_operation_signed() {
                    return Err(SignatureError::AlreadySigned {
                        stage: Stage::Operation,
                    });
                }
                vec![id.clone()]
            }
            None => {
                let ids: Vec<ContainerId> = self
                    .containers
                    .iter()
                    .filter(|c| c.is_acceptation_signed() && !c.is_refused())
                    .filter(|c| !c.is_operation_signed())
                    .map(|c| c.id.clone())
                    .collect();
                if ids.is_empty() {
                    return Err(SignatureError::NoContainers {
                        stage: Stage::Operation,
                    });
                }
                ids
            }
        };

        for id in &targets {
            if let Some(c) = self.container_mut(id) {
                c.operation.signature = Some(signature.clone());
            }
        }
        let status = self.derived_status();
        for id in targets {
            self.record(Stage::Operation, Some(id), &signature, status);
        }
        Ok(())
    }

    /// Check that the document accepts signatures.
    fn require_signable(&self) -> Result<(), SignatureError> {
        if self.is_draft {
            return Err(SignatureError::DraftDocument {
                document: self.id.clone(),
            });
        }
        Ok(())
    }

    fn require_reached(&self, stage: Stage, requires: Stage, reached: bool) -> Result<(), SignatureError> {
        if reached {
            Ok(())
        } else {
            Err(SignatureError::OutOfOrder { stage, requires })
        }
    }

    /// Ids of the containers a container-level signature applies to.
    fn pending(
        &self,
        container: Option<&ContainerId>,
        stage: Stage,
        is_signed: fn(&Container) -> bool,
    ) -> Result<Vec<ContainerId>, SignatureError> {
        match container {
            Some(id) => {
                let c = self
                    .container(id)
                    .ok_or_else(|| SignatureError::UnknownContainer { id: id.clone() })?;
                if is_signed(c) {
                    return Err(SignatureError::AlreadySigned { stage });
                }
                Ok(vec![id.clone()])
            }
            None => {
                let ids: Vec<ContainerId> = self
                    .containers
                    .iter()
                    .filter(|c| !is_signed(c))
                    .map(|c| c.id.clone())
                    .collect();
                if ids.is_empty() {
                    return Err(SignatureError::NoContainers { stage });
                }
                Ok(ids)
            }
        }
    }

    fn derived_status(&self) -> DocumentStatus {
        let containers: Vec<&Container> = self.containers.iter().collect();
        derive_status(self, &containers)
    }

    /// Record a signature and the resulting status.
    fn record(
        &mut self,
        stage: Stage,
        container_id: Option<ContainerId>,
        signature: &Signature,
        status_after: DocumentStatus,
    ) {
        self.transitions.push(SignatureRecord {
            stage,
            container_id,
            author: signature.author.clone(),
            timestamp: signature.date,
            status_after,
        });
        self.status = status_after;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::document_stage;
    use crate::transporter::Transporter;
    use bsff_core::{AcceptationStatus, OperationCode, TransporterId};

    fn sig(author: &str) -> Signature {
        Signature {
            author: author.into(),
            date: Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        }
    }

    fn shipment() -> Document {
        let mut d = Document::new_draft(
            DocumentId("FF-1".into()),
            Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        );
        d.is_draft = false;
        d.waste.code = Some("14 06 01*".into());
        d.transporters
            .push(Transporter::new(TransporterId("t1".into()), 1));
        d.transporters
            .push(Transporter::new(TransporterId("t2".into()), 2));
        for id in ["c1", "c2"] {
            d.containers.push(Container::new(ContainerId(id.into())));
        }
        d
    }

    fn received() -> Document {
        let mut d = shipment();
        d.sign_emission(sig("emitter")).unwrap();
        d.sign_transport(1, sig("carrier")).unwrap();
        d.sign_reception(sig("destination")).unwrap();
        d
    }

    // ── Preconditions ────────────────────────────────────────────────

    #[test]
    fn test_draft_cannot_be_signed() {
        let mut d = shipment();
        d.is_draft = true;
        assert!(matches!(
            d.sign_emission(sig("e")),
            Err(SignatureError::DraftDocument { .. })
        ));
        assert!(d.transitions.is_empty());
    }

    #[test]
    fn test_emission_signed_once() {
        let mut d = shipment();
        d.sign_emission(sig("e")).unwrap();
        assert_eq!(d.status, DocumentStatus::SignedByEmitter);
        assert_eq!(
            d.sign_emission(sig("e")),
            Err(SignatureError::AlreadySigned {
                stage: Stage::Emission
            })
        );
    }

    #[test]
    fn test_transport_requires_emission() {
        let mut d = shipment();
        assert_eq!(
            d.sign_transport(1, sig("t")),
            Err(SignatureError::OutOfOrder {
                stage: Stage::Transport(1),
                requires: Stage::Emission
            })
        );
    }

    #[test]
    fn test_second_transport_requires_first() {
        let mut d = shipment();
        d.sign_emission(sig("e")).unwrap();
        assert!(matches!(
            d.sign_transport(2, sig("t")),
            Err(SignatureError::OutOfOrder { .. })
        ));
        d.sign_transport(1, sig("t")).unwrap();
        d.sign_transport(2, sig("t")).unwrap();
        assert_eq!(document_stage(&d), Some(Stage::Transport(2)));
    }

    #[test]
    fn test_unknown_slot() {
        let mut d = shipment();
        d.sign_emission(sig("e")).unwrap();
        d.sign_transport(1, sig("t")).unwrap();
        d.sign_transport(2, sig("t")).unwrap();
        assert_eq!(
            d.sign_transport(3, sig("t")),
            Err(SignatureError::UnknownTransporter { number: 3 })
        );
    }

    #[test]
    fn test_reception_requires_transport() {
        let mut d = shipment();
        d.sign_emission(sig("e")).unwrap();
        assert!(d.sign_reception(sig("d")).is_err());
    }

    // ── Container signatures ─────────────────────────────────────────

    #[test]
    fn test_acceptation_defaults_waste_code() {
        let mut d = received();
        let id = ContainerId("c1".into());
        d.container_mut(&id).unwrap().acceptation.status = Some(AcceptationStatus::Accepted);
        d.sign_acceptation(Some(&id), sig("d")).unwrap();
        let c = d.container(&id).unwrap();
        assert_eq!(c.acceptation.waste_code.as_deref(), Some("14 06 01*"));
        assert_eq!(d.status, DocumentStatus::Received);
    }

    #[test]
    fn test_refusal_releases_previous_containers() {
        let mut d = received();
        for c in &mut d.containers {
            c.acceptation.status = Some(AcceptationStatus::Refused);
        }
        d.containers[0].previous_containers = vec![ContainerId("old".into())];
        let released = d.sign_acceptation(None, sig("d")).unwrap();
        assert_eq!(released, ReleasedContainers(vec![ContainerId("old".into())]));
        assert_eq!(d.status, DocumentStatus::Refused);
        assert_eq!(document_stage(&d), Some(Stage::Operation));
    }

    #[test]
    fn test_operation_requires_acceptance() {
        let mut d = received();
        let id = ContainerId("c1".into());
        assert!(matches!(
            d.sign_operation(Some(&id), sig("d")),
            Err(SignatureError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_refused_container_cannot_be_operated() {
        let mut d = received();
        let id = ContainerId("c1".into());
        d.container_mut(&id).unwrap().acceptation.status = Some(AcceptationStatus::Refused);
        d.sign_acceptation(Some(&id), sig("d")).unwrap();
        assert_eq!(
            d.sign_operation(Some(&id), sig("d")),
            Err(SignatureError::RefusedContainer { id })
        );
    }

    #[test]
    fn test_full_lifecycle_reaches_processed() {
        let mut d = received();
        for c in &mut d.containers {
            c.acceptation.status = Some(AcceptationStatus::Accepted);
            c.operation.code = Some(OperationCode::R2);
        }
        d.sign_acceptation(None, sig("d")).unwrap();
        assert_eq!(d.status, DocumentStatus::Accepted);
        d.sign_operation(None, sig("d")).unwrap();
        assert_eq!(d.status, DocumentStatus::Processed);
        assert_eq!(document_stage(&d), Some(Stage::Operation));
        let stages: Vec<Stage> = d.transitions.iter().map(|r| r.stage).collect();
        assert_eq!(stages.first(), Some(&Stage::Emission));
        assert_eq!(stages.len(), 3 + 2 + 2);
    }

    #[test]
    fn test_operation_all_with_nothing_pending() {
        let mut d = received();
        assert_eq!(
            d.sign_operation(None, sig("d")),
            Err(SignatureError::NoContainers {
                stage: Stage::Operation
            })
        );
    }
}
