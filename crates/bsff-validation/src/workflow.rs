//! # Signing Workflow
//!
//! A signature is only recorded on a document that validates at the stage
//! being signed. [`sign`] runs the full asynchronous pipeline with that
//! stage as target, then applies the transition to the validated copy.
//!
//! Acceptance and operation of a single container validate the document
//! at its current stage and the container at the signed stage, so that
//! other containers still awaiting inspection do not block the signature.

use serde::Serialize;
use thiserror::Error;

use bsff_core::ContainerId;
use bsff_state::{Document, ReleasedContainers, Signature, SignatureError, Stage};

use crate::issue::PipelineError;
use crate::lineage::LineagePlan;
use crate::pipeline::{ValidationContext, Validator};

/// Errors from the signing workflow.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The document does not validate at the signed stage.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The transition itself was refused.
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// A signature to record.
#[derive(Debug, Clone, PartialEq)]
pub struct SignRequest {
    /// Stage being signed.
    pub stage: Stage,
    /// Single container, for acceptance and operation. `None` signs every
    /// pending container.
    pub container: Option<ContainerId>,
    /// Signing person and date.
    pub signature: Signature,
}

/// Result of a recorded signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDocument {
    /// The signed document, with its stored status updated.
    pub document: Document,
    /// Successor pointers to write, including the antecedents released by
    /// refused containers.
    pub plan: LineagePlan,
}

fn empty_plan(document: &Document) -> LineagePlan {
    LineagePlan {
        document_id: document.id.clone(),
        links: Vec::new(),
        released: Vec::new(),
    }
}

/// Validate `document` at `request.stage` and record the signature.
///
/// `document` is the persisted snapshot; it is not modified.
pub async fn sign(
    validator: &Validator,
    document: &Document,
    request: SignRequest,
    ctx: ValidationContext,
) -> Result<SignedDocument, WorkflowError> {
    if document.is_draft {
        return Err(SignatureError::DraftDocument {
            document: document.id.clone(),
        }
        .into());
    }

    let single = match (&request.container, request.stage) {
        (Some(id), Stage::Acceptation | Stage::Operation) => Some(id),
        _ => None,
    };
    let document_ctx = if single.is_some() {
        ValidationContext { target: None, ..ctx }
    } else {
        ctx.with_target(request.stage)
    };

    let validated = validator
        .validate_document(document.clone(), Some(document), &document_ctx)
        .await?;
    let mut signed = validated.document;
    let mut plan = validated.plan.unwrap_or_else(|| empty_plan(&signed));

    if let Some(id) = single {
        let container = signed
            .container(id)
            .cloned()
            .ok_or_else(|| SignatureError::UnknownContainer { id: id.clone() })?;
        let validated = validator
            .validate_container(
                container,
                document.container(id),
                &signed,
                &ctx.with_target(request.stage),
            )
            .await?;
        if let Some(slot) = signed.container_mut(id) {
            *slot = validated.container;
        }
    }

    let signature = request.signature;
    let ReleasedContainers(released) = match request.stage {
        Stage::Emission => signed.sign_emission(signature).map(|()| ReleasedContainers::default())?,
        Stage::Transport(number) => signed
            .sign_transport(number, signature)
            .map(|()| ReleasedContainers::default())?,
        Stage::Reception => signed.sign_reception(signature).map(|()| ReleasedContainers::default())?,
        Stage::Acceptation => signed.sign_acceptation(request.container.as_ref(), signature)?,
        Stage::Operation => signed
            .sign_operation(request.container.as_ref(), signature)
            .map(|()| ReleasedContainers::default())?,
    };
    plan.released.extend(released);

    tracing::info!(
        document_id = %signed.id,
        stage = %request.stage,
        status = %signed.status,
        released = plan.released.len(),
        "signature recorded"
    );
    metrics::counter!("bsff_signature_total", "stage" => stage_label(request.stage)).increment(1);
    Ok(SignedDocument {
        document: signed,
        plan,
    })
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Emission => "emission",
        Stage::Transport(_) => "transport",
        Stage::Reception => "reception",
        Stage::Acceptation => "acceptation",
        Stage::Operation => "operation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bsff_core::{DocumentId, EngineConfig, Timestamp};

    use crate::registry::InMemoryRegistry;
    use crate::store::InMemoryStore;

    fn validator() -> Validator {
        Validator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryRegistry::new()),
            EngineConfig::default(),
        )
    }

    fn signature() -> Signature {
        Signature {
            author: "Jane".into(),
            date: Timestamp::parse("2024-10-02T00:00:00Z").unwrap(),
        }
    }

    fn request(stage: Stage) -> SignRequest {
        SignRequest {
            stage,
            container: None,
            signature: signature(),
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext::system(Timestamp::parse("2024-10-02T00:00:00Z").unwrap())
    }

    #[tokio::test]
    async fn test_draft_cannot_be_signed() {
        let draft = Document::new_draft(
            DocumentId("FF-1".into()),
            Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        );
        let err = sign(&validator(), &draft, request(Stage::Emission), ctx())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Signature(SignatureError::DraftDocument { .. })
        ));
    }

    #[tokio::test]
    async fn test_incomplete_document_is_not_signed() {
        let mut document = Document::new_draft(
            DocumentId("FF-1".into()),
            Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        );
        document.is_draft = false;
        let err = sign(&validator(), &document, request(Stage::Emission), ctx())
            .await
            .unwrap_err();
        let WorkflowError::Pipeline(pipeline) = err else {
            panic!("expected a validation failure");
        };
        assert!(pipeline
            .issues()
            .is_some_and(|e| e.mentions("Waste code is a required field.")));
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(stage_label(Stage::Transport(3)), "transport");
        assert_eq!(stage_label(Stage::Operation), "operation");
    }
}
