//! Integration test: a direct shipment signed stage after stage through the
//! signing workflow, with sealing checked in between.

mod common;

use std::sync::Arc;

use bsff_core::{ContainerId, DocumentStatus, OperationCode, OperationMode};
use bsff_state::{Stage, UserRoles};
use bsff_validation::{
    sign, validate_document_sync, IssueKind, InMemoryStore, PipelineError, SignRequest,
    ValidationContext, WorkflowError,
};
use common::*;

fn request(stage: Stage, container: Option<&str>, author: &str) -> SignRequest {
    SignRequest {
        stage,
        container: container.map(|id| ContainerId(id.into())),
        signature: signature(author),
    }
}

#[tokio::test]
async fn test_direct_shipment_full_lifecycle() {
    let store = Arc::new(InMemoryStore::new());
    let validator = validator(store.clone());
    let ctx = ValidationContext::system(now());

    let document = direct_document("FF-1");
    let signed = sign(&validator, &document, request(Stage::Emission, None, "Emitter"), ctx)
        .await
        .unwrap();
    assert_eq!(signed.document.status, DocumentStatus::SignedByEmitter);

    let signed = sign(&validator, &signed.document, request(Stage::Transport(1), None, "Driver"), ctx)
        .await
        .unwrap();
    assert_eq!(signed.document.status, DocumentStatus::Sent);

    let mut document = signed.document;
    document.destination.reception_date = Some(now());
    let signed = sign(&validator, &document, request(Stage::Reception, None, "Receiver"), ctx)
        .await
        .unwrap();
    assert_eq!(signed.document.status, DocumentStatus::Received);

    let mut document = signed.document;
    accept(&mut document.containers[0], 9.5);
    let signed = sign(&validator, &document, request(Stage::Acceptation, Some("c1"), "Receiver"), ctx)
        .await
        .unwrap();
    assert_eq!(signed.document.status, DocumentStatus::Accepted);
    assert_eq!(
        signed.document.containers[0].acceptation.waste_code.as_deref(),
        Some("14 06 01*")
    );

    let mut document = signed.document;
    let operation = &mut document.containers[0].operation;
    operation.date = Some(now());
    operation.code = Some(OperationCode::R1);
    operation.mode = Some(OperationMode::EnergyRecovery);
    operation.description = Some("Incineration with energy recovery".into());
    let signed = sign(&validator, &document, request(Stage::Operation, Some("c1"), "Operator"), ctx)
        .await
        .unwrap();
    assert_eq!(signed.document.status, DocumentStatus::Processed);
    assert!(signed.plan.is_empty());

    let stages: Vec<Stage> = signed.document.transitions.iter().map(|t| t.stage).collect();
    assert_eq!(
        stages,
        [
            Stage::Emission,
            Stage::Transport(1),
            Stage::Reception,
            Stage::Acceptation,
            Stage::Operation
        ]
    );
}

#[tokio::test]
async fn test_reception_requires_reception_date() {
    let store = Arc::new(InMemoryStore::new());
    let validator = validator(store);
    let ctx = ValidationContext::system(now());

    let mut document = direct_document("FF-1");
    document.sign_emission(signature("Emitter")).unwrap();
    document.sign_transport(1, signature("Driver")).unwrap();

    let err = sign(&validator, &document, request(Stage::Reception, None, "Receiver"), ctx)
        .await
        .unwrap_err();
    let WorkflowError::Pipeline(PipelineError::Invalid(errors)) = err else {
        panic!("expected validation issues");
    };
    assert_eq!(errors.issues().len(), 1);
    assert_eq!(errors.issues()[0].dotted_path(), "destination.receptionDate");
    assert_eq!(errors.issues()[0].kind, IssueKind::Required);
}

#[tokio::test]
async fn test_missing_mode_blocks_operation() {
    let store = Arc::new(InMemoryStore::new());
    let validator = validator(store);
    let ctx = ValidationContext::system(now());

    let mut document = direct_document("FF-1");
    document.sign_emission(signature("Emitter")).unwrap();
    document.sign_transport(1, signature("Driver")).unwrap();
    document.destination.reception_date = Some(now());
    document.sign_reception(signature("Receiver")).unwrap();
    accept(&mut document.containers[0], 9.5);
    document.sign_acceptation(None, signature("Receiver")).unwrap();

    let operation = &mut document.containers[0].operation;
    operation.date = Some(now());
    operation.code = Some(OperationCode::R2);
    operation.description = Some("Regeneration".into());

    let err = sign(&validator, &document, request(Stage::Operation, Some("c1"), "Operator"), ctx)
        .await
        .unwrap_err();
    let WorkflowError::Pipeline(pipeline) = err else {
        panic!("expected validation issues");
    };
    assert!(pipeline
        .issues()
        .is_some_and(|e| e.mentions("You must specify a treatment mode.")));
}

#[test]
fn test_emission_signature_seals_waste_code() {
    let mut persisted = direct_document("FF-1");
    persisted.sign_emission(signature("Emitter")).unwrap();
    let mut proposed = persisted.clone();
    proposed.waste.code = Some("14 06 02*".into());

    let ctx = ValidationContext::system(now());
    let errors = validate_document_sync(proposed, Some(&persisted), &ctx, &Default::default())
        .unwrap_err();
    let sealed: Vec<String> = errors
        .of_kind(IssueKind::Sealed)
        .map(|i| i.dotted_path())
        .collect();
    assert_eq!(sealed, ["waste.code"]);
}

#[test]
fn test_emitter_keeps_editing_until_pickup() {
    let emitter = UserRoles {
        is_emitter: true,
        ..Default::default()
    };
    let ctx = ValidationContext::new(emitter, now());

    let mut persisted = direct_document("FF-1");
    persisted.sign_emission(signature("Emitter")).unwrap();
    let mut proposed = persisted.clone();
    proposed.waste.code = Some("14 06 02*".into());
    let validated =
        validate_document_sync(proposed.clone(), Some(&persisted), &ctx, &Default::default())
            .unwrap();
    assert_eq!(validated.updated_fields, ["waste.code"]);

    persisted.sign_transport(1, signature("Driver")).unwrap();
    proposed.transporters = persisted.transporters.clone();
    proposed.transitions = persisted.transitions.clone();
    proposed.status = persisted.status;
    let errors = validate_document_sync(proposed, Some(&persisted), &ctx, &Default::default())
        .unwrap_err();
    assert_eq!(errors.of_kind(IssueKind::Sealed).count(), 1);
}

#[test]
fn test_revalidating_unchanged_document_is_idempotent() {
    let mut persisted = direct_document("FF-1");
    persisted.sign_emission(signature("Emitter")).unwrap();
    let ctx = ValidationContext::system(now());
    let validated =
        validate_document_sync(persisted.clone(), Some(&persisted), &ctx, &Default::default())
            .unwrap();
    assert!(validated.updated_fields.is_empty());
    assert_eq!(validated.document, persisted);
}

#[test]
fn test_clearing_successor_link_keeps_acceptance_sealed() {
    let mut persisted = direct_document("FF-1");
    persisted.sign_emission(signature("Emitter")).unwrap();
    persisted.sign_transport(1, signature("Driver")).unwrap();
    persisted.destination.reception_date = Some(now());
    persisted.sign_reception(signature("Receiver")).unwrap();
    accept(&mut persisted.containers[0], 9.0);
    persisted.sign_acceptation(None, signature("Receiver")).unwrap();
    persisted.containers[0].next_container_id = Some(ContainerId("succ".into()));
    let ctx = ValidationContext::system(now());

    let mut proposed = persisted.clone();
    proposed.containers[0].next_container_id = None;
    let validated =
        validate_document_sync(proposed.clone(), Some(&persisted), &ctx, &Default::default())
            .unwrap();
    assert!(validated.updated_fields.is_empty());
    assert_eq!(
        validated.document.containers[0].next_container_id,
        Some(ContainerId("succ".into()))
    );

    proposed.containers[0].acceptation.weight = Some(1.0);
    let errors = validate_document_sync(proposed, Some(&persisted), &ctx, &Default::default())
        .unwrap_err();
    let sealed: Vec<String> = errors
        .of_kind(IssueKind::Sealed)
        .map(|i| i.dotted_path())
        .collect();
    assert_eq!(sealed, ["containers.0.acceptation.weight"]);
}

#[tokio::test]
async fn test_refused_container_weight_must_be_zero() {
    let store = Arc::new(InMemoryStore::new());
    let validator = validator(store);
    let ctx = ValidationContext::system(now()).with_target(Stage::Acceptation);

    let mut document = direct_document("FF-1");
    document.sign_emission(signature("Emitter")).unwrap();
    document.sign_transport(1, signature("Driver")).unwrap();
    document.destination.reception_date = Some(now());
    document.sign_reception(signature("Receiver")).unwrap();

    let mut container = document.containers[0].clone();
    refuse(&mut container);
    container.acceptation.weight = Some(1.0);
    let errors = validator
        .validate_container(container.clone(), None, &document, &ctx)
        .await
        .unwrap_err();
    assert!(errors
        .issues()
        .is_some_and(|e| e.mentions("Acceptance weight must be 0 when refused")));

    container.acceptation.weight = Some(0.0);
    assert!(validator
        .validate_container(container, None, &document, &ctx)
        .await
        .is_ok());
}
