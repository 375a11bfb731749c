//! Integration test: the subcommand handlers driven against a workspace
//! file on disk, the way the `bsff` binary runs them.

use std::path::Path;

use bsff_cli::fields::FieldsArgs;
use bsff_cli::sign::SignArgs;
use bsff_cli::status::StatusArgs;
use bsff_cli::validate::ValidateArgs;
use bsff_cli::workspace::Workspace;
use bsff_cli::CommandContext;
use bsff_core::{
    CompanyDescriptor, ContainerId, DocumentId, DocumentKind, DocumentStatus, EngineConfig,
    OperationCode, PackagingType, Siret, Timestamp, TransportMode, TransporterId,
};
use bsff_state::{Container, Document, Stage, Transporter};
use bsff_validation::{CompanyProfile, CompanyRecord, TransporterReceipt};

const EMITTER: &str = "11111111111111";
const DESTINATION: &str = "22222222222222";
const CARRIER: &str = "55555555555555";

fn at(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

fn company(siret: &str, name: &str) -> CompanyDescriptor {
    CompanyDescriptor {
        name: Some(name.into()),
        siret: Some(Siret(siret.into())),
        vat_number: None,
        address: Some("3 avenue des Fluides, Lyon".into()),
        contact: Some("Camille".into()),
        phone: Some("0400000000".into()),
        mail: Some("contact@example.org".into()),
    }
}

fn record(name: &str, profiles: &[CompanyProfile]) -> CompanyRecord {
    CompanyRecord {
        name: Some(name.into()),
        address: Some("3 avenue des Fluides, Lyon".into()),
        registered: true,
        profiles: profiles.to_vec(),
        transporter_receipt: None,
    }
}

fn receipt() -> TransporterReceipt {
    TransporterReceipt {
        number: "R-123".into(),
        department: "69".into(),
        validity_limit: at("2026-01-01T00:00:00Z"),
    }
}

fn document() -> Document {
    let mut d = Document::new_draft(DocumentId("FF-1".into()), at("2024-10-01T08:00:00Z"));
    d.is_draft = false;
    d.kind = Some(DocumentKind::Direct);
    d.emitter.company = company(EMITTER, "Clim Express");
    d.waste.code = Some("14 06 01*".into());
    d.waste.description = Some("R410A".into());
    d.waste.adr = Some("UN 1078".into());
    d.weight.value = Some(10.0);
    d.weight.is_estimate = Some(false);
    d.destination.company = company(DESTINATION, "Regen Fluides");
    d.destination.planned_operation_code = Some(OperationCode::R1);

    let mut t = Transporter::new(TransporterId("t1".into()), 1);
    t.company = company(CARRIER, "Trans Fluides");
    t.recepisse.is_exempted = Some(false);
    let receipt = receipt();
    t.recepisse.number = Some(receipt.number);
    t.recepisse.department = Some(receipt.department);
    t.recepisse.validity_limit = Some(receipt.validity_limit);
    t.transport.mode = Some(TransportMode::Road);
    t.transport.plates = vec!["AB-123-CD".into()];
    d.transporters = vec![t];

    let mut c = Container::new(ContainerId("c1".into()));
    c.packaging_type = Some(PackagingType::Bottle);
    c.volume = Some(15.0);
    c.weight = Some(10.0);
    c.numero = Some("N-c1".into());
    c.emission_numero = Some("N-c1".into());
    d.containers = vec![c];
    d
}

fn workspace() -> Workspace {
    let mut ws = Workspace::default();
    ws.upsert(document());
    ws.companies
        .insert(EMITTER.into(), record("Clim Express", &[CompanyProfile::Producer]));
    ws.companies.insert(
        DESTINATION.into(),
        record("Regen Fluides", &[CompanyProfile::WasteProcessor]),
    );
    let mut carrier = record("Trans Fluides", &[CompanyProfile::Transporter]);
    carrier.transporter_receipt = Some(receipt());
    ws.companies.insert(CARRIER.into(), carrier);
    ws.members.insert("jane".into(), vec![EMITTER.into()]);
    ws
}

fn context(path: &Path) -> CommandContext {
    CommandContext {
        workspace: Workspace::load(path).unwrap(),
        workspace_path: path.to_path_buf(),
        config: EngineConfig::default(),
        now: at("2024-10-02T10:00:00Z"),
    }
}

fn sign_args(stage: Stage, write: bool) -> SignArgs {
    SignArgs {
        id: "FF-1".into(),
        stage,
        container: None,
        author: "Jane".into(),
        date: None,
        user: None,
        write,
    }
}

#[tokio::test]
async fn test_sign_writes_back_and_seals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ws.json");
    workspace().save(&path).unwrap();

    let mut ctx = context(&path);
    let outcome = bsff_cli::sign::run(&sign_args(Stage::Emission, true), &mut ctx)
        .await
        .unwrap();
    assert!(outcome.ok, "{}", outcome.body);
    assert_eq!(outcome.body["status"], "SIGNED_BY_EMITTER");

    let ctx = context(&path);
    let stored = ctx.workspace.document("FF-1").unwrap();
    assert_eq!(stored.status, DocumentStatus::SignedByEmitter);
    assert!(stored.emitter.emission_signature.is_some());

    let fields = bsff_cli::fields::run(
        &FieldsArgs {
            id: "FF-1".into(),
            stage: None,
            user: None,
        },
        &ctx,
    )
    .unwrap();
    assert_eq!(fields.body["stage"], "EMISSION");
    let sealed: Vec<String> = serde_json::from_value(fields.body["sealed"].clone()).unwrap();
    assert!(sealed.contains(&"waste.code".to_string()));
    assert!(!sealed.contains(&"destination.receptionDate".to_string()));

    let status = bsff_cli::status::run(
        &StatusArgs {
            ids: Vec::new(),
            check: true,
        },
        &ctx,
    )
    .unwrap();
    assert!(status.ok);
    assert_eq!(status.body[0]["stored"], "SIGNED_BY_EMITTER");
}

#[tokio::test]
async fn test_sign_out_of_order_is_refused_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ws.json");
    workspace().save(&path).unwrap();

    let mut ctx = context(&path);
    let outcome = bsff_cli::sign::run(&sign_args(Stage::Reception, true), &mut ctx)
        .await
        .unwrap();
    assert!(!outcome.ok);
    assert_eq!(outcome.body["signed"], false);

    let ctx = context(&path);
    assert_eq!(
        ctx.workspace.document("FF-1").unwrap().status,
        DocumentStatus::Initial
    );
}

#[tokio::test]
async fn test_offline_patch_on_sealed_field_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ws.json");
    let mut ws = workspace();
    let mut signed = document();
    signed.emitter.emission_signature = Some(bsff_state::Signature {
        author: "Jane".into(),
        date: at("2024-10-02T09:00:00Z"),
    });
    signed.status = DocumentStatus::SignedByEmitter;
    ws.upsert(signed);
    ws.save(&path).unwrap();

    let patch = dir.path().join("patch.json");
    std::fs::write(&patch, r#"{"waste": {"description": "R32"}}"#).unwrap();
    let args = ValidateArgs {
        input: patch,
        patch: Some("FF-1".into()),
        stage: None,
        user: None,
        offline: true,
    };

    let ctx = context(&path);
    let outcome = bsff_cli::validate::run(&args, &ctx).await.unwrap();
    assert!(!outcome.ok);
    let issues = outcome.body["issues"].as_array().unwrap();
    assert!(issues
        .iter()
        .any(|i| i["kind"] == "SEALED" && i["path"] == serde_json::json!(["waste", "description"])));
}

#[tokio::test]
async fn test_unknown_document_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ws.json");
    workspace().save(&path).unwrap();

    let ctx = context(&path);
    let err = bsff_cli::status::run(
        &StatusArgs {
            ids: vec!["FF-9".into()],
            check: false,
        },
        &ctx,
    )
    .unwrap_err();
    assert!(err.to_string().contains("FF-9"));
}
