//! Shared fixtures for the integration tests: a registry holding every
//! company the scenarios use, and document builders complete enough to be
//! signed stage after stage.

#![allow(dead_code)]

use std::sync::Arc;

use bsff_core::{
    AcceptationStatus, CompanyDescriptor, ContainerId, DocumentId, DocumentKind, EngineConfig,
    OperationCode, PackagingType, Siret, Timestamp, TransportMode, TransporterId,
};
use bsff_state::{Container, Document, Signature, Transporter};
use bsff_validation::{
    CompanyProfile, CompanyRecord, InMemoryRegistry, InMemoryStore, TransporterReceipt, Validator,
};

pub const EMITTER: &str = "11111111111111";
pub const DESTINATION: &str = "22222222222222";
pub const COLLECTOR: &str = "44444444444444";
pub const CARRIER: &str = "55555555555555";

pub fn at(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

pub fn now() -> Timestamp {
    at("2024-10-02T10:00:00Z")
}

pub fn signature(author: &str) -> Signature {
    Signature {
        author: author.into(),
        date: now(),
    }
}

fn name_of(siret: &str) -> &'static str {
    match siret {
        EMITTER => "Clim Express",
        DESTINATION => "Regen Fluides",
        COLLECTOR => "Collecte Nord",
        CARRIER => "Trans Fluides",
        _ => "Unknown",
    }
}

pub fn company(siret: &str) -> CompanyDescriptor {
    CompanyDescriptor {
        name: Some(name_of(siret).into()),
        siret: Some(Siret(siret.into())),
        vat_number: None,
        address: Some(format!("{} avenue des Fluides, Lyon", &siret[..2])),
        contact: Some("Camille".into()),
        phone: Some("0400000000".into()),
        mail: Some("contact@example.org".into()),
    }
}

fn record(siret: &str, profiles: &[CompanyProfile]) -> CompanyRecord {
    let descriptor = company(siret);
    CompanyRecord {
        name: descriptor.name,
        address: descriptor.address,
        registered: true,
        profiles: profiles.to_vec(),
        transporter_receipt: None,
    }
}

pub fn receipt() -> TransporterReceipt {
    TransporterReceipt {
        number: "R-123".into(),
        department: "69".into(),
        validity_limit: at("2026-01-01T00:00:00Z"),
    }
}

pub fn registry() -> InMemoryRegistry {
    let registry = InMemoryRegistry::new();
    registry.insert(EMITTER, record(EMITTER, &[CompanyProfile::Producer]));
    registry.insert(DESTINATION, record(DESTINATION, &[CompanyProfile::WasteProcessor]));
    registry.insert(
        COLLECTOR,
        record(COLLECTOR, &[CompanyProfile::WasteProcessor, CompanyProfile::Collector]),
    );
    let mut carrier = record(CARRIER, &[CompanyProfile::Transporter]);
    carrier.transporter_receipt = Some(receipt());
    registry.insert(CARRIER, carrier);
    registry
}

pub fn validator(store: Arc<InMemoryStore>) -> Validator {
    Validator::new(store, Arc::new(registry()), EngineConfig::default())
}

pub fn road_carrier(number: u8) -> Transporter {
    let mut t = Transporter::new(TransporterId(format!("t{number}")), number);
    t.company = company(CARRIER);
    t.recepisse.is_exempted = Some(false);
    let receipt = receipt();
    t.recepisse.number = Some(receipt.number);
    t.recepisse.department = Some(receipt.department);
    t.recepisse.validity_limit = Some(receipt.validity_limit);
    t.transport.mode = Some(TransportMode::Road);
    t.transport.plates = vec!["AB-123-CD".into()];
    t
}

pub fn bottle(id: &str, weight: f64) -> Container {
    let mut c = Container::new(ContainerId(id.into()));
    c.packaging_type = Some(PackagingType::Bottle);
    c.volume = Some(15.0);
    c.weight = Some(weight);
    c.numero = Some(format!("N-{id}"));
    c.emission_numero = Some(format!("N-{id}"));
    c
}

/// A direct shipment holding every field required up to the first
/// transport signature.
pub fn direct_document(id: &str) -> Document {
    let mut d = Document::new_draft(DocumentId(id.into()), at("2024-10-01T08:00:00Z"));
    d.is_draft = false;
    d.kind = Some(DocumentKind::Direct);
    d.emitter.company = company(EMITTER);
    d.waste.code = Some("14 06 01*".into());
    d.waste.description = Some("R410A".into());
    d.waste.adr = Some("UN 1078".into());
    d.weight.value = Some(10.0);
    d.weight.is_estimate = Some(false);
    d.destination.company = company(DESTINATION);
    d.destination.planned_operation_code = Some(OperationCode::R1);
    d.transporters = vec![road_carrier(1)];
    d.containers = vec![bottle("c1", 10.0)];
    d
}

pub fn accept(container: &mut Container, weight: f64) {
    container.acceptation.date = Some(now());
    container.acceptation.status = Some(AcceptationStatus::Accepted);
    container.acceptation.weight = Some(weight);
    container.acceptation.waste_description = Some("R410A".into());
}

pub fn refuse(container: &mut Container) {
    container.acceptation.date = Some(now());
    container.acceptation.status = Some(AcceptationStatus::Refused);
    container.acceptation.weight = Some(0.0);
    container.acceptation.waste_description = Some("R410A".into());
    container.acceptation.refusal_reason = Some("Leaking valve".into());
}

/// A document received by `destination` whose containers were operated
/// with `code` and signed.
pub fn processed_document(
    id: &str,
    destination: &str,
    waste_code: &str,
    containers: &[&str],
    code: OperationCode,
) -> Document {
    let mut d = direct_document(id);
    d.waste.code = Some(waste_code.into());
    d.destination.company = company(destination);
    d.emitter.emission_signature = Some(signature("Emitter"));
    d.transporters[0].transport.signature = Some(signature("Driver"));
    d.destination.reception_date = Some(now());
    d.destination.reception_signature = Some(signature("Receiver"));
    d.containers = containers
        .iter()
        .map(|id| {
            let mut c = bottle(id, 5.0);
            accept(&mut c, 5.0);
            c.acceptation.signature = Some(signature("Receiver"));
            c.operation.date = Some(now());
            c.operation.code = Some(code);
            c.operation.description = Some("Storage".into());
            c.operation.signature = Some(signature("Operator"));
            c
        })
        .collect();
    d.status = bsff_core::DocumentStatus::IntermediatelyProcessed;
    d
}

/// A draft grouping emitted by the collector.
pub fn grouping_draft(id: &str, grouping: &[&str]) -> Document {
    let mut d = Document::new_draft(DocumentId(id.into()), at("2024-10-01T08:00:00Z"));
    d.kind = Some(DocumentKind::Grouping);
    d.emitter.company = company(COLLECTOR);
    d.grouping = grouping.iter().map(|id| ContainerId((*id).into())).collect();
    d
}
