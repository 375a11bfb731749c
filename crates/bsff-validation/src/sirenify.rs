//! # Company Enrichment
//!
//! Overwrites user-supplied company names and addresses with the canonical
//! values held by the company registry, and fills a road carrier's receipt
//! from its registered transporter receipt. Runs before required-field
//! checks so that registry data can satisfy them.
//!
//! Sealed fields are never overwritten: enrichment must not turn a valid
//! edit into a sealed-field violation.

use bsff_core::CompanyDescriptor;
use bsff_state::{
    compute_sealed_fields, container_ancestors, Container, ContainerField, Document,
    DocumentField, RuleContext, StageSet, Transporter, TransporterField,
};

use crate::issue::LookupError;
use crate::registry::{CompanyRecord, Lookups};

#[derive(Debug, Clone, Copy)]
struct Writable {
    name: bool,
    address: bool,
}

fn join(prefix: &str, tail: &str) -> String {
    if prefix.is_empty() {
        tail.to_string()
    } else {
        format!("{prefix}.{tail}")
    }
}

fn overwrite_identity(
    company: &mut CompanyDescriptor,
    record: &CompanyRecord,
    writable: Writable,
    prefix: &str,
    updated: &mut Vec<String>,
) {
    if writable.name && record.name.is_some() && company.name != record.name {
        company.name.clone_from(&record.name);
        updated.push(join(prefix, "name"));
    }
    if writable.address && record.address.is_some() && company.address != record.address {
        company.address.clone_from(&record.address);
        updated.push(join(prefix, "address"));
    }
}

async fn enrich_company(
    company: &mut CompanyDescriptor,
    writable: Writable,
    prefix: &str,
    lookups: &mut Lookups<'_>,
    updated: &mut Vec<String>,
) -> Result<Option<CompanyRecord>, LookupError> {
    let Some(key) = company.registry_key().map(str::to_string) else {
        return Ok(None);
    };
    let record = lookups.get(&key).await?;
    if let Some(record) = &record {
        overwrite_identity(company, record, writable, prefix, updated);
    }
    Ok(record)
}

/// Enrich every company block of `document`. Returns the dotted paths of
/// the fields that changed.
pub(crate) async fn enrich_document(
    document: &mut Document,
    ancestors: StageSet,
    ctx: &RuleContext,
    lookups: &mut Lookups<'_>,
) -> Result<Vec<String>, LookupError> {
    let mut updated = Vec::new();
    let sealed = compute_sealed_fields(&*document, ancestors, ctx);
    let writable = |name, address| Writable {
        name: !sealed.contains(&name),
        address: !sealed.contains(&address),
    };

    let emitter = writable(DocumentField::EmitterCompanyName, DocumentField::EmitterCompanyAddress);
    let destination = writable(
        DocumentField::DestinationCompanyName,
        DocumentField::DestinationCompanyAddress,
    );
    enrich_company(&mut document.emitter.company, emitter, "emitter.company", lookups, &mut updated).await?;
    enrich_company(
        &mut document.destination.company,
        destination,
        "destination.company",
        lookups,
        &mut updated,
    )
    .await?;

    for (idx, transporter) in document.transporters.iter_mut().enumerate() {
        let prefix = format!("transporters.{idx}");
        updated.extend(enrich_transporter(transporter, &prefix, ancestors, ctx, lookups).await?);
    }
    for (idx, container) in document.containers.iter_mut().enumerate() {
        let prefix = format!("containers.{idx}");
        updated.extend(enrich_container(container, &prefix, ancestors, ctx, lookups).await?);
    }
    Ok(updated)
}

/// Enrich a transporter slot's company and, unless the carrier is exempt,
/// its receipt.
pub(crate) async fn enrich_transporter(
    transporter: &mut Transporter,
    prefix: &str,
    ancestors: StageSet,
    ctx: &RuleContext,
    lookups: &mut Lookups<'_>,
) -> Result<Vec<String>, LookupError> {
    let mut updated = Vec::new();
    let sealed = compute_sealed_fields(&*transporter, ancestors, ctx);
    let writable = Writable {
        name: !sealed.contains(&TransporterField::CompanyName),
        address: !sealed.contains(&TransporterField::CompanyAddress),
    };
    let company_prefix = join(prefix, "company");
    let record = enrich_company(
        &mut transporter.company,
        writable,
        &company_prefix,
        lookups,
        &mut updated,
    )
    .await?;

    let receipt = record.and_then(|r| r.transporter_receipt);
    let exempted = transporter.recepisse.is_exempted.unwrap_or(false);
    if let (Some(receipt), false) = (receipt, exempted) {
        let recepisse = &mut transporter.recepisse;
        if !sealed.contains(&TransporterField::RecepisseNumber)
            && recepisse.number.as_deref() != Some(receipt.number.as_str())
        {
            recepisse.number = Some(receipt.number);
            updated.push(join(prefix, "recepisse.number"));
        }
        if !sealed.contains(&TransporterField::RecepisseDepartment)
            && recepisse.department.as_deref() != Some(receipt.department.as_str())
        {
            recepisse.department = Some(receipt.department);
            updated.push(join(prefix, "recepisse.department"));
        }
        if !sealed.contains(&TransporterField::RecepisseValidityLimit)
            && recepisse.validity_limit != Some(receipt.validity_limit)
        {
            recepisse.validity_limit = Some(receipt.validity_limit);
            updated.push(join(prefix, "recepisse.validityLimit"));
        }
    }
    Ok(updated)
}

/// Enrich a container's next destination company.
pub(crate) async fn enrich_container(
    container: &mut Container,
    prefix: &str,
    document_ancestors: StageSet,
    ctx: &RuleContext,
    lookups: &mut Lookups<'_>,
) -> Result<Vec<String>, LookupError> {
    let mut updated = Vec::new();
    let own = container_ancestors(document_ancestors, container);
    let sealed = compute_sealed_fields(&*container, own, ctx);
    let writable = Writable {
        name: !sealed.contains(&ContainerField::NextDestinationCompanyName),
        address: !sealed.contains(&ContainerField::NextDestinationCompanyAddress),
    };
    let company_prefix = join(prefix, "operation.nextDestination.company");
    enrich_company(
        &mut container.operation.next_destination.company,
        writable,
        &company_prefix,
        lookups,
        &mut updated,
    )
    .await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InMemoryRegistry, TransporterReceipt};
    use bsff_core::{DocumentId, EngineConfig, Siret, Timestamp, TransporterId};
    use bsff_state::{Signature, DOCUMENT_STAGES};

    const EMITTER: &str = "11111111111111";
    const CARRIER: &str = "55555555555555";

    fn now() -> Timestamp {
        Timestamp::parse("2024-10-02T00:00:00Z").unwrap()
    }

    fn registry() -> InMemoryRegistry {
        let registry = InMemoryRegistry::new();
        registry.insert(
            EMITTER,
            CompanyRecord {
                name: Some("Clim Express".into()),
                address: Some("1 rue du Froid, Lyon".into()),
                registered: true,
                ..Default::default()
            },
        );
        registry.insert(
            CARRIER,
            CompanyRecord {
                name: Some("Trans Fluides".into()),
                registered: true,
                transporter_receipt: Some(TransporterReceipt {
                    number: "R-123".into(),
                    department: "69".into(),
                    validity_limit: Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
                }),
                ..Default::default()
            },
        );
        registry
    }

    fn document() -> Document {
        let mut d = Document::new_draft(
            DocumentId("FF-1".into()),
            Timestamp::parse("2024-10-01T00:00:00Z").unwrap(),
        );
        d.emitter.company.siret = Some(Siret(EMITTER.into()));
        d.emitter.company.name = Some("clim xpress".into());
        let mut t = Transporter::new(TransporterId("t1".into()), 1);
        t.company.siret = Some(Siret(CARRIER.into()));
        d.transporters.push(t);
        d
    }

    #[tokio::test]
    async fn test_unsealed_fields_are_overwritten() {
        let registry = registry();
        let mut lookups = Lookups::new(&registry);
        let ctx = RuleContext::system(now(), &EngineConfig::default());
        let mut d = document();
        let updated = enrich_document(&mut d, StageSet::empty(), &ctx, &mut lookups)
            .await
            .unwrap();

        assert_eq!(d.emitter.company.name.as_deref(), Some("Clim Express"));
        assert_eq!(d.transporters[0].recepisse.number.as_deref(), Some("R-123"));
        assert!(updated.contains(&"emitter.company.name".to_string()));
        assert!(updated.contains(&"emitter.company.address".to_string()));
        assert!(updated.contains(&"transporters.0.recepisse.department".to_string()));
    }

    #[tokio::test]
    async fn test_sealed_fields_are_kept() {
        let registry = registry();
        let mut lookups = Lookups::new(&registry);
        let ctx = RuleContext::system(now(), &EngineConfig::default());
        let mut d = document();
        d.is_draft = false;
        d.emitter.emission_signature = Some(Signature {
            author: "Jane".into(),
            date: now(),
        });
        let ancestors = DOCUMENT_STAGES.ancestor_stages(bsff_state::document_stage(&d));
        let updated = enrich_document(&mut d, ancestors, &ctx, &mut lookups)
            .await
            .unwrap();

        assert_eq!(d.emitter.company.name.as_deref(), Some("clim xpress"));
        assert!(!updated.iter().any(|p| p.starts_with("emitter.")));
    }

    #[tokio::test]
    async fn test_exempted_carrier_receipt_untouched() {
        let registry = registry();
        let mut lookups = Lookups::new(&registry);
        let ctx = RuleContext::system(now(), &EngineConfig::default());
        let mut t = Transporter::new(TransporterId("t1".into()), 1);
        t.company.siret = Some(Siret(CARRIER.into()));
        t.recepisse.is_exempted = Some(true);
        let updated = enrich_transporter(&mut t, "", StageSet::empty(), &ctx, &mut lookups)
            .await
            .unwrap();
        assert_eq!(updated, vec!["company.name".to_string()]);
        assert!(t.recepisse.number.is_none());
    }
}
