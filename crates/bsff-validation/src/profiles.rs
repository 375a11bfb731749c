//! # Company Profile Checks
//!
//! Every company named on a document must be known to the registry, and
//! hold the profile its role requires:
//!
//! | Role | Requirement |
//! |------|-------------|
//! | Emitter | registered |
//! | Destination | registered, waste-processor profile |
//! | Transporter (SIRET) | registered, transporter profile, unless exempt |
//! | Transporter (foreign VAT) | registered, transporter profile |
//! | Next destination | registered |
//!
//! Companies without an identifier are left to the required-field rules.
//! Issues always accumulate.

use bsff_core::CompanyDescriptor;
use bsff_state::{Container, Document, Transporter};

use crate::issue::{IssueKind, LookupError, ValidationIssue};
use crate::registry::{CompanyProfile, Lookups};

fn company_issue(path: String, message: String) -> ValidationIssue {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    ValidationIssue::new(IssueKind::Company, segments, message)
}

fn key_path(prefix: &str, company: &CompanyDescriptor) -> String {
    let field = if company.siret.is_some() { "siret" } else { "vatNumber" };
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

async fn check_company(
    company: &CompanyDescriptor,
    role: &str,
    profile: Option<(CompanyProfile, &str)>,
    prefix: &str,
    lookups: &mut Lookups<'_>,
) -> Result<Option<ValidationIssue>, LookupError> {
    let Some(key) = company.registry_key() else {
        return Ok(None);
    };
    let record = lookups.get(key).await?;
    let path = key_path(prefix, company);
    let issue = match record {
        Some(record) if record.registered => match profile {
            Some((profile, label)) if !record.has_profile(profile) => Some(company_issue(
                path,
                format!("The company {key} is not registered as {label}"),
            )),
            _ => None,
        },
        _ => Some(company_issue(
            path,
            format!("The {role} company {key} is not registered"),
        )),
    };
    Ok(issue)
}

/// Profile issues of every company block on `document`.
pub(crate) async fn check_document_companies(
    document: &Document,
    lookups: &mut Lookups<'_>,
) -> Result<Vec<ValidationIssue>, LookupError> {
    let mut issues = Vec::new();
    issues.extend(check_company(&document.emitter.company, "emitter", None, "emitter.company", lookups).await?);
    issues.extend(
        check_company(
            &document.destination.company,
            "destination",
            Some((CompanyProfile::WasteProcessor, "a waste processing facility")),
            "destination.company",
            lookups,
        )
        .await?,
    );
    for (idx, transporter) in document.transporters.iter().enumerate() {
        let prefix = format!("transporters.{idx}");
        issues.extend(check_transporter_company(transporter, &prefix, lookups).await?);
    }
    for (idx, container) in document.containers.iter().enumerate() {
        let prefix = format!("containers.{idx}");
        issues.extend(check_container_companies(container, &prefix, lookups).await?);
    }
    Ok(issues)
}

/// Profile issues of a transporter slot.
pub(crate) async fn check_transporter_company(
    transporter: &Transporter,
    prefix: &str,
    lookups: &mut Lookups<'_>,
) -> Result<Vec<ValidationIssue>, LookupError> {
    let company = &transporter.company;
    let exempted = transporter.recepisse.is_exempted.unwrap_or(false);
    if company.siret.is_some() && exempted {
        return Ok(Vec::new());
    }
    let company_prefix = if prefix.is_empty() {
        "company".to_string()
    } else {
        format!("{prefix}.company")
    };
    let issue = check_company(
        company,
        "transporter",
        Some((CompanyProfile::Transporter, "a transporter")),
        &company_prefix,
        lookups,
    )
    .await?;
    Ok(issue.into_iter().collect())
}

/// Profile issues of a container's next destination.
pub(crate) async fn check_container_companies(
    container: &Container,
    prefix: &str,
    lookups: &mut Lookups<'_>,
) -> Result<Vec<ValidationIssue>, LookupError> {
    let company_prefix = if prefix.is_empty() {
        "operation.nextDestination.company".to_string()
    } else {
        format!("{prefix}.operation.nextDestination.company")
    };
    let issue = check_company(
        &container.operation.next_destination.company,
        "next destination",
        None,
        &company_prefix,
        lookups,
    )
    .await?;
    Ok(issue.into_iter().collect())
}
