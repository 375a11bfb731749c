//! # Cross-Field Refinements
//!
//! Consistency rules spanning several fields that the field rule tables
//! cannot express: waste codes against the fluid catalogue, weights
//! against transport mode and creation-date cut-overs, acceptance figures
//! against the acceptance status, treatment modes against the operation
//! code, next destinations against operation finality.
//!
//! Every refinement runs on every validation and all issues accumulate.

use bsff_core::{is_fluid_waste_code, AcceptationStatus, DocumentKind, EngineConfig, PackagingType};
use bsff_state::{Container, Document};

use crate::issue::{IssueKind, ValidationIssue};

const KG_PER_TONNE: f64 = 1000.0;

fn issue<const N: usize>(prefix: &[String], tail: [&str; N], message: impl Into<String>) -> ValidationIssue {
    let path: Vec<String> = prefix
        .iter()
        .cloned()
        .chain(tail.iter().map(|s| s.to_string()))
        .collect();
    ValidationIssue::new(IssueKind::Refinement, path, message)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ─── Document ────────────────────────────────────────────────────────

/// Refinement issues of a document and all its containers.
pub fn check_document_refinements(document: &Document, config: &EngineConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let Some(code) = non_blank(document.waste.code.as_deref()) {
        if !is_fluid_waste_code(code) {
            issues.push(issue(
                &[],
                ["waste", "code"],
                format!("The waste code {code} is not a fluid waste code"),
            ));
        }
    }

    if let Some(weight) = document.weight.value {
        if config.requires_positive_weights(&document.created_at) && weight <= 0.0 {
            issues.push(issue(&[], ["weight", "value"], "The weight must be greater than 0"));
        }
        let by_road = document.transporters.iter().any(|t| t.is_road());
        if by_road && weight > config.max_road_weight_tonnes * KG_PER_TONNE {
            issues.push(issue(
                &[],
                ["weight", "value"],
                format!(
                    "The weight must be below {} tonnes when transported by road",
                    config.max_road_weight_tonnes
                ),
            ));
        }
    }

    if !document.intervention_sheets.is_empty()
        && !document.is_kind(DocumentKind::SmallQuantityCollection)
    {
        issues.push(issue(
            &[],
            ["interventionSheets"],
            "Intervention sheets can only be attached to a small quantity collection document",
        ));
    }

    for (idx, container) in document.containers.iter().enumerate() {
        let prefix = vec!["containers".to_string(), idx.to_string()];
        issues.extend(container_issues(container, document, config, &prefix));
    }

    issues
}

/// Refinement issues of one container of `document`.
pub fn check_container_refinements(
    container: &Container,
    document: &Document,
    config: &EngineConfig,
) -> Vec<ValidationIssue> {
    container_issues(container, document, config, &[])
}

// ─── Container ───────────────────────────────────────────────────────

fn container_issues(
    container: &Container,
    document: &Document,
    config: &EngineConfig,
    prefix: &[String],
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    descriptor_issues(container, document, config, prefix, &mut issues);
    acceptation_issues(container, prefix, &mut issues);
    operation_issues(container, prefix, &mut issues);
    issues
}

fn descriptor_issues(
    container: &Container,
    document: &Document,
    config: &EngineConfig,
    prefix: &[String],
    issues: &mut Vec<ValidationIssue>,
) {
    let is_other = container.packaging_type == Some(PackagingType::Other);
    if !is_other && non_blank(container.other.as_deref()).is_some() {
        issues.push(issue(
            prefix,
            ["other"],
            "A packaging description can only be given for the OTHER type",
        ));
    }

    if config.requires_positive_weights(&document.created_at) {
        if container.weight.is_some_and(|w| w <= 0.0) {
            issues.push(issue(prefix, ["weight"], "The container weight must be greater than 0"));
        }
        if container.volume.is_some_and(|v| v <= 0.0) {
            issues.push(issue(prefix, ["volume"], "The container volume must be greater than 0"));
        }
    }

    let derived = document.kind.is_some_and(|k| k.derives_containers());
    if config.requires_container_volume(&document.created_at)
        && !document.is_draft
        && !derived
        && container.volume.is_none()
    {
        issues.push(issue(prefix, ["volume"], "The container volume is required"));
    }
}

fn acceptation_issues(container: &Container, prefix: &[String], issues: &mut Vec<ValidationIssue>) {
    let acceptation = &container.acceptation;
    match acceptation.status {
        Some(AcceptationStatus::Refused) => {
            if acceptation.weight.is_some_and(|w| w != 0.0) {
                issues.push(issue(
                    prefix,
                    ["acceptation", "weight"],
                    "Acceptance weight must be 0 when refused",
                ));
            }
        }
        Some(AcceptationStatus::Accepted) => {
            if acceptation.weight.is_some_and(|w| w <= 0.0) {
                issues.push(issue(
                    prefix,
                    ["acceptation", "weight"],
                    "Acceptance weight must be greater than 0 when accepted",
                ));
            }
            if non_blank(acceptation.refusal_reason.as_deref()).is_some() {
                issues.push(issue(
                    prefix,
                    ["acceptation", "refusalReason"],
                    "A refusal reason cannot be given for an accepted container",
                ));
            }
        }
        Some(AcceptationStatus::PartiallyRefused) | None => {}
    }

    if let Some(code) = non_blank(acceptation.waste_code.as_deref()) {
        if !is_fluid_waste_code(code) {
            issues.push(issue(
                prefix,
                ["acceptation", "wasteCode"],
                format!("The acceptance waste code {code} is not a fluid waste code"),
            ));
        }
    }
}

fn operation_issues(container: &Container, prefix: &[String], issues: &mut Vec<ValidationIssue>) {
    let operation = &container.operation;
    let Some(code) = operation.code else {
        return;
    };

    if let Some(mode) = operation.mode {
        if !code.modes().contains(&mode) {
            issues.push(issue(
                prefix,
                ["operation", "mode"],
                "The treatment mode is not compatible with the operation code",
            ));
        }
    }

    if !code.successors().is_empty() {
        return;
    }
    let next = &operation.next_destination;
    let declares_next = next.company.registry_key().is_some()
        || non_blank(next.company.name.as_deref()).is_some()
        || next.planned_operation_code.is_some();
    if declares_next {
        issues.push(issue(
            prefix,
            ["operation", "nextDestination"],
            "The declared operation does not allow a subsequent destination",
        ));
    }
    if operation.no_traceability() {
        issues.push(issue(
            prefix,
            ["operation", "noTraceability"],
            "You cannot declare a traceability break with a final operation code",
        ));
    }
}
