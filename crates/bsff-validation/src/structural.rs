//! # Structural Checks
//!
//! Shape and range checks that must pass before any rule is evaluated:
//! slot counts, slot numbering, plate counts, duplicate containers,
//! negative quantities, and the acceptance statuses a single container
//! cannot carry. Any failure here halts the pipeline.

use std::collections::HashSet;

use bsff_core::{AcceptationStatus, EngineConfig};
use bsff_state::{Container, Document, Transporter};

use crate::issue::{IssueKind, ValidationIssue};

fn issue(path: Vec<String>, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue::new(IssueKind::Structural, path, message)
}

fn at(prefix: &[String], tail: &[&str]) -> Vec<String> {
    prefix
        .iter()
        .cloned()
        .chain(tail.iter().map(|s| s.to_string()))
        .collect()
}

fn negative(value: Option<f64>) -> bool {
    value.is_some_and(|v| v.is_nan() || v < 0.0)
}

/// Structural issues of a document, its transporter slots and containers.
pub fn check_document_structure(document: &Document, config: &EngineConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if document.transporters.len() > config.max_transporters {
        issues.push(issue(
            vec!["transporters".into()],
            format!(
                "A document cannot have more than {} transporters",
                config.max_transporters
            ),
        ));
    }

    let mut slots = HashSet::new();
    for (idx, transporter) in document.transporters.iter().enumerate() {
        let prefix = vec!["transporters".to_string(), idx.to_string()];
        if !slots.insert(transporter.number) {
            issues.push(issue(
                at(&prefix, &["number"]),
                format!("Transporter slot {} is assigned more than once", transporter.number),
            ));
        }
        issues.extend(slot_issues(transporter, config, &prefix));
    }

    if negative(document.weight.value) {
        issues.push(issue(
            vec!["weight".into(), "value".into()],
            "The weight must not be negative",
        ));
    }

    let mut ids = HashSet::new();
    for (idx, container) in document.containers.iter().enumerate() {
        let prefix = vec!["containers".to_string(), idx.to_string()];
        if !ids.insert(&container.id) {
            issues.push(issue(
                at(&prefix, &["id"]),
                format!("Container {} appears more than once", container.id),
            ));
        }
        issues.extend(container_issues(container, &prefix));
    }

    issues
}

/// Structural issues of a standalone transporter slot.
pub fn check_transporter_structure(
    transporter: &Transporter,
    config: &EngineConfig,
) -> Vec<ValidationIssue> {
    slot_issues(transporter, config, &[])
}

/// Structural issues of a standalone container.
pub fn check_container_structure(container: &Container) -> Vec<ValidationIssue> {
    container_issues(container, &[])
}

fn slot_issues(transporter: &Transporter, config: &EngineConfig, prefix: &[String]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let number = usize::from(transporter.number);
    if number == 0 || number > config.max_transporters {
        issues.push(issue(
            at(prefix, &["number"]),
            format!(
                "Transporter number {} is out of range (1 to {})",
                transporter.number, config.max_transporters
            ),
        ));
    }
    if transporter.transport.plates.len() > config.max_plates {
        issues.push(issue(
            at(prefix, &["transport", "plates"]),
            format!(
                "A transporter cannot declare more than {} plates",
                config.max_plates
            ),
        ));
    }
    issues
}

fn container_issues(container: &Container, prefix: &[String]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if container.acceptation.status == Some(AcceptationStatus::PartiallyRefused) {
        issues.push(issue(
            at(prefix, &["acceptation", "status"]),
            "Partial refusal is not allowed on a container: accept or refuse it",
        ));
    }
    let quantities = [
        (container.volume, &["volume"][..], "The container volume"),
        (container.weight, &["weight"][..], "The container weight"),
        (
            container.acceptation.weight,
            &["acceptation", "weight"][..],
            "The acceptance weight",
        ),
    ];
    for (value, path, label) in quantities {
        if negative(value) {
            issues.push(issue(at(prefix, path), format!("{label} must not be negative")));
        }
    }
    issues
}
