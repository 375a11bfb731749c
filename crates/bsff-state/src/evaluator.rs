//! # Rule Evaluator
//!
//! Evaluates the field rule tables against an entity snapshot and the
//! ancestor stages of an evaluation target.
//!
//! ## Operations
//!
//! - [`compute_required_errors`]: one error per required field without a
//!   value, in field declaration order.
//! - [`compute_sealed_fields`]: the fields no longer editable.
//! - [`diff_and_check_sealed`]: fields that differ between a persisted and
//!   a proposed snapshot, and which of them are sealed.
//! - [`diff_document`]: the document diff, extended to transporter slots
//!   and containers, including the slot identity rule.
//! - [`required_and_sealed_field_paths`]: client-facing introspection.
//!
//! ## Design
//!
//! `when` predicates and dynamic stage sources are evaluated on the entity
//! handed in. Pipelines pass the merged snapshot (persisted ⊕ proposed), so
//! cross-field conditions see the final state. Ancestor sets are supplied
//! by the caller: the persisted stage for sealed checks, the target stage
//! for required checks.

use std::collections::HashSet;

use serde::Serialize;

use bsff_core::ContainerId;

use crate::container::Container;
use crate::document::Document;
use crate::rules::{
    ContainerField, DocumentField, RuleContext, RuleField, RuledEntity, TransporterField,
};
use crate::stage::{container_ancestors, StageSet};
use crate::transporter::Transporter;

// ─── Errors ──────────────────────────────────────────────────────────

/// A rule failure on one field of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError<F> {
    /// Offending field.
    pub field: F,
    /// Path of the field relative to its entity.
    pub path: Vec<String>,
    /// Human-readable message.
    pub message: String,
}

/// A rule failure located by a document-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathError {
    /// Path from the document root, e.g. `["transporters", "0", "company", "name"]`.
    pub path: Vec<String>,
    /// Human-readable message.
    pub message: String,
}

impl PathError {
    /// Dotted representation of the path.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

impl<F> FieldError<F> {
    /// Convert into a [`PathError`] rooted under `prefix`.
    pub fn under(self, prefix: &[String]) -> PathError {
        let mut path = prefix.to_vec();
        path.extend(self.path);
        PathError {
            path,
            message: self.message,
        }
    }
}

fn field_path<F: RuleField>(field: F) -> Vec<String> {
    field.path().iter().map(|s| s.to_string()).collect()
}

fn with_suffix(base: String, suffix: Option<&str>) -> String {
    match suffix {
        Some(message) => format!("{base} {message}"),
        None => base,
    }
}

// ─── Single-entity evaluation ────────────────────────────────────────

/// One error per field whose required rule applies and whose value is
/// absent, in declaration order.
pub fn compute_required_errors<T: RuledEntity>(
    entity: &T,
    ancestors: StageSet,
    ctx: &RuleContext,
) -> Vec<FieldError<T::Field>> {
    T::Field::ALL
        .iter()
        .filter_map(|&field| {
            let rule = T::rule(field);
            let required = rule.required?;
            if !required.applies(entity, ancestors, ctx) || entity.value(field).is_present() {
                return None;
            }
            let base = format!("{} is a required field.", entity.describe(rule.label));
            Some(FieldError {
                field,
                path: field_path(field),
                message: with_suffix(base, required.message),
            })
        })
        .collect()
}

/// Fields whose sealed rule applies, in declaration order.
pub fn compute_sealed_fields<T: RuledEntity>(
    entity: &T,
    ancestors: StageSet,
    ctx: &RuleContext,
) -> Vec<T::Field> {
    T::Field::ALL
        .iter()
        .copied()
        .filter(|&field| T::rule(field).sealed.applies(entity, ancestors, ctx))
        .collect()
}

/// Fields whose required rule applies, whether or not they hold a value.
pub fn compute_required_fields<T: RuledEntity>(
    entity: &T,
    ancestors: StageSet,
    ctx: &RuleContext,
) -> Vec<T::Field> {
    T::Field::ALL
        .iter()
        .copied()
        .filter(|&field| {
            T::rule(field)
                .required
                .is_some_and(|rule| rule.applies(entity, ancestors, ctx))
        })
        .collect()
}

/// Fields whose values differ between two snapshots.
pub fn changed_fields<T: RuledEntity>(persisted: &T, proposed: &T) -> Vec<T::Field> {
    T::Field::ALL
        .iter()
        .copied()
        .filter(|&field| !persisted.value(field).same_as(&proposed.value(field)))
        .collect()
}

/// Outcome of comparing a persisted and a proposed snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedDiff<F> {
    /// Every modified field.
    pub changed: Vec<F>,
    /// Modified fields that were sealed, one error each.
    pub violations: Vec<FieldError<F>>,
}

/// Changed fields, and the subset that modifies a sealed field.
///
/// `proposed` is the merged snapshot: keys absent from the caller's input
/// carry their persisted value and never count as changed. A field is
/// sealed when its rule applies to either snapshot, so a proposal cannot
/// unseal a field by rewriting the state its lock depends on.
pub fn diff_and_check_sealed<T: RuledEntity>(
    persisted: &T,
    proposed: &T,
    ancestors: StageSet,
    ctx: &RuleContext,
) -> SealedDiff<T::Field> {
    let changed = changed_fields(persisted, proposed);
    let mut seen = HashSet::new();
    let violations = changed
        .iter()
        .copied()
        .filter_map(|field| {
            let rule = T::rule(field);
            let sealed = rule.sealed.applies(persisted, ancestors, ctx)
                || rule.sealed.applies(proposed, ancestors, ctx);
            if !sealed || !seen.insert(field) {
                return None;
            }
            let base = format!(
                "{} has been sealed by a signature and can no longer be modified.",
                proposed.describe(rule.label)
            );
            Some(FieldError {
                field,
                path: field_path(field),
                message: with_suffix(base, rule.sealed.message),
            })
        })
        .collect();
    SealedDiff {
        changed,
        violations,
    }
}

// ─── Document-wide evaluation ────────────────────────────────────────

fn index_prefix(list: &str, idx: usize) -> Vec<String> {
    vec![list.to_string(), idx.to_string()]
}

/// Required errors of a document, its transporter slots and containers.
pub fn document_required_errors(
    document: &Document,
    ancestors: StageSet,
    ctx: &RuleContext,
) -> Vec<PathError> {
    let mut errors: Vec<PathError> = compute_required_errors(document, ancestors, ctx)
        .into_iter()
        .map(|e| e.under(&[]))
        .collect();
    for (idx, transporter) in document.transporters.iter().enumerate() {
        let prefix = index_prefix("transporters", idx);
        errors.extend(
            compute_required_errors(transporter, ancestors, ctx)
                .into_iter()
                .map(|e| e.under(&prefix)),
        );
    }
    for (idx, container) in document.containers.iter().enumerate() {
        let prefix = index_prefix("containers", idx);
        let own = container_ancestors(ancestors, container);
        errors.extend(
            compute_required_errors(container, own, ctx)
                .into_iter()
                .map(|e| e.under(&prefix)),
        );
    }
    errors
}

/// Outcome of comparing a persisted and a proposed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentDiff {
    /// Modified document-level fields.
    pub changed: Vec<DocumentField>,
    /// Modified fields per kept transporter slot number.
    pub changed_transporters: Vec<(u8, Vec<TransporterField>)>,
    /// Modified fields per kept container.
    pub changed_containers: Vec<(ContainerId, Vec<ContainerField>)>,
    /// Sealed violations anywhere in the document.
    pub violations: Vec<PathError>,
}

impl DocumentDiff {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
            && self.changed_transporters.is_empty()
            && self.changed_containers.is_empty()
    }

    /// Dotted paths of every changed field.
    pub fn changed_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.changed.iter().map(|f| f.path().join(".")).collect();
        for (number, fields) in &self.changed_transporters {
            paths.extend(
                fields
                    .iter()
                    .map(|f| format!("transporters.{number}.{}", f.path().join("."))),
            );
        }
        for (id, fields) in &self.changed_containers {
            paths.extend(
                fields
                    .iter()
                    .map(|f| format!("containers.{id}.{}", f.path().join("."))),
            );
        }
        paths
    }
}

/// Message raised when a signed transporter slot is replaced or removed.
pub fn signed_slot_message(number: u8) -> String {
    format!("Transporter n°{number} has already signed the document, it cannot be removed or modified")
}

/// Compare a persisted and a proposed (merged) document.
///
/// Besides field-level sealing, the identity of a signed transporter slot
/// is itself sealed: the transporter occupying slot `k` after its
/// `TRANSPORT(k)` signature can be neither replaced nor removed.
pub fn diff_document(
    persisted: &Document,
    proposed: &Document,
    ancestors: StageSet,
    ctx: &RuleContext,
) -> DocumentDiff {
    let doc = diff_and_check_sealed(persisted, proposed, ancestors, ctx);
    let mut diff = DocumentDiff {
        changed: doc.changed,
        violations: doc.violations.into_iter().map(|e| e.under(&[])).collect(),
        ..DocumentDiff::default()
    };

    for old in persisted.sorted_transporters() {
        let replacement = proposed.transporter(old.number);
        if old.is_signed() && replacement.map_or(true, |t| t.id != old.id) {
            diff.violations.push(PathError {
                path: index_prefix("transporters", usize::from(old.number.saturating_sub(1))),
                message: signed_slot_message(old.number),
            });
        }
    }

    for (idx, new) in proposed.transporters.iter().enumerate() {
        let Some(old) = persisted.transporters.iter().find(|t| t.id == new.id) else {
            continue;
        };
        let slot = diff_transporter(old, new, ancestors, ctx);
        if slot.changed.is_empty() {
            continue;
        }
        let prefix = index_prefix("transporters", idx);
        diff.violations
            .extend(slot.violations.into_iter().map(|e| e.under(&prefix)));
        diff.changed_transporters.push((new.number, slot.changed));
    }

    for (idx, new) in proposed.containers.iter().enumerate() {
        let Some(old) = persisted.container(&new.id) else {
            continue;
        };
        let own = container_ancestors(ancestors, old);
        let container = diff_and_check_sealed(old, new, own, ctx);
        if container.changed.is_empty() {
            continue;
        }
        let prefix = index_prefix("containers", idx);
        diff.violations
            .extend(container.violations.into_iter().map(|e| e.under(&prefix)));
        diff.changed_containers.push((new.id.clone(), container.changed));
    }

    diff
}

/// Diff of one transporter slot against the document's ancestor stages.
pub fn diff_transporter(
    persisted: &Transporter,
    proposed: &Transporter,
    ancestors: StageSet,
    ctx: &RuleContext,
) -> SealedDiff<TransporterField> {
    diff_and_check_sealed(persisted, proposed, ancestors, ctx)
}

/// Diff of one container, evaluated against its own stage as well.
pub fn diff_container(
    persisted: &Container,
    proposed: &Container,
    document_ancestors: StageSet,
    ctx: &RuleContext,
) -> SealedDiff<ContainerField> {
    let own = container_ancestors(document_ancestors, persisted);
    diff_and_check_sealed(persisted, proposed, own, ctx)
}

// ─── Introspection ───────────────────────────────────────────────────

/// Dotted field paths, for clients deciding what to display or lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldPaths {
    /// Fields that must hold a value at the target stage.
    pub required: Vec<String>,
    /// Fields that can no longer be modified.
    pub sealed: Vec<String>,
}

fn dotted<F: RuleField>(prefix: &str, field: F) -> String {
    let path = field.path().join(".");
    if prefix.is_empty() {
        path
    } else {
        format!("{prefix}.{path}")
    }
}

/// Required and sealed field paths of a document, its transporter slots
/// and containers.
pub fn required_and_sealed_field_paths(
    document: &Document,
    ancestors: StageSet,
    ctx: &RuleContext,
) -> FieldPaths {
    let mut paths = FieldPaths::default();
    collect_paths(&mut paths, "", document, ancestors, ctx);
    for (idx, transporter) in document.transporters.iter().enumerate() {
        let prefix = format!("transporters.{idx}");
        collect_paths(&mut paths, &prefix, transporter, ancestors, ctx);
    }
    for (idx, container) in document.containers.iter().enumerate() {
        let prefix = format!("containers.{idx}");
        let own = container_ancestors(ancestors, container);
        collect_paths(&mut paths, &prefix, container, own, ctx);
    }
    paths
}

fn collect_paths<T: RuledEntity>(
    paths: &mut FieldPaths,
    prefix: &str,
    entity: &T,
    ancestors: StageSet,
    ctx: &RuleContext,
) {
    paths.required.extend(
        compute_required_fields(entity, ancestors, ctx)
            .into_iter()
            .map(|f| dotted(prefix, f)),
    );
    paths.sealed.extend(
        compute_sealed_fields(entity, ancestors, ctx)
            .into_iter()
            .map(|f| dotted(prefix, f)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Signature;
    use crate::rules::UserRoles;
    use crate::stage::{Stage, DOCUMENT_STAGES};
    use bsff_core::{
        AcceptationStatus, DocumentId, DocumentKind, OperationCode, PackagingType, Siret,
        Timestamp, TransportMode, TransporterId,
    };

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn ctx() -> RuleContext {
        RuleContext {
            roles: UserRoles::default(),
            now: ts("2024-10-02T00:00:00Z"),
            correction_window_days: 60,
        }
    }

    fn sig() -> Option<Signature> {
        Some(Signature {
            author: "Jane".into(),
            date: ts("2024-10-01T00:00:00Z"),
        })
    }

    fn complete_document() -> Document {
        let mut d = Document::new_draft(DocumentId("FF-1".into()), ts("2024-10-01T00:00:00Z"));
        d.is_draft = false;
        d.kind = Some(DocumentKind::Direct);
        let emitter = &mut d.emitter.company;
        emitter.name = Some("Emitter".into());
        emitter.siret = Some(Siret("11111111111111".into()));
        emitter.address = Some("1 rue A".into());
        emitter.contact = Some("Alice".into());
        emitter.phone = Some("0101".into());
        emitter.mail = Some("a@a.fr".into());
        d.waste.code = Some("14 06 01*".into());
        d.waste.description = Some("R410A".into());
        d.waste.adr = Some("UN 1078".into());
        d.weight.value = Some(10.0);
        d.weight.is_estimate = Some(false);
        let dest = &mut d.destination.company;
        dest.name = Some("Destination".into());
        dest.siret = Some(Siret("22222222222222".into()));
        dest.address = Some("2 rue B".into());
        dest.contact = Some("Bob".into());
        dest.phone = Some("0202".into());
        dest.mail = Some("b@b.fr".into());
        d.destination.planned_operation_code = Some(OperationCode::R2);
        let mut container = Container::new(ContainerId("c1".into()));
        container.packaging_type = Some(PackagingType::Bottle);
        container.weight = Some(10.0);
        container.emission_numero = Some("N1".into());
        container.numero = Some("N1".into());
        d.containers.push(container);
        d
    }

    fn at(stage: Stage) -> StageSet {
        DOCUMENT_STAGES.ancestor_stages(Some(stage))
    }

    // ── Required errors ──────────────────────────────────────────────

    #[test]
    fn test_complete_document_has_no_emission_errors() {
        let errors = compute_required_errors(&complete_document(), at(Stage::Emission), &ctx());
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_single_missing_field_yields_single_error() {
        let mut d = complete_document();
        d.waste.description = None;
        let errors = compute_required_errors(&d, at(Stage::Emission), &ctx());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, DocumentField::WasteDescription);
        assert!(errors[0].message.ends_with("is a required field."));
        assert!(compute_required_errors(&d, StageSet::empty(), &ctx()).is_empty());
    }

    #[test]
    fn test_blank_text_counts_as_missing() {
        let mut d = complete_document();
        d.emitter.company.name = Some("  ".into());
        let errors = compute_required_errors(&d, at(Stage::Emission), &ctx());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, DocumentField::EmitterCompanyName);
    }

    // ── Containers ───────────────────────────────────────────────────

    #[test]
    fn test_container_acceptance_editable_within_window() {
        let mut persisted = complete_document();
        let c = &mut persisted.containers[0];
        c.acceptation.status = Some(AcceptationStatus::Accepted);
        c.acceptation.weight = Some(9.0);
        c.acceptation.signature = sig();
        let mut proposed = persisted.clone();
        proposed.containers[0].acceptation.weight = Some(8.0);
        let diff = diff_document(&persisted, &proposed, at(Stage::Acceptation), &ctx());
        assert_eq!(diff.changed_containers.len(), 1);
        assert!(diff.violations.is_empty());

        persisted.containers[0].next_container_id = Some(ContainerId("c2".into()));
        proposed.containers[0].next_container_id = Some(ContainerId("c2".into()));
        let diff = diff_document(&persisted, &proposed, at(Stage::Acceptation), &ctx());
        assert_eq!(diff.violations.len(), 1);
        assert_eq!(diff.violations[0].dotted_path(), "containers.0.acceptation.weight");
    }

    #[test]
    fn test_clearing_successor_link_does_not_unseal_acceptance() {
        let mut persisted = complete_document();
        let c = &mut persisted.containers[0];
        c.next_container_id = Some(ContainerId("succ".into()));
        c.acceptation.status = Some(AcceptationStatus::Accepted);
        c.acceptation.weight = Some(9.0);
        c.acceptation.signature = sig();
        let mut proposed = persisted.clone();
        proposed.containers[0].next_container_id = None;
        proposed.containers[0].acceptation.weight = Some(1.0);
        let diff = diff_document(&persisted, &proposed, at(Stage::Acceptation), &ctx());
        let paths: Vec<String> = diff.violations.iter().map(PathError::dotted_path).collect();
        assert_eq!(paths, vec!["containers.0.acceptation.weight".to_string()]);
    }

    #[test]
    fn test_sealed_when_only_proposed_snapshot_is_locked() {
        let mut persisted = complete_document();
        let c = &mut persisted.containers[0];
        c.acceptation.status = Some(AcceptationStatus::Accepted);
        c.acceptation.weight = Some(9.0);
        c.acceptation.signature = sig();
        let mut proposed = persisted.clone();
        proposed.containers[0].next_container_id = Some(ContainerId("succ".into()));
        proposed.containers[0].acceptation.weight = Some(1.0);
        let diff = diff_container(
            &persisted.containers[0],
            &proposed.containers[0],
            at(Stage::Acceptation),
            &ctx(),
        );
        assert_eq!(diff.violations.len(), 1);
        assert_eq!(diff.violations[0].field, ContainerField::AcceptationWeight);
    }

    // ── Introspection ────────────────────────────────────────────────

    #[test]
    fn test_field_paths_cover_containers() {
        let d = complete_document();
        let paths = required_and_sealed_field_paths(&d, at(Stage::Emission), &ctx());
        assert!(paths.required.contains(&"containers.0.numero".to_string()));
        assert!(paths.sealed.contains(&"waste.code".to_string()));
        assert!(!paths.sealed.contains(&"destination.receptionDate".to_string()));
    }
}
