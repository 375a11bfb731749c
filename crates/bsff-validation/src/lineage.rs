//! # Lineage Validator
//!
//! Checks the antecedent containers a grouping, forwarding or repackaging
//! document references, then derives the new document's containers and the
//! successor pointers the caller must write.
//!
//! ## Algorithm
//!
//! Structural steps short-circuit: the first failing one ends the lineage
//! check (other checks of the same validation run still proceed).
//!
//! 1. A lineage kind must reference antecedents.
//! 2. Only the reference list matching the kind may be filled.
//! 3. The new emitter's SIRET anchors custody; it must be set. A
//!    repackaging document carries exactly one container.
//! 4. Every referenced id must resolve.
//! 5. Forwarded containers come from a single document.
//! 6. Grouped or forwarded containers share one waste code.
//! 7. Per container, accumulated: custody continuity, operation signed,
//!    operation allows this kind of successor, not already used elsewhere.
//!
//! ## Design
//!
//! Validation never writes to other documents. The [`LineagePlan`] lists
//! the `next_container_id` updates so the caller can apply them inside the
//! transaction that persists the new document, which keeps successor
//! exclusivity under concurrent writers.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use bsff_core::{ContainerId, DocumentId, DocumentKind};
use bsff_state::{Container, Document};

use crate::issue::{IssueKind, LookupError, ValidationIssue};
use crate::store::{AntecedentContainer, ContainerStore};

/// Outcome of resolving a document's lineage.
#[derive(Debug, Clone, PartialEq)]
pub enum LineageOutcome {
    /// The document references no antecedents and has no lineage kind.
    NotApplicable,
    /// Every antecedent resolved and passed the checks, in reference order.
    Resolved(Vec<AntecedentContainer>),
    /// The lineage is invalid.
    Rejected(Vec<ValidationIssue>),
}

/// One successor pointer to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerLink {
    /// Antecedent container.
    pub previous: ContainerId,
    /// Document carrying the antecedent.
    pub previous_document: DocumentId,
    /// Container of the new document it continues into.
    pub next: ContainerId,
}

/// Pointer updates resulting from a validated lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineagePlan {
    /// The new (or edited) document.
    pub document_id: DocumentId,
    /// Pointers to set.
    pub links: Vec<ContainerLink>,
    /// Antecedents no longer referenced by the edited document; their
    /// pointers must be cleared.
    pub released: Vec<ContainerId>,
}

impl LineagePlan {
    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.released.is_empty()
    }
}

fn param(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Forwarding => "forwarding",
        DocumentKind::Grouping => "grouping",
        DocumentKind::Repackaging => "repackaging",
        DocumentKind::Direct | DocumentKind::SmallQuantityCollection => "containers",
    }
}

fn lineage_issue(path: &str, message: impl Into<String>) -> ValidationIssue {
    if path.is_empty() {
        ValidationIssue::global(IssueKind::Lineage, message)
    } else {
        ValidationIssue::new(IssueKind::Lineage, [path], message)
    }
}

/// Whether lineage checks apply to `document`.
pub fn requires_lineage(document: &Document) -> bool {
    document.kind.is_some_and(|k| k.has_lineage())
        || document.reference_lists().iter().any(|(_, ids)| !ids.is_empty())
}

// ─── Steps 1-3 ───────────────────────────────────────────────────────

/// Structural lineage steps. On success, returns the lineage kind and the
/// referenced ids.
pub fn check_lineage_structure(
    document: &Document,
) -> Result<(DocumentKind, &[ContainerId]), ValidationIssue> {
    let filled: Vec<(DocumentKind, &[ContainerId])> = document
        .reference_lists()
        .into_iter()
        .filter(|(_, ids)| !ids.is_empty())
        .collect();

    if filled.is_empty() {
        let path = document.kind.map(param).unwrap_or_default();
        return Err(lineage_issue(
            path,
            "Antecedent containers must be supplied for grouping, repackaging or forwarding",
        ));
    }

    if let Some((kind, _)) = filled.iter().find(|(kind, _)| document.kind != Some(*kind)) {
        return Err(lineage_issue(
            param(*kind),
            format!(
                "The {} kind must be selected with the {} parameter",
                kind.as_str(),
                param(*kind)
            ),
        ));
    }

    let (kind, ids) = filled[0];

    let anchored = document
        .emitter
        .company
        .siret
        .as_ref()
        .is_some_and(|s| !s.as_str().trim().is_empty());
    if !anchored {
        return Err(ValidationIssue::new(
            IssueKind::Lineage,
            ["emitter", "company", "siret"],
            "The emitter SIRET of the new document must be set for grouping, repackaging or forwarding",
        ));
    }

    if kind == DocumentKind::Repackaging && document.containers.len() > 1 {
        return Err(lineage_issue(
            "containers",
            "Only one container can be supplied for a repackaging operation",
        ));
    }

    Ok((kind, ids))
}

// ─── Steps 4-7 ───────────────────────────────────────────────────────

/// Resolution and per-container steps over the containers `found` by the
/// store for `ids`.
pub fn check_antecedents(
    document: &Document,
    kind: DocumentKind,
    ids: &[ContainerId],
    found: Vec<AntecedentContainer>,
) -> Result<Vec<AntecedentContainer>, Vec<ValidationIssue>> {
    let path = param(kind);
    let verb = kind.lineage_verb();

    let missing: Vec<&str> = ids
        .iter()
        .filter(|id| !found.iter().any(|a| &a.container.id == *id))
        .map(ContainerId::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(vec![lineage_issue(
            path,
            format!(
                "The fluid container identifiers to {verb} {} do not exist",
                missing.join(", ")
            ),
        )]);
    }

    let mut seen = HashSet::new();
    let antecedents: Vec<AntecedentContainer> = ids
        .iter()
        .filter(|id| seen.insert(*id))
        .filter_map(|id| found.iter().find(|a| &a.container.id == id).cloned())
        .collect();

    if kind == DocumentKind::Forwarding {
        let sources: HashSet<&DocumentId> = antecedents.iter().map(|a| &a.document_id).collect();
        if sources.len() > 1 {
            return Err(vec![lineage_issue(
                path,
                "All forwarded containers must appear on the same initial document",
            )]);
        }
    }

    if kind.derives_containers() {
        let codes: BTreeSet<&str> = antecedents
            .iter()
            .filter_map(AntecedentContainer::waste_code)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        if codes.len() > 1 {
            let listed: Vec<&str> = codes.into_iter().collect();
            return Err(vec![lineage_issue(
                path,
                format!(
                    "You cannot {verb} containers with different waste codes: {}",
                    listed.join(", ")
                ),
            )]);
        }
    }

    let issues: Vec<ValidationIssue> = antecedents
        .iter()
        .flat_map(|a| container_issues(document, kind, a))
        .collect();
    if issues.is_empty() {
        Ok(antecedents)
    } else {
        Err(issues)
    }
}

fn container_issues(
    document: &Document,
    kind: DocumentKind,
    antecedent: &AntecedentContainer,
) -> Vec<ValidationIssue> {
    let path = param(kind);
    let id = &antecedent.container.id;
    let numero = antecedent.numero();
    let mut issues = Vec::new();

    let emitter = &document.emitter.company;
    if !antecedent.destination.same_company(emitter) {
        let siret = emitter.siret.as_ref().map(|s| s.as_str()).unwrap_or_default();
        issues.push(lineage_issue(
            path,
            format!(
                "Document {} carrying container {id} ({numero}) was not treated at the emitting facility {siret} of the new document",
                antecedent.document_id
            ),
        ));
    }

    let operation = &antecedent.container.operation;
    if !antecedent.container.is_operation_signed() {
        issues.push(lineage_issue(
            path,
            format!("The operation of container {id} - {numero} has not been signed yet"),
        ));
    } else if operation
        .code
        .is_some_and(|code| !code.allows_successor(kind) || operation.no_traceability())
    {
        issues.push(lineage_issue(
            path,
            format!(
                "A final treatment operation was declared on container n°{id} ({numero}). It cannot be added to a grouping, repackaging or forwarding document"
            ),
        ));
    }

    let used_elsewhere = antecedent.container.next_container_id.is_some()
        && antecedent.next_document_id.as_ref() != Some(&document.id);
    if used_elsewhere {
        issues.push(lineage_issue(
            path,
            format!(
                "Container n°{id} ({numero}) has already been forwarded, repackaged or grouped in another document."
            ),
        ));
    }

    issues
}

// ─── Resolution ──────────────────────────────────────────────────────

/// Run every lineage step, fetching the antecedents in one batched query.
pub async fn resolve_lineage(
    document: &Document,
    store: &dyn ContainerStore,
) -> Result<LineageOutcome, LookupError> {
    if !requires_lineage(document) {
        return Ok(LineageOutcome::NotApplicable);
    }
    let (kind, ids) = match check_lineage_structure(document) {
        Ok(checked) => checked,
        Err(issue) => return Ok(LineageOutcome::Rejected(vec![issue])),
    };

    let found = store.find_antecedents(ids).await?;
    tracing::debug!(
        document_id = %document.id,
        kind = kind.as_str(),
        requested = ids.len(),
        found = found.len(),
        "antecedent containers fetched"
    );

    Ok(match check_antecedents(document, kind, ids, found) {
        Ok(antecedents) => LineageOutcome::Resolved(antecedents),
        Err(issues) => {
            tracing::debug!(document_id = %document.id, issues = issues.len(), "lineage rejected");
            LineageOutcome::Rejected(issues)
        }
    })
}

// ─── Derivation ──────────────────────────────────────────────────────

/// Derive the document's containers from its resolved antecedents.
///
/// Grouping and forwarding get one container per antecedent, copying its
/// descriptor; a container already pointing at that single antecedent is
/// kept so its own acceptance and operation data survive. Repackaging
/// stamps every antecedent onto the caller-supplied container.
pub fn populate_containers(document: &mut Document, antecedents: &[AntecedentContainer]) {
    let Some(kind) = document.kind else {
        return;
    };
    if kind.derives_containers() {
        let mut existing = std::mem::take(&mut document.containers);
        document.containers = antecedents
            .iter()
            .map(|antecedent| {
                let previous = &antecedent.container;
                let reuse = existing
                    .iter()
                    .position(|c| matches!(c.previous_containers.as_slice(), [only] if only == &previous.id));
                let mut container = match reuse {
                    Some(pos) => existing.swap_remove(pos),
                    None => Container::new(ContainerId::new()),
                };
                container.document_id = Some(document.id.clone());
                container.packaging_type = previous.packaging_type;
                container.other = previous.other.clone();
                container.volume = previous.volume;
                container.numero = previous.numero.clone();
                container.emission_numero = previous.emission_numero.clone();
                container.weight = previous.acceptation.weight.or(previous.weight);
                container.previous_containers = vec![previous.id.clone()];
                container
            })
            .collect();
    } else if kind == DocumentKind::Repackaging {
        let ids: Vec<ContainerId> = antecedents.iter().map(|a| a.container.id.clone()).collect();
        if let Some(container) = document.containers.first_mut() {
            container.document_id = Some(document.id.clone());
            container.previous_containers = ids;
        }
    }
}

/// Pointer updates for a populated `document`. Antecedents referenced by
/// `persisted` but no longer by `document` are released.
pub fn plan_lineage(
    document: &Document,
    antecedents: &[AntecedentContainer],
    persisted: Option<&Document>,
) -> LineagePlan {
    let links = document
        .containers
        .iter()
        .flat_map(|next| {
            next.previous_containers.iter().filter_map(move |previous| {
                antecedents
                    .iter()
                    .find(|a| &a.container.id == previous)
                    .map(|a| ContainerLink {
                        previous: previous.clone(),
                        previous_document: a.document_id.clone(),
                        next: next.id.clone(),
                    })
            })
        })
        .collect();

    let kept: HashSet<ContainerId> = document.antecedent_ids().into_iter().collect();
    let released = persisted
        .map(|p| {
            p.antecedent_ids()
                .into_iter()
                .filter(|id| !kept.contains(id))
                .collect()
        })
        .unwrap_or_default();

    LineagePlan {
        document_id: document.id.clone(),
        links,
        released,
    }
}
