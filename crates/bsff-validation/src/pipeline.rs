//! # Validation Pipelines
//!
//! Orchestrates the checks of this crate and the rule evaluator of
//! `bsff-state` into one pass per entity, producing either the validated
//! (possibly transformed) entity or the flat list of every issue found.
//!
//! ## Order
//!
//! | Step | Sync | Async |
//! |------|------|-------|
//! | Structural checks (halt on failure) | ✓ | ✓ |
//! | Company enrichment | | ✓ |
//! | Lineage resolution, container derivation | | ✓ |
//! | Intervention sheets | | ✓ |
//! | Required fields at the target stage | ✓ | ✓ |
//! | Sealed fields against the persisted snapshot | ✓ | ✓ |
//! | Refinements | ✓ | ✓ |
//! | Company profiles | | ✓ |
//!
//! The synchronous variants never perform I/O and suit draft saving; the
//! asynchronous ones back signatures. A collaborator failure aborts the
//! run with [`PipelineError::Lookup`]; nothing is retried here.
//!
//! ## Stages
//!
//! Required checks use the ancestors of the target stage (by default the
//! stage the proposed document reached). Sealed checks use the ancestors
//! of the stage the persisted document reached: a signature carried by the
//! edit itself does not seal the fields it is signing.

use std::sync::Arc;

use serde::Serialize;

use bsff_core::{ContainerId, EngineConfig, InterventionSheetId, Timestamp, TransporterId};
use bsff_state::{
    compute_required_errors, diff_container, diff_document, diff_transporter,
    document_required_errors, document_stage, container_ancestors, Container, Document,
    RuleContext, RuleField, Stage, StageSet, Transporter, UserRoles, DOCUMENT_STAGES,
};

use crate::issue::{IssueKind, Issues, PipelineError, ValidationErrors, ValidationIssue};
use crate::lineage::{
    plan_lineage, populate_containers, resolve_lineage, LineageOutcome, LineagePlan,
};
use crate::profiles::{check_container_companies, check_document_companies, check_transporter_company};
use crate::refinement::{check_container_refinements, check_document_refinements};
use crate::registry::{CompanyRegistry, Lookups};
use crate::sirenify::{enrich_container, enrich_document, enrich_transporter};
use crate::store::{AntecedentContainer, ContainerStore};
use crate::structural::{
    check_container_structure, check_document_structure, check_transporter_structure,
};

// ─── Context ─────────────────────────────────────────────────────────

/// Who validates, when, and against which stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationContext {
    /// Roles of the acting user on the document.
    pub roles: UserRoles,
    /// Evaluation instant.
    pub now: Timestamp,
    /// Stage required fields are checked against. `None` means the stage
    /// the proposed entity reached.
    pub target: Option<Stage>,
}

impl ValidationContext {
    /// Context for a user holding `roles`.
    pub fn new(roles: UserRoles, now: Timestamp) -> Self {
        Self {
            roles,
            now,
            target: None,
        }
    }

    /// Context without any role.
    pub fn system(now: Timestamp) -> Self {
        Self::new(UserRoles::default(), now)
    }

    /// Check required fields as of `stage`.
    pub fn with_target(mut self, stage: Stage) -> Self {
        self.target = Some(stage);
        self
    }

    /// Rule context under `config`.
    pub fn rule_context(&self, config: &EngineConfig) -> RuleContext {
        RuleContext::new(self.roles, self.now, config)
    }
}

// ─── Results ─────────────────────────────────────────────────────────

/// A document that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedDocument {
    /// The validated document, enriched and with derived containers.
    pub document: Document,
    /// Dotted paths of fields that differ from the persisted snapshot.
    pub updated_fields: Vec<String>,
    /// Dotted paths of fields overwritten from the company registry.
    pub enriched_fields: Vec<String>,
    /// Resolved antecedent containers.
    pub antecedents: Vec<AntecedentContainer>,
    /// Successor pointers to write with the document.
    pub plan: Option<LineagePlan>,
}

/// A transporter slot that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedTransporter {
    /// The validated slot.
    pub transporter: Transporter,
    /// Dotted paths of fields that differ from the persisted snapshot.
    pub updated_fields: Vec<String>,
    /// Dotted paths of fields overwritten from the company registry.
    pub enriched_fields: Vec<String>,
}

/// A container that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedContainer {
    /// The validated container.
    pub container: Container,
    /// Dotted paths of fields that differ from the persisted snapshot.
    pub updated_fields: Vec<String>,
    /// Dotted paths of fields overwritten from the company registry.
    pub enriched_fields: Vec<String>,
}

// ─── Stage selection ─────────────────────────────────────────────────

fn target_ancestors(document: &Document, ctx: &ValidationContext) -> StageSet {
    DOCUMENT_STAGES.ancestor_stages(ctx.target.or_else(|| document_stage(document)))
}

fn reached_ancestors(document: &Document) -> StageSet {
    DOCUMENT_STAGES.ancestor_stages(document_stage(document))
}

/// Stages a transporter slot is evaluated against: those of its document,
/// plus its own slot once signed.
fn slot_ancestors(transporter: &Transporter, document: Option<&Document>) -> StageSet {
    let own = if transporter.is_signed() {
        DOCUMENT_STAGES.ancestor_stages(Stage::transport(usize::from(transporter.number)))
    } else {
        StageSet::empty()
    };
    document.map(reached_ancestors).unwrap_or_default().union(own)
}

fn slot_target(transporter: &Transporter, document: Option<&Document>, ctx: &ValidationContext) -> StageSet {
    match ctx.target {
        Some(stage) => DOCUMENT_STAGES.ancestor_stages(Some(stage)),
        None => slot_ancestors(transporter, document),
    }
}

// ─── Rule evaluation shared by both variants ─────────────────────────

fn evaluate_document(
    proposed: &Document,
    persisted: Option<&Document>,
    ctx: &ValidationContext,
    config: &EngineConfig,
    issues: &mut Issues,
) -> Vec<String> {
    let rules = ctx.rule_context(config);
    issues.extend_paths(
        IssueKind::Required,
        document_required_errors(proposed, target_ancestors(proposed, ctx), &rules),
    );
    let mut updated = Vec::new();
    if let Some(persisted) = persisted {
        let diff = diff_document(persisted, proposed, reached_ancestors(persisted), &rules);
        updated = diff.changed_paths();
        issues.extend_paths(IssueKind::Sealed, diff.violations);
    }
    issues.extend(check_document_refinements(proposed, config));
    updated
}

fn evaluate_transporter(
    proposed: &Transporter,
    persisted: Option<&Transporter>,
    document: Option<&Document>,
    ctx: &ValidationContext,
    config: &EngineConfig,
    issues: &mut Issues,
) -> Vec<String> {
    let rules = ctx.rule_context(config);
    let required = compute_required_errors(proposed, slot_target(proposed, document, ctx), &rules);
    issues.extend_paths(IssueKind::Required, required.into_iter().map(|e| e.under(&[])));
    let Some(persisted) = persisted else {
        return Vec::new();
    };
    let diff = diff_transporter(persisted, proposed, slot_ancestors(persisted, document), &rules);
    issues.extend_paths(
        IssueKind::Sealed,
        diff.violations.into_iter().map(|e| e.under(&[])),
    );
    diff.changed
        .iter()
        .map(|f| f.path().join("."))
        .collect()
}

fn evaluate_container(
    proposed: &Container,
    persisted: Option<&Container>,
    document: &Document,
    ctx: &ValidationContext,
    config: &EngineConfig,
    issues: &mut Issues,
) -> Vec<String> {
    let rules = ctx.rule_context(config);
    let own = container_ancestors(target_ancestors(document, ctx), proposed);
    let required = compute_required_errors(proposed, own, &rules);
    issues.extend_paths(IssueKind::Required, required.into_iter().map(|e| e.under(&[])));
    let mut updated = Vec::new();
    if let Some(persisted) = persisted {
        let diff = diff_container(persisted, proposed, reached_ancestors(document), &rules);
        updated = diff
            .changed
            .iter()
            .map(|f| f.path().join("."))
            .collect();
        issues.extend_paths(
            IssueKind::Sealed,
            diff.violations.into_iter().map(|e| e.under(&[])),
        );
    }
    issues.extend(check_container_refinements(proposed, document, config));
    updated
}

fn record_outcome<T, E>(entity: &'static str, result: &Result<T, E>, lookup_failed: impl Fn(&E) -> bool) {
    let outcome = match result {
        Ok(_) => "valid",
        Err(e) if lookup_failed(e) => "lookup_failed",
        Err(_) => "invalid",
    };
    metrics::counter!("bsff_validation_total", "entity" => entity, "outcome" => outcome).increment(1);
}

fn log_rejection(entity: &'static str, id: &str, issues: &Issues) {
    tracing::info!(entity, id, issues = issues.len(), "validation rejected");
}

// ─── Synchronous variants ────────────────────────────────────────────

/// Validate a document without any I/O.
///
/// `proposed` is the merged snapshot (see [`bsff_state::merge_patch`]);
/// `persisted` is `None` on creation.
pub fn validate_document_sync(
    proposed: Document,
    persisted: Option<&Document>,
    ctx: &ValidationContext,
    config: &EngineConfig,
) -> Result<ValidatedDocument, ValidationErrors> {
    let result = run_document_sync(proposed, persisted, ctx, config);
    record_outcome("document", &result, |_| false);
    result
}

fn run_document_sync(
    mut proposed: Document,
    persisted: Option<&Document>,
    ctx: &ValidationContext,
    config: &EngineConfig,
) -> Result<ValidatedDocument, ValidationErrors> {
    proposed.keep_container_links(persisted);
    let structural = check_document_structure(&proposed, config);
    if !structural.is_empty() {
        return Err(ValidationErrors(structural));
    }
    let mut issues = Issues::default();
    let updated_fields = evaluate_document(&proposed, persisted, ctx, config, &mut issues);
    if !issues.is_empty() {
        log_rejection("document", proposed.id.as_str(), &issues);
    }
    issues.finish(ValidatedDocument {
        document: proposed,
        updated_fields,
        enriched_fields: Vec::new(),
        antecedents: Vec::new(),
        plan: None,
    })
}

/// Validate a transporter slot without any I/O. `document` is the owning
/// document, when the slot is attached.
pub fn validate_transporter_sync(
    proposed: Transporter,
    persisted: Option<&Transporter>,
    document: Option<&Document>,
    ctx: &ValidationContext,
    config: &EngineConfig,
) -> Result<ValidatedTransporter, ValidationErrors> {
    let structural = check_transporter_structure(&proposed, config);
    let result = if structural.is_empty() {
        let mut issues = Issues::default();
        let updated_fields = evaluate_transporter(&proposed, persisted, document, ctx, config, &mut issues);
        issues.finish(ValidatedTransporter {
            transporter: proposed,
            updated_fields,
            enriched_fields: Vec::new(),
        })
    } else {
        Err(ValidationErrors(structural))
    };
    record_outcome("transporter", &result, |_| false);
    result
}

/// Validate one container of `document` without any I/O.
pub fn validate_container_sync(
    mut proposed: Container,
    persisted: Option<&Container>,
    document: &Document,
    ctx: &ValidationContext,
    config: &EngineConfig,
) -> Result<ValidatedContainer, ValidationErrors> {
    proposed.keep_system_links(persisted);
    let structural = check_container_structure(&proposed);
    let result = if structural.is_empty() {
        let mut issues = Issues::default();
        let updated_fields = evaluate_container(&proposed, persisted, document, ctx, config, &mut issues);
        issues.finish(ValidatedContainer {
            container: proposed,
            updated_fields,
            enriched_fields: Vec::new(),
        })
    } else {
        Err(ValidationErrors(structural))
    };
    record_outcome("container", &result, |_| false);
    result
}

// ─── Asynchronous variants ───────────────────────────────────────────

/// Full validator backed by storage and registry collaborators.
#[derive(Clone)]
pub struct Validator {
    store: Arc<dyn ContainerStore>,
    registry: Arc<dyn CompanyRegistry>,
    config: EngineConfig,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn is_lookup(error: &PipelineError) -> bool {
    matches!(error, PipelineError::Lookup(_))
}

impl Validator {
    /// Validator over `store` and `registry`.
    pub fn new(
        store: Arc<dyn ContainerStore>,
        registry: Arc<dyn CompanyRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Engine configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a document, with enrichment, lineage and profile checks.
    pub async fn validate_document(
        &self,
        proposed: Document,
        persisted: Option<&Document>,
        ctx: &ValidationContext,
    ) -> Result<ValidatedDocument, PipelineError> {
        let result = self.run_document(proposed, persisted, ctx).await;
        record_outcome("document", &result, is_lookup);
        if let Err(PipelineError::Lookup(e)) = &result {
            tracing::warn!(error = %e, "document validation aborted by a lookup failure");
        }
        result
    }

    async fn run_document(
        &self,
        mut proposed: Document,
        persisted: Option<&Document>,
        ctx: &ValidationContext,
    ) -> Result<ValidatedDocument, PipelineError> {
        proposed.keep_container_links(persisted);
        let structural = check_document_structure(&proposed, &self.config);
        if !structural.is_empty() {
            return Err(ValidationErrors(structural).into());
        }

        let rules = ctx.rule_context(&self.config);
        let mut lookups = Lookups::new(self.registry.as_ref());
        let mut issues = Issues::default();

        let baseline = reached_ancestors(persisted.unwrap_or(&proposed));
        let enriched_fields = enrich_document(&mut proposed, baseline, &rules, &mut lookups).await?;

        let (antecedents, plan) = match resolve_lineage(&proposed, self.store.as_ref()).await? {
            LineageOutcome::NotApplicable => {
                let plan = persisted
                    .filter(|p| !p.antecedent_ids().is_empty())
                    .map(|p| plan_lineage(&proposed, &[], Some(p)));
                (Vec::new(), plan)
            }
            LineageOutcome::Resolved(antecedents) => {
                populate_containers(&mut proposed, &antecedents);
                let plan = plan_lineage(&proposed, &antecedents, persisted);
                (antecedents, Some(plan))
            }
            LineageOutcome::Rejected(found) => {
                issues.extend(found);
                (Vec::new(), None)
            }
        };

        issues.extend(self.check_intervention_sheets(&proposed).await?);
        let updated_fields = evaluate_document(&proposed, persisted, ctx, &self.config, &mut issues);
        issues.extend(check_document_companies(&proposed, &mut lookups).await?);

        if issues.is_empty() {
            tracing::debug!(
                document_id = %proposed.id,
                enriched = enriched_fields.len(),
                antecedents = antecedents.len(),
                "document validated"
            );
        } else {
            log_rejection("document", proposed.id.as_str(), &issues);
        }
        Ok(issues.finish(ValidatedDocument {
            document: proposed,
            updated_fields,
            enriched_fields,
            antecedents,
            plan,
        })?)
    }

    async fn check_intervention_sheets(
        &self,
        document: &Document,
    ) -> Result<Vec<ValidationIssue>, PipelineError> {
        if document.intervention_sheets.is_empty() {
            return Ok(Vec::new());
        }
        let sheets = self
            .store
            .find_intervention_sheets(&document.intervention_sheets)
            .await?;
        let mut issues = Vec::new();

        let missing: Vec<&str> = document
            .intervention_sheets
            .iter()
            .filter(|id| !sheets.iter().any(|s| &s.id == *id))
            .map(InterventionSheetId::as_str)
            .collect();
        if !missing.is_empty() {
            issues.push(ValidationIssue::new(
                IssueKind::Refinement,
                ["interventionSheets"],
                format!("The intervention sheets {} do not exist", missing.join(", ")),
            ));
        }

        if let Some(emitter) = &document.emitter.company.siret {
            for sheet in &sheets {
                if sheet.operator_siret.as_ref() != Some(emitter) {
                    issues.push(ValidationIssue::new(
                        IssueKind::Refinement,
                        ["interventionSheets"],
                        format!(
                            "Intervention sheet {} was not issued by the emitter {emitter}",
                            sheet.numero
                        ),
                    ));
                }
            }
        }
        Ok(issues)
    }

    /// Validate a transporter slot, with enrichment and profile checks.
    pub async fn validate_transporter(
        &self,
        proposed: Transporter,
        persisted: Option<&Transporter>,
        document: Option<&Document>,
        ctx: &ValidationContext,
    ) -> Result<ValidatedTransporter, PipelineError> {
        let result = self.run_transporter(proposed, persisted, document, ctx).await;
        record_outcome("transporter", &result, is_lookup);
        result
    }

    async fn run_transporter(
        &self,
        mut proposed: Transporter,
        persisted: Option<&Transporter>,
        document: Option<&Document>,
        ctx: &ValidationContext,
    ) -> Result<ValidatedTransporter, PipelineError> {
        let structural = check_transporter_structure(&proposed, &self.config);
        if !structural.is_empty() {
            return Err(ValidationErrors(structural).into());
        }
        let rules = ctx.rule_context(&self.config);
        let mut lookups = Lookups::new(self.registry.as_ref());
        let baseline = slot_ancestors(persisted.unwrap_or(&proposed), document);
        let enriched_fields =
            enrich_transporter(&mut proposed, "", baseline, &rules, &mut lookups).await?;

        let mut issues = Issues::default();
        let updated_fields =
            evaluate_transporter(&proposed, persisted, document, ctx, &self.config, &mut issues);
        issues.extend(check_transporter_company(&proposed, "", &mut lookups).await?);
        if !issues.is_empty() {
            log_rejection("transporter", proposed.id.as_str(), &issues);
        }
        Ok(issues.finish(ValidatedTransporter {
            transporter: proposed,
            updated_fields,
            enriched_fields,
        })?)
    }

    /// Validate one container of `document`, with enrichment and profile
    /// checks of its next destination.
    pub async fn validate_container(
        &self,
        proposed: Container,
        persisted: Option<&Container>,
        document: &Document,
        ctx: &ValidationContext,
    ) -> Result<ValidatedContainer, PipelineError> {
        let result = self.run_container(proposed, persisted, document, ctx).await;
        record_outcome("container", &result, is_lookup);
        result
    }

    async fn run_container(
        &self,
        mut proposed: Container,
        persisted: Option<&Container>,
        document: &Document,
        ctx: &ValidationContext,
    ) -> Result<ValidatedContainer, PipelineError> {
        proposed.keep_system_links(persisted);
        let structural = check_container_structure(&proposed);
        if !structural.is_empty() {
            return Err(ValidationErrors(structural).into());
        }
        let rules = ctx.rule_context(&self.config);
        let mut lookups = Lookups::new(self.registry.as_ref());
        let enriched_fields = enrich_container(
            &mut proposed,
            "",
            reached_ancestors(document),
            &rules,
            &mut lookups,
        )
        .await?;

        let mut issues = Issues::default();
        let updated_fields =
            evaluate_container(&proposed, persisted, document, ctx, &self.config, &mut issues);
        issues.extend(check_container_companies(&proposed, "", &mut lookups).await?);
        if !issues.is_empty() {
            log_rejection("container", proposed.id.as_str(), &issues);
        }
        Ok(issues.finish(ValidatedContainer {
            container: proposed,
            updated_fields,
            enriched_fields,
        })?)
    }

    /// Attach persisted transporter records to `document`, in the given
    /// order, after its existing slots.
    pub async fn attach_transporters(
        &self,
        document: &mut Document,
        ids: &[TransporterId],
    ) -> Result<(), PipelineError> {
        let found = self.store.find_transporters(ids).await?;
        let missing: Vec<&str> = ids
            .iter()
            .filter(|id| !found.iter().any(|t| &t.id == *id))
            .map(TransporterId::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationErrors(vec![ValidationIssue::new(
                IssueKind::Structural,
                ["transporters"],
                format!("The transporters {} do not exist", missing.join(", ")),
            )])
            .into());
        }
        for id in ids {
            if let Some(mut transporter) = found.iter().find(|t| &t.id == id).cloned() {
                transporter.document_id = Some(document.id.clone());
                transporter.number = u8::MAX;
                document.transporters.push(transporter);
            }
        }
        document.renumber_transporters();
        Ok(())
    }

    /// Attach persisted container records to `document`.
    pub async fn attach_containers(
        &self,
        document: &mut Document,
        ids: &[ContainerId],
    ) -> Result<(), PipelineError> {
        let found = self.store.find_containers(ids).await?;
        let missing: Vec<&str> = ids
            .iter()
            .filter(|id| !found.iter().any(|c| &c.id == *id))
            .map(ContainerId::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationErrors(vec![ValidationIssue::new(
                IssueKind::Structural,
                ["containers"],
                format!("The containers {} do not exist", missing.join(", ")),
            )])
            .into());
        }
        for mut container in found {
            if document.container(&container.id).is_none() {
                container.document_id = Some(document.id.clone());
                document.containers.push(container);
            }
        }
        Ok(())
    }
}
