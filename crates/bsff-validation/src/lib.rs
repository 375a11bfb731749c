//! # bsff-validation: Validation Pipelines
//!
//! Everything that decides whether a proposed document, transporter slot
//! or container may be persisted, on top of the rule evaluator of
//! `bsff-state`.
//!
//! ## Components
//!
//! - **Issues** (`issue.rs`): the flat, kinded issue list every check
//!   reports into, and the pipeline error type.
//!
//! - **Structural and refinement checks** (`structural.rs`,
//!   `refinement.rs`): shape checks that halt the pipeline, and the
//!   cross-field business checks that accumulate.
//!
//! - **Lineage Validator** (`lineage.rs`): antecedent containers of
//!   grouping, forwarding and repackaging documents, container derivation
//!   and successor pointer plans.
//!
//! - **Collaborators** (`store.rs`, `registry.rs`, `roles.rs`): storage,
//!   company registry and role resolution behind traits, with in-memory
//!   implementations.
//!
//! - **Pipelines** (`pipeline.rs`, `workflow.rs`): synchronous draft
//!   validation, asynchronous full validation, and the signing workflow.
//!
//! ## Design
//!
//! Collaborators are trait objects shared behind `Arc`, so a service can
//! plug its own database and registry client. Validation itself never
//! writes: it returns the validated entity and a [`LineagePlan`] for the
//! caller's transaction.

pub mod issue;
pub mod lineage;
pub mod pipeline;
mod profiles;
pub mod refinement;
pub mod registry;
pub mod roles;
mod sirenify;
pub mod store;
pub mod structural;
pub mod workflow;

pub use issue::{IssueKind, LookupError, PipelineError, ValidationErrors, ValidationIssue};
pub use lineage::{
    check_antecedents, check_lineage_structure, plan_lineage, populate_containers,
    requires_lineage, resolve_lineage, ContainerLink, LineageOutcome, LineagePlan,
};
pub use pipeline::{
    validate_container_sync, validate_document_sync, validate_transporter_sync,
    ValidatedContainer, ValidatedDocument, ValidatedTransporter, ValidationContext, Validator,
};
pub use registry::{
    CompanyProfile, CompanyRecord, CompanyRegistry, InMemoryRegistry, TransporterReceipt,
};
pub use roles::{RoleResolver, StaticRoles};
pub use store::{AntecedentContainer, ContainerStore, InMemoryStore, InterventionSheet};
pub use workflow::{sign, SignRequest, SignedDocument, WorkflowError};
