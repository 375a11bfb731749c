//! # bsff-state: Document Lifecycle and Field Locking
//!
//! The pure, synchronous heart of the engine: the shipment entity model and
//! the rules that govern how it may change as signatures accumulate.
//!
//! ## Components
//!
//! - **Stage Hierarchy** (`stage.rs`): document stages
//!   `EMISSION → TRANSPORT(1..5) → RECEPTION → ACCEPTATION → OPERATION` and
//!   container stages `ACCEPTATION → OPERATION`, with precomputed ancestor
//!   sets.
//!
//! - **Field Rule Tables** (`rules/`): one sealed rule and an optional
//!   required rule per field of a document, transporter slot and container,
//!   keyed by closed field enumerations.
//!
//! - **Rule Evaluator** (`evaluator.rs`): required-field errors, sealed
//!   fields, persisted-vs-proposed diff with sealed violations, and
//!   client-facing field paths.
//!
//! - **Status Aggregator** (`status.rs`): document status derived from the
//!   per-container acceptance and operation states.
//!
//! - **Signature Transitions** (`signing.rs`): stage signatures with
//!   ordering checks and a transition log.
//!
//! ## Design
//!
//! Nothing in this crate performs I/O. Lineage resolution and company
//! enrichment live in `bsff-validation`, which feeds the results back into
//! the evaluator.

pub mod container;
pub mod document;
pub mod evaluator;
pub mod patch;
pub mod rules;
pub mod signing;
pub mod stage;
pub mod status;
pub mod transporter;
pub mod value;

// ─── Entity re-exports ──────────────────────────────────────────────

pub use container::{Acceptation, Container, NextDestination, Operation};
pub use document::{Destination, Document, Emitter, Signature, Waste, Weight};
pub use transporter::{Recepisse, Transport, Transporter};

// ─── Rule re-exports ────────────────────────────────────────────────

pub use evaluator::{
    changed_fields, compute_required_errors, compute_required_fields, compute_sealed_fields,
    diff_and_check_sealed, diff_container, diff_document, diff_transporter,
    document_required_errors, required_and_sealed_field_paths, DocumentDiff, FieldError,
    FieldPaths, PathError, SealedDiff,
};
pub use rules::{
    ContainerField, DocumentField, FieldRule, Rule, RuleContext, RuleField, RuledEntity,
    StageSource, TransporterField, UserRoles,
};
pub use value::FieldValue;

// ─── Lifecycle re-exports ───────────────────────────────────────────

pub use patch::merge_patch;
pub use signing::{ReleasedContainers, SignatureError, SignatureRecord};
pub use stage::{
    container_ancestors, document_stage, Stage, StageHierarchy, StageSet, CONTAINER_STAGES,
    DOCUMENT_STAGES,
};
pub use status::{derive_document_status, derive_status, ContainerOutcome, SuccessorIndex};
