//! # Validation Issues
//!
//! Every check of the pipeline reports [`ValidationIssue`]s into one flat
//! list. Issues carry their kind so callers can tell a missing field from a
//! sealed-field violation or a lineage failure, but none of them is ever
//! dropped: the caller receives everything that was found.
//!
//! Collaborator I/O failures are not issues. They surface as
//! [`PipelineError::Lookup`] and abort the run.

use serde::Serialize;
use thiserror::Error;

use bsff_state::PathError;

// ─── Issues ──────────────────────────────────────────────────────────

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// Malformed or out-of-range input; rule evaluation did not run.
    Structural,
    /// A field required at the target stage has no value.
    Required,
    /// A sealed field was modified.
    Sealed,
    /// Previous-container lineage failure.
    Lineage,
    /// Unknown company, or company lacking the profile its role needs.
    Company,
    /// Cross-field consistency failure.
    Refinement,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Structural => "STRUCTURAL",
            Self::Required => "REQUIRED",
            Self::Sealed => "SEALED",
            Self::Lineage => "LINEAGE",
            Self::Company => "COMPANY",
            Self::Refinement => "REFINEMENT",
        };
        f.write_str(s)
    }
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Category.
    pub kind: IssueKind,
    /// Path of the offending field from the entity root. Empty for
    /// entity-wide issues.
    pub path: Vec<String>,
    /// Human-readable message.
    pub message: String,
}

impl ValidationIssue {
    /// Issue of `kind` at `path`.
    pub fn new<P, S>(kind: IssueKind, path: P, message: impl Into<String>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            path: path.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }

    /// Entity-wide issue of `kind`.
    pub fn global(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: Vec::new(),
            message: message.into(),
        }
    }

    /// Issue from a rule evaluator error.
    pub fn from_path_error(kind: IssueKind, error: PathError) -> Self {
        Self {
            kind,
            path: error.path,
            message: error.message,
        }
    }

    /// Dotted path, empty for entity-wide issues.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }

    /// Re-root the issue under `prefix`.
    pub fn under(mut self, prefix: &[String]) -> Self {
        let mut path = prefix.to_vec();
        path.append(&mut self.path);
        self.path = path;
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.kind, self.dotted_path(), self.message)
        }
    }
}

/// The flat list of issues returned by a failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("validation failed with {} issue(s)", .0.len())]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl ValidationErrors {
    /// Issues in discovery order.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }

    /// Issues of one kind.
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.0.iter().filter(move |i| i.kind == kind)
    }

    /// Whether any issue message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.0.iter().any(|i| i.message.contains(needle))
    }
}

// ─── Collaborator errors ─────────────────────────────────────────────

/// Failure of a storage or registry collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The collaborator could not be reached.
    #[error("{collaborator} unavailable: {reason}")]
    Unavailable {
        /// Which collaborator failed.
        collaborator: &'static str,
        /// Description of the failure.
        reason: String,
    },

    /// The collaborator answered with something unusable.
    #[error("{collaborator} returned an invalid response: {reason}")]
    InvalidResponse {
        /// Which collaborator failed.
        collaborator: &'static str,
        /// Description of the failure.
        reason: String,
    },
}

/// Outcome of a failed asynchronous validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The entity is invalid.
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    /// A collaborator lookup failed; the caller may retry.
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

impl PipelineError {
    /// The validation issues, when the entity was found invalid.
    pub fn issues(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            Self::Lookup(_) => None,
        }
    }
}

// ─── Collection ──────────────────────────────────────────────────────

/// Accumulates issues across the checks of one validation run.
#[derive(Debug, Default)]
pub(crate) struct Issues(Vec<ValidationIssue>);

impl Issues {
    pub(crate) fn push(&mut self, issue: ValidationIssue) {
        self.0.push(issue);
    }

    pub(crate) fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.0.extend(issues);
    }

    pub(crate) fn extend_paths(&mut self, kind: IssueKind, errors: impl IntoIterator<Item = PathError>) {
        self.0
            .extend(errors.into_iter().map(|e| ValidationIssue::from_path_error(kind, e)));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(value)` when nothing was found, the collected issues otherwise.
    pub(crate) fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}
