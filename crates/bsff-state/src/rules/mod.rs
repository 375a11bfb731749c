//! # Field Rule Tables
//!
//! Every editable field of a document, transporter or container maps to a
//! [`FieldRule`]: a *sealed* rule (stage from which the field can no longer
//! change) and an optional *required* rule (stage from which the field must
//! hold a value).
//!
//! ## Design
//!
//! Field identifiers are closed enumerations ([`DocumentField`],
//! [`TransporterField`], [`ContainerField`]) and each table is an
//! exhaustive `match`, so a field without a rule does not compile.
//!
//! A rule's starting stage is a [`StageSource`]: either a fixed stage or a
//! function of the entity and the [`RuleContext`]. The latter expresses
//! role exceptions such as "sealed from EMISSION, except that the emitter
//! may still edit until the first transport signature". Both forms are
//! resolved through [`StageSource::resolve`].

pub mod container;
pub mod document;
pub mod transporter;

pub use container::ContainerField;
pub use document::DocumentField;
pub use transporter::TransporterField;

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use bsff_core::{EngineConfig, Timestamp};

use crate::stage::{Stage, StageSet};
use crate::value::FieldValue;

// ─── Context ─────────────────────────────────────────────────────────

/// Roles the acting user holds on the document being edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoles {
    /// Member of the emitter company.
    pub is_emitter: bool,
    /// Member of the destination company.
    pub is_destination: bool,
    /// Member of one of the transporter companies.
    pub is_transporter: bool,
}

/// Everything a rule predicate may consult besides the entity itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleContext {
    /// Roles of the acting user.
    pub roles: UserRoles,
    /// Evaluation instant, for the correction window.
    pub now: Timestamp,
    /// Correction window length in days.
    pub correction_window_days: i64,
}

impl RuleContext {
    /// Context for a user holding `roles`, evaluated at `now`.
    pub fn new(roles: UserRoles, now: Timestamp, config: &EngineConfig) -> Self {
        Self {
            roles,
            now,
            correction_window_days: config.correction_window_days,
        }
    }

    /// Context without any role, as used by background jobs.
    pub fn system(now: Timestamp, config: &EngineConfig) -> Self {
        Self::new(UserRoles::default(), now, config)
    }
}

// ─── Rules ───────────────────────────────────────────────────────────

/// Predicate over an entity and its rule context.
pub type Predicate<T> = fn(&T, &RuleContext) -> bool;

/// Where a rule's starting stage comes from.
pub enum StageSource<T> {
    /// A constant stage.
    Fixed(Stage),
    /// A stage computed from the entity and the context.
    Dynamic(fn(&T, &RuleContext) -> Stage),
}

impl<T> StageSource<T> {
    /// The starting stage for `entity` under `ctx`.
    pub fn resolve(&self, entity: &T, ctx: &RuleContext) -> Stage {
        match self {
            StageSource::Fixed(stage) => *stage,
            StageSource::Dynamic(f) => f(entity, ctx),
        }
    }
}

impl<T> Clone for StageSource<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StageSource<T> {}

/// A stage-gated rule.
pub struct Rule<T> {
    /// Stage from which the rule applies.
    pub from: StageSource<T>,
    /// Extra condition, evaluated on the merged entity.
    pub when: Option<Predicate<T>>,
    /// Appended to the generated error message.
    pub message: Option<&'static str>,
}

impl<T> Clone for Rule<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Rule<T> {}

impl<T> Rule<T> {
    /// Rule starting at a fixed stage.
    pub fn at(stage: Stage) -> Self {
        Self {
            from: StageSource::Fixed(stage),
            when: None,
            message: None,
        }
    }

    /// Rule starting at a computed stage.
    pub fn dynamic(f: fn(&T, &RuleContext) -> Stage) -> Self {
        Self {
            from: StageSource::Dynamic(f),
            when: None,
            message: None,
        }
    }

    /// Restrict the rule to entities satisfying `predicate`.
    pub fn when(mut self, predicate: Predicate<T>) -> Self {
        self.when = Some(predicate);
        self
    }

    /// Append `message` to errors raised by this rule.
    pub fn message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    /// Whether the rule is in force for `entity` given the ancestor stages
    /// of the evaluation target.
    pub fn applies(&self, entity: &T, ancestors: StageSet, ctx: &RuleContext) -> bool {
        ancestors.contains(self.from.resolve(entity, ctx))
            && self.when.map_or(true, |when| when(entity, ctx))
    }
}

/// Sealed and required rules of one field.
pub struct FieldRule<T> {
    /// Human-readable field name, capitalised.
    pub label: &'static str,
    /// When the field stops being editable.
    pub sealed: Rule<T>,
    /// When the field must hold a value.
    pub required: Option<Rule<T>>,
}

impl<T> FieldRule<T> {
    /// Field sealed by `sealed`, never required.
    pub fn sealed(label: &'static str, sealed: Rule<T>) -> Self {
        Self {
            label,
            sealed,
            required: None,
        }
    }

    /// Add a required rule.
    pub fn required(mut self, required: Rule<T>) -> Self {
        self.required = Some(required);
        self
    }
}

// ─── Ruled entities ──────────────────────────────────────────────────

/// A closed set of field identifiers.
pub trait RuleField: Copy + Eq + Hash + Debug + 'static {
    /// Every field in declaration order.
    const ALL: &'static [Self];

    /// Client-facing path of the field, relative to its entity.
    fn path(self) -> &'static [&'static str];
}

/// An entity governed by a field rule table.
pub trait RuledEntity: Sized {
    /// Field identifiers of this entity.
    type Field: RuleField;

    /// The rule of `field`.
    fn rule(field: Self::Field) -> FieldRule<Self>;

    /// The current value of `field`.
    fn value(&self, field: Self::Field) -> FieldValue;

    /// Label used in messages; entities living in a list qualify it.
    fn describe(&self, label: &str) -> String {
        label.to_string()
    }
}
