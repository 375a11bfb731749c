//! # Shipment Domain Enumerations
//!
//! Closed enumerations describing a shipment: the document kind, transport
//! modes, packaging types, container acceptance outcomes, and the document
//! status. Every `match` over these is exhaustive; adding a variant forces
//! every rule table and status projection to handle it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::BsffError;

// ─── Document Kind ───────────────────────────────────────────────────

/// The shipment pattern a document follows.
///
/// | Kind | Reference list | Containers |
/// |------|----------------|------------|
/// | `Direct` | none | caller-supplied |
/// | `SmallQuantityCollection` | none | caller-supplied, intervention sheets |
/// | `Grouping` | `grouping` | derived from antecedents |
/// | `Repackaging` | `repackaging` | one caller-supplied container |
/// | `Forwarding` | `forwarding` | derived from antecedents |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    /// Single producer shipping straight to a treatment facility.
    Direct,
    /// Operator collecting small quantities across several interventions.
    SmallQuantityCollection,
    /// Containers from several documents shipped together.
    Grouping,
    /// Containers from several documents merged into one new container.
    Repackaging,
    /// Containers of one document sent on unchanged.
    Forwarding,
}

impl DocumentKind {
    /// All kinds in declaration order.
    pub fn all() -> &'static [DocumentKind] {
        &[
            Self::Direct,
            Self::SmallQuantityCollection,
            Self::Grouping,
            Self::Repackaging,
            Self::Forwarding,
        ]
    }

    /// Whether documents of this kind reference antecedent containers.
    pub fn has_lineage(&self) -> bool {
        matches!(self, Self::Grouping | Self::Repackaging | Self::Forwarding)
    }

    /// Whether the document's containers are derived from its antecedents.
    pub fn derives_containers(&self) -> bool {
        matches!(self, Self::Grouping | Self::Forwarding)
    }

    /// Verb used in lineage messages ("group", "forward", "repackage").
    pub fn lineage_verb(&self) -> &'static str {
        match self {
            Self::Grouping => "group",
            Self::Forwarding => "forward",
            Self::Repackaging => "repackage",
            Self::Direct | Self::SmallQuantityCollection => "reference",
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "DIRECT",
            Self::SmallQuantityCollection => "SMALL_QUANTITY_COLLECTION",
            Self::Grouping => "GROUPING",
            Self::Repackaging => "REPACKAGING",
            Self::Forwarding => "FORWARDING",
        }
    }
}

// ─── Transport Mode ──────────────────────────────────────────────────

/// How a transporter moves the waste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportMode {
    /// Road haulage. Triggers recepisse and plate requirements.
    Road,
    /// Rail freight.
    Rail,
    /// Air freight.
    Air,
    /// Inland waterway.
    River,
    /// Maritime.
    Sea,
    /// Anything else.
    Other,
}

impl TransportMode {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Road => "ROAD",
            Self::Rail => "RAIL",
            Self::Air => "AIR",
            Self::River => "RIVER",
            Self::Sea => "SEA",
            Self::Other => "OTHER",
        }
    }
}

// ─── Packaging Type ──────────────────────────────────────────────────

/// Physical form of a fluid container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackagingType {
    /// Pressurised bottle.
    Bottle,
    /// Rigid container.
    Container,
    /// Fixed or mobile tank.
    Tank,
    /// Free-text description in `other`.
    Other,
}

impl PackagingType {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bottle => "BOTTLE",
            Self::Container => "CONTAINER",
            Self::Tank => "TANK",
            Self::Other => "OTHER",
        }
    }
}

// ─── Acceptation Status ──────────────────────────────────────────────

/// Outcome of the destination's inspection of one container.
///
/// `PartiallyRefused` exists on the wire because clients send it, but a
/// container is either accepted or refused as a whole; structural checks
/// reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcceptationStatus {
    /// Container accepted.
    Accepted,
    /// Container refused in full.
    Refused,
    /// Not valid for a single container.
    PartiallyRefused,
}

impl AcceptationStatus {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Refused => "REFUSED",
            Self::PartiallyRefused => "PARTIALLY_REFUSED",
        }
    }
}

// ─── Document Status ─────────────────────────────────────────────────

/// Aggregate status of a document.
///
/// ```text
/// Initial ──▶ SignedByEmitter ──▶ Sent ──▶ Received ──▶ Accepted ──▶ Processed
///                                             │            │
///                                             │            └──▶ IntermediatelyProcessed
///                                             ├──▶ Refused (terminal)
///                                             └──▶ PartiallyRefused ──▶ Processed / IntermediatelyProcessed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Created, no signature.
    Initial,
    /// Emitter signed.
    SignedByEmitter,
    /// At least one transporter took over the waste.
    Sent,
    /// Destination signed reception.
    Received,
    /// Every container accepted.
    Accepted,
    /// Every container refused.
    Refused,
    /// Some containers accepted, the others refused.
    PartiallyRefused,
    /// Every container reached a final treatment (or was refused).
    Processed,
    /// Containers await a further shipment.
    IntermediatelyProcessed,
}

impl DocumentStatus {
    /// Whether no further signature can change this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refused | Self::Processed)
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::SignedByEmitter => "SIGNED_BY_EMITTER",
            Self::Sent => "SENT",
            Self::Received => "RECEIVED",
            Self::Accepted => "ACCEPTED",
            Self::Refused => "REFUSED",
            Self::PartiallyRefused => "PARTIALLY_REFUSED",
            Self::Processed => "PROCESSED",
            Self::IntermediatelyProcessed => "INTERMEDIATELY_PROCESSED",
        }
    }
}

// ─── Display / FromStr ───────────────────────────────────────────────

macro_rules! string_enum {
    ($ty:ty, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = BsffError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == <$ty>::$variant.as_str() {
                        return Ok(<$ty>::$variant);
                    }
                )+
                Err(BsffError::UnknownVariant {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

string_enum!(
    DocumentKind,
    "document kind",
    [Direct, SmallQuantityCollection, Grouping, Repackaging, Forwarding]
);
string_enum!(TransportMode, "transport mode", [Road, Rail, Air, River, Sea, Other]);
string_enum!(PackagingType, "packaging type", [Bottle, Container, Tank, Other]);
string_enum!(
    AcceptationStatus,
    "acceptation status",
    [Accepted, Refused, PartiallyRefused]
);
string_enum!(
    DocumentStatus,
    "document status",
    [
        Initial,
        SignedByEmitter,
        Sent,
        Received,
        Accepted,
        Refused,
        PartiallyRefused,
        Processed,
        IntermediatelyProcessed,
    ]
);
