//! # Treatment Operation Catalogue
//!
//! The closed set of treatment codes a fluid-waste destination may declare,
//! with two derived properties per code:
//!
//! - the document kinds that may legally continue the material afterwards
//!   (an empty list marks a *final* operation);
//! - the treatment modes compatible with the code.
//!
//! | Code | Successor kinds | Modes |
//! |------|-----------------|-------|
//! | R1 | - | energy recovery |
//! | R2, R3, R5 | - | reuse, recycling |
//! | R12, D13 | grouping, repackaging | - |
//! | D14 | repackaging | - |
//! | R13, D15 | forwarding | - |
//! | D10 | - | elimination |

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::DocumentKind;
use crate::error::BsffError;

/// Treatment operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperationCode {
    /// Use principally as a fuel.
    R1,
    /// Solvent reclamation/regeneration.
    R2,
    /// Recycling/reclamation of organic substances.
    R3,
    /// Recycling/reclamation of other inorganic materials.
    R5,
    /// Exchange of wastes for submission to R1–R11.
    R12,
    /// Storage pending R1–R12.
    R13,
    /// Incineration on land.
    D10,
    /// Blending or mixing prior to D1–D12.
    D13,
    /// Repackaging prior to D1–D13.
    D14,
    /// Storage pending D1–D14.
    D15,
}

/// Treatment mode declared alongside the operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationMode {
    /// Reuse as-is.
    Reuse,
    /// Material recycling.
    Recycling,
    /// Energy recovery.
    EnergyRecovery,
    /// Other forms of recovery.
    OtherRecovery,
    /// Disposal.
    Elimination,
}

impl OperationCode {
    /// All codes in catalogue order.
    pub fn all() -> &'static [OperationCode] {
        &[
            Self::R1,
            Self::R2,
            Self::R3,
            Self::R5,
            Self::R12,
            Self::R13,
            Self::D10,
            Self::D13,
            Self::D14,
            Self::D15,
        ]
    }

    /// Document kinds that may carry the material after this operation.
    pub fn successors(&self) -> &'static [DocumentKind] {
        match self {
            Self::R12 | Self::D13 => &[DocumentKind::Grouping, DocumentKind::Repackaging],
            Self::D14 => &[DocumentKind::Repackaging],
            Self::R13 | Self::D15 => &[DocumentKind::Forwarding],
            Self::R1 | Self::R2 | Self::R3 | Self::R5 | Self::D10 => &[],
        }
    }

    /// Whether the material may continue on a document of `kind`.
    pub fn allows_successor(&self, kind: DocumentKind) -> bool {
        self.successors().contains(&kind)
    }

    /// Whether the operation ends traceability: no legal successor, or
    /// the destination declared that traceability is interrupted.
    pub fn is_final(&self, no_traceability: bool) -> bool {
        self.successors().is_empty() || no_traceability
    }

    /// Treatment modes compatible with this code. Empty means no mode may
    /// be declared.
    pub fn modes(&self) -> &'static [OperationMode] {
        match self {
            Self::R1 => &[OperationMode::EnergyRecovery],
            Self::R2 | Self::R3 | Self::R5 => &[OperationMode::Reuse, OperationMode::Recycling],
            Self::D10 => &[OperationMode::Elimination],
            Self::R12 | Self::R13 | Self::D13 | Self::D14 | Self::D15 => &[],
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::R5 => "R5",
            Self::R12 => "R12",
            Self::R13 => "R13",
            Self::D10 => "D10",
            Self::D13 => "D13",
            Self::D14 => "D14",
            Self::D15 => "D15",
        }
    }
}

impl OperationMode {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reuse => "REUSE",
            Self::Recycling => "RECYCLING",
            Self::EnergyRecovery => "ENERGY_RECOVERY",
            Self::OtherRecovery => "OTHER_RECOVERY",
            Self::Elimination => "ELIMINATION",
        }
    }
}

impl std::fmt::Display for OperationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for OperationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationCode {
    type Err = BsffError;

    /// Accepts `"R12"` and the spaced form `"R 12"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        Self::all()
            .iter()
            .copied()
            .find(|code| code.as_str().eq_ignore_ascii_case(&compact))
            .ok_or_else(|| BsffError::UnknownVariant {
                kind: "operation code",
                value: s.to_string(),
            })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_code() -> impl Strategy<Value = OperationCode> {
        prop::sample::select(OperationCode::all().to_vec())
    }

    proptest! {
        #[test]
        fn interrupted_traceability_is_always_final(code in any_code()) {
            prop_assert!(code.is_final(true));
        }

        #[test]
        fn codes_with_modes_have_no_successor(code in any_code()) {
            if !code.modes().is_empty() {
                prop_assert!(code.successors().is_empty());
                prop_assert!(code.is_final(false));
            }
        }
    }
}
