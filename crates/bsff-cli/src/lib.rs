//! # bsff-cli: Fluid-Waste Shipment Command-Line Interface
//!
//! Drives the validation pipelines and the signing workflow against a
//! JSON workspace file (see [`workspace`]).
//!
//! ## Subcommands
//!
//! - `validate`: validate a full document or a merge patch
//! - `fields`: required and sealed field paths of a stored document
//! - `status`: stored versus derived document status
//! - `sign`: validate at a stage and record the signature
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to `bsff-validation` and `bsff-state`; no business
//!   rule lives here.
//! - Every handler returns an [`Outcome`]: a JSON body and whether the
//!   command succeeded, which the binary maps to its exit code.

pub mod fields;
pub mod sign;
pub mod status;
pub mod validate;
pub mod workspace;

use std::path::PathBuf;

use serde::Serialize;

use bsff_core::{EngineConfig, Timestamp};
use bsff_state::Stage;
use bsff_validation::Validator;

use crate::workspace::Workspace;

/// Everything a handler needs besides its own arguments.
#[derive(Debug)]
pub struct CommandContext {
    /// Loaded workspace.
    pub workspace: Workspace,
    /// Where the workspace was loaded from.
    pub workspace_path: PathBuf,
    /// Engine configuration.
    pub config: EngineConfig,
    /// Evaluation instant.
    pub now: Timestamp,
}

impl CommandContext {
    /// A validator over the workspace store and registry.
    pub fn validator(&self) -> Validator {
        Validator::new(
            self.workspace.store(),
            self.workspace.registry(),
            self.config.clone(),
        )
    }
}

/// Result of a handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Whether the command succeeded.
    pub ok: bool,
    /// JSON body printed on stdout.
    pub body: serde_json::Value,
}

impl Outcome {
    /// Successful outcome.
    pub fn ok(body: impl Serialize) -> anyhow::Result<Self> {
        Ok(Self {
            ok: true,
            body: serde_json::to_value(body)?,
        })
    }

    /// Failed outcome.
    pub fn failed(body: impl Serialize) -> anyhow::Result<Self> {
        Ok(Self {
            ok: false,
            body: serde_json::to_value(body)?,
        })
    }
}

/// Parse a stage name, case-insensitively: `emission`, `transport`,
/// `transport_2`, `reception`, `acceptation`, `operation`.
pub fn parse_stage(s: &str) -> Result<Stage, String> {
    s.to_ascii_uppercase().parse().map_err(|e: bsff_core::BsffError| e.to_string())
}

/// Parse an RFC 3339 UTC timestamp.
pub fn parse_timestamp(s: &str) -> Result<Timestamp, String> {
    Timestamp::parse(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stage() {
        assert_eq!(parse_stage("emission"), Ok(Stage::Emission));
        assert_eq!(parse_stage("TRANSPORT"), Ok(Stage::Transport(1)));
        assert_eq!(parse_stage("transport_3"), Ok(Stage::Transport(3)));
        assert!(parse_stage("transport_9").is_err());
        assert!(parse_stage("shipping").is_err());
    }

    #[test]
    fn test_parse_timestamp_requires_utc() {
        assert!(parse_timestamp("2024-10-01T08:00:00Z").is_ok());
        assert!(parse_timestamp("2024-10-01T08:00:00+02:00").is_err());
    }
}
