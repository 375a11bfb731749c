//! # Validate Subcommand
//!
//! Validates a full document, or a merge patch applied onto a stored
//! document. Offline mode runs the synchronous pipeline only.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::{json, Value};

use bsff_state::{merge_patch, Document, Stage};
use bsff_validation::{validate_document_sync, PipelineError, ValidationContext};

use crate::{parse_stage, CommandContext, Outcome};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// JSON file holding a full document, or a patch with `--patch`.
    pub input: PathBuf,

    /// Apply the input as a merge patch onto this stored document.
    #[arg(long, value_name = "ID")]
    pub patch: Option<String>,

    /// Check required fields as of this stage.
    #[arg(long, value_parser = parse_stage)]
    pub stage: Option<Stage>,

    /// Acting user, resolved through the workspace members.
    #[arg(long)]
    pub user: Option<String>,

    /// Skip registry, lineage and intervention sheet lookups.
    #[arg(long)]
    pub offline: bool,
}

fn read_input(args: &ValidateArgs) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", args.input.display()))
}

/// Run the validate subcommand.
pub async fn run(args: &ValidateArgs, ctx: &CommandContext) -> anyhow::Result<Outcome> {
    let input = read_input(args)?;
    let (proposed, persisted): (Document, Option<&Document>) = match &args.patch {
        Some(id) => {
            let persisted = ctx.workspace.document(id)?;
            (merge_patch(persisted, &input)?, Some(persisted))
        }
        None => {
            let proposed: Document = serde_json::from_value(input)?;
            let persisted = ctx.workspace.document(proposed.id.as_str()).ok();
            (proposed, persisted)
        }
    };

    let roles = ctx.workspace.roles(args.user.as_deref(), persisted.unwrap_or(&proposed));
    let mut vctx = ValidationContext::new(roles, ctx.now);
    if let Some(stage) = args.stage {
        vctx = vctx.with_target(stage);
    }
    tracing::info!(
        document_id = %proposed.id,
        patch = args.patch.is_some(),
        offline = args.offline,
        "validating document"
    );

    if args.offline {
        return match validate_document_sync(proposed, persisted, &vctx, &ctx.config) {
            Ok(validated) => Outcome::ok(json!({ "valid": true, "result": validated })),
            Err(errors) => Outcome::failed(json!({ "valid": false, "issues": errors.issues() })),
        };
    }

    match ctx.validator().validate_document(proposed, persisted, &vctx).await {
        Ok(validated) => Outcome::ok(json!({ "valid": true, "result": validated })),
        Err(PipelineError::Invalid(errors)) => {
            Outcome::failed(json!({ "valid": false, "issues": errors.issues() }))
        }
        Err(PipelineError::Lookup(e)) => Err(e.into()),
    }
}
