//! # Sign Subcommand
//!
//! Validates a stored document at a stage and records the signature. With
//! `--write`, the signed document and the successor pointer updates are
//! saved back to the workspace.

use clap::Args;
use serde_json::json;

use bsff_core::{ContainerId, Timestamp};
use bsff_state::{Signature, Stage};
use bsff_validation::{sign, PipelineError, SignRequest, ValidationContext, WorkflowError};

use crate::{parse_stage, parse_timestamp, CommandContext, Outcome};

/// Arguments for the sign subcommand.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Stored document id.
    pub id: String,

    /// Stage to sign.
    #[arg(long, value_parser = parse_stage)]
    pub stage: Stage,

    /// Single container, for acceptance and operation.
    #[arg(long, value_name = "ID")]
    pub container: Option<String>,

    /// Name of the signing person.
    #[arg(long)]
    pub author: String,

    /// Signature date; defaults to the evaluation instant.
    #[arg(long, value_parser = parse_timestamp)]
    pub date: Option<Timestamp>,

    /// Acting user, resolved through the workspace members.
    #[arg(long)]
    pub user: Option<String>,

    /// Save the result to the workspace file.
    #[arg(long)]
    pub write: bool,
}

/// Run the sign subcommand.
pub async fn run(args: &SignArgs, ctx: &mut CommandContext) -> anyhow::Result<Outcome> {
    let document = ctx.workspace.document(&args.id)?.clone();
    let roles = ctx.workspace.roles(args.user.as_deref(), &document);
    let request = SignRequest {
        stage: args.stage,
        container: args.container.clone().map(ContainerId),
        signature: Signature {
            author: args.author.clone(),
            date: args.date.unwrap_or(ctx.now),
        },
    };

    let signed = match sign(&ctx.validator(), &document, request, ValidationContext::new(roles, ctx.now)).await {
        Ok(signed) => signed,
        Err(WorkflowError::Pipeline(PipelineError::Invalid(errors))) => {
            return Outcome::failed(json!({ "signed": false, "issues": errors.issues() }));
        }
        Err(WorkflowError::Signature(e)) => {
            return Outcome::failed(json!({ "signed": false, "error": e.to_string() }));
        }
        Err(WorkflowError::Pipeline(PipelineError::Lookup(e))) => return Err(e.into()),
    };

    if args.write {
        let store = ctx.workspace.store();
        store.insert_document(signed.document.clone());
        store.apply_plan(&signed.plan);
        ctx.workspace.sync_from(&store);
        ctx.workspace.save(&ctx.workspace_path)?;
        tracing::info!(
            document_id = %signed.document.id,
            path = %ctx.workspace_path.display(),
            "workspace updated"
        );
    }

    Outcome::ok(json!({
        "signed": true,
        "status": signed.document.status,
        "document": signed.document,
        "plan": signed.plan,
    }))
}
