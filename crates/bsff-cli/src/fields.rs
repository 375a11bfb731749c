//! # Fields Subcommand
//!
//! Lists the required and sealed field paths of a stored document, for
//! clients deciding what to display as mandatory or locked.

use clap::Args;
use serde_json::json;

use bsff_state::{document_stage, required_and_sealed_field_paths, RuleContext, Stage, DOCUMENT_STAGES};

use crate::{parse_stage, CommandContext, Outcome};

/// Arguments for the fields subcommand.
#[derive(Args, Debug)]
pub struct FieldsArgs {
    /// Stored document id.
    pub id: String,

    /// Stage to evaluate against; defaults to the stage the document reached.
    #[arg(long, value_parser = parse_stage)]
    pub stage: Option<Stage>,

    /// Acting user, resolved through the workspace members.
    #[arg(long)]
    pub user: Option<String>,
}

/// Run the fields subcommand.
pub fn run(args: &FieldsArgs, ctx: &CommandContext) -> anyhow::Result<Outcome> {
    let document = ctx.workspace.document(&args.id)?;
    let stage = args.stage.or_else(|| document_stage(document));
    let roles = ctx.workspace.roles(args.user.as_deref(), document);
    let rules = RuleContext::new(roles, ctx.now, &ctx.config);
    let paths = required_and_sealed_field_paths(document, DOCUMENT_STAGES.ancestor_stages(stage), &rules);
    Outcome::ok(json!({
        "id": document.id,
        "stage": stage,
        "required": paths.required,
        "sealed": paths.sealed,
    }))
}
