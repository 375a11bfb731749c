//! # Status Subcommand
//!
//! Compares each document's stored status with the status derived from
//! its containers, following successor chains across the workspace.

use clap::Args;
use serde::Serialize;

use bsff_core::{DocumentId, DocumentStatus};
use bsff_state::{derive_document_status, SuccessorIndex};

use crate::{CommandContext, Outcome};

/// Arguments for the status subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Document ids; every stored document when omitted.
    pub ids: Vec<String>,

    /// Fail when a stored status differs from the derived one.
    #[arg(long)]
    pub check: bool,
}

/// Stored and derived status of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLine {
    /// Document id.
    pub id: DocumentId,
    /// Status held by the document.
    pub stored: DocumentStatus,
    /// Status derived from its containers.
    pub derived: DocumentStatus,
}

/// Run the status subcommand.
pub fn run(args: &StatusArgs, ctx: &CommandContext) -> anyhow::Result<Outcome> {
    let documents = &ctx.workspace.documents;
    let index = SuccessorIndex::from_documents(documents.iter());
    let selected = if args.ids.is_empty() {
        documents.iter().collect()
    } else {
        args.ids
            .iter()
            .map(|id| ctx.workspace.document(id))
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    let lines: Vec<StatusLine> = selected
        .into_iter()
        .map(|d| StatusLine {
            id: d.id.clone(),
            stored: d.status,
            derived: derive_document_status(d, &index),
        })
        .collect();
    let drifted = lines.iter().filter(|l| l.stored != l.derived).count();
    if drifted > 0 {
        tracing::warn!(drifted, "stored statuses differ from derived statuses");
    }
    if args.check && drifted > 0 {
        Outcome::failed(lines)
    } else {
        Outcome::ok(lines)
    }
}
