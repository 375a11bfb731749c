//! # bsff CLI Entry Point
//!
//! Parses arguments, sets up logging, loads the configuration and the
//! workspace, and dispatches to the handler modules.
//!
//! Exit codes: `0` success, `1` validation or signature refused, `2` any
//! other error.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bsff_cli::fields::FieldsArgs;
use bsff_cli::sign::SignArgs;
use bsff_cli::status::StatusArgs;
use bsff_cli::validate::ValidateArgs;
use bsff_cli::workspace::Workspace;
use bsff_cli::{parse_timestamp, CommandContext, Outcome};
use bsff_core::{EngineConfig, Timestamp};

/// Fluid-waste shipment document engine.
///
/// Validates documents and patches, reports required and sealed fields,
/// derives statuses and records signatures against a JSON workspace.
#[derive(Parser, Debug)]
#[command(name = "bsff", version, about)]
struct Cli {
    /// Workspace file.
    #[arg(long, short, global = true, default_value = "bsff-workspace.json")]
    workspace: PathBuf,

    /// Engine configuration (YAML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Evaluation instant (RFC 3339, UTC). Defaults to now.
    #[arg(long, global = true, value_parser = parse_timestamp)]
    now: Option<Timestamp>,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate a document or a patch.
    Validate(ValidateArgs),
    /// Required and sealed field paths of a stored document.
    Fields(FieldsArgs),
    /// Stored versus derived document status.
    Status(StatusArgs),
    /// Validate at a stage and record a signature.
    Sign(SignArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.check()?;

    let mut ctx = CommandContext {
        workspace: Workspace::load(&cli.workspace)?,
        workspace_path: cli.workspace.clone(),
        config,
        now: cli.now.unwrap_or_else(Timestamp::now),
    };

    match &cli.command {
        Commands::Validate(args) => bsff_cli::validate::run(args, &ctx).await,
        Commands::Fields(args) => bsff_cli::fields::run(args, &ctx),
        Commands::Status(args) => bsff_cli::status::run(args, &ctx),
        Commands::Sign(args) => bsff_cli::sign::run(args, &mut ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match run(cli).await {
        Ok(outcome) => {
            match serde_json::to_string_pretty(&outcome.body) {
                Ok(body) => println!("{body}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    return ExitCode::from(2);
                }
            }
            if outcome.ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bsff", "status", "FF-1", "--check", "-vv", "--workspace", "ws.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.workspace, PathBuf::from("ws.json"));
        assert!(matches!(cli.command, Commands::Status(ref a) if a.check && a.ids == ["FF-1"]));
    }

    #[test]
    fn test_sign_requires_stage_and_author() {
        assert!(Cli::try_parse_from(["bsff", "sign", "FF-1", "--author", "Jane"]).is_err());
        let cli = Cli::try_parse_from([
            "bsff", "sign", "FF-1", "--stage", "transport_2", "--author", "Jane",
        ])
        .unwrap();
        let Commands::Sign(args) = cli.command else {
            panic!("expected sign");
        };
        assert_eq!(args.stage, bsff_state::Stage::Transport(2));
        assert!(!args.write);
    }

    #[test]
    fn test_validate_offline_patch() {
        let cli = Cli::try_parse_from([
            "bsff", "validate", "patch.json", "--patch", "FF-1", "--offline", "--stage", "emission",
        ])
        .unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.patch.as_deref(), Some("FF-1"));
        assert!(args.offline);
        assert_eq!(args.stage, Some(bsff_state::Stage::Emission));
    }
}
