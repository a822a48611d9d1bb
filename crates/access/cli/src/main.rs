//! Civic Access CLI - operator interface to the mission access core
//!
//! - Inspect the mission catalog
//! - Preview or record unlock attempts for a user
//! - Forward replay and feedback facts to the ledger
//! - Query the ledger and aggregate statistics

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use access_orchestrator::AccessConfig;
use commands::{access, ledger, missions, SessionArgs};

/// Civic Access CLI application
#[derive(Parser, Debug)]
#[command(name = "civic-access")]
#[command(about = "Civic Access - mission eligibility and access ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML, YAML or JSON)
    #[arg(short, long, env = "CIVIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    session: SessionArgs,

    /// Output format
    #[arg(short, long, default_value = "json")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect the mission catalog
    Missions {
        #[command(subcommand)]
        command: missions::MissionCommands,
    },

    /// Evaluate users and record access decisions
    #[command(flatten)]
    Access(access::AccessCommands),

    /// Query the access ledger
    Ledger {
        #[command(subcommand)]
        command: ledger::LedgerCommands,
    },

    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AccessConfig::load(cli.config.as_deref()).context("loading configuration")?;

    if let Commands::Config = cli.command {
        return output::print_single(&config, cli.output);
    }

    let orchestrator = commands::open(&cli.session, &config)?;
    match cli.command {
        Commands::Missions { command } => missions::execute(command, &orchestrator, cli.output),
        Commands::Access(command) => access::execute(command, &orchestrator, cli.output),
        Commands::Ledger { command } => ledger::execute(command, &orchestrator, cli.output),
        Commands::Config => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use access_types::Tier;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_attempt_arguments() {
        let cli = Cli::try_parse_from([
            "civic-access",
            "--ledger",
            "/tmp/ledger.jsonl",
            "attempt",
            "--mission",
            "verifier-onboarding",
            "--user",
            "ada",
            "--tier",
            "Verifier",
            "--trust",
            "72",
            "--replay",
            "orientation:trace-1",
            "--badge",
            "peer-review",
        ])
        .unwrap();

        assert_eq!(cli.session.ledger, Some(PathBuf::from("/tmp/ledger.jsonl")));
        let Commands::Access(access::AccessCommands::Attempt { mission, user }) = cli.command else {
            panic!("expected attempt command");
        };
        assert_eq!(mission, "verifier-onboarding");
        let context = user.to_context();
        assert_eq!(context.tier, Tier::Verifier);
        assert_eq!(context.trust_score, 72);
        assert_eq!(context.replay_history.len(), 1);
        assert_eq!(context.feedback_badges, vec!["peer-review".to_string()]);
    }

    #[test]
    fn test_unknown_tier_is_rejected() {
        let parsed = Cli::try_parse_from([
            "civic-access",
            "check",
            "--mission",
            "orientation",
            "--user",
            "ada",
            "--tier",
            "mayor",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_ledger_query_status_filter() {
        let cli = Cli::try_parse_from([
            "civic-access",
            "ledger",
            "query",
            "--status",
            "replay_required",
            "--limit",
            "5",
        ])
        .unwrap();
        let Commands::Ledger {
            command: ledger::LedgerCommands::Query { status, limit, .. },
        } = cli.command
        else {
            panic!("expected ledger query");
        };
        assert_eq!(status, Some(access_types::AccessStatus::ReplayRequired));
        assert_eq!(limit, 5);
    }

    #[test]
    fn test_override_requires_granting_tier() {
        let base = [
            "civic-access",
            "override",
            "--mission",
            "town-hall",
            "--user",
            "ada",
            "--granted-by",
            "root",
            "--reason",
            "pilot cohort",
        ];
        assert!(Cli::try_parse_from(base).is_err());

        let cli = Cli::try_parse_from(
            base.iter()
                .copied()
                .chain(["--granted-by-tier", "administrator"]),
        )
        .unwrap();
        let Commands::Access(access::AccessCommands::Override {
            granted_by,
            granted_by_tier,
            ..
        }) = cli.command
        else {
            panic!("expected override command");
        };
        assert_eq!(granted_by, "root");
        assert_eq!(granted_by_tier, Tier::Administrator);
    }
}
