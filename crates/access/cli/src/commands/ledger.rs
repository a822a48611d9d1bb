//! Ledger queries and statistics.

use crate::output::{print_single, OutputFormat};
use access_ledger::LedgerQuery;
use access_orchestrator::UnlockOrchestrator;
use access_types::{AccessStatus, MissionId, UserId};
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum LedgerCommands {
    /// List entries, newest first
    Query {
        #[arg(long)]
        mission: Option<String>,
        #[arg(long)]
        user: Option<String>,
        /// Status filter, e.g. unlocked or replay_required
        #[arg(long)]
        status: Option<AccessStatus>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show the latest entry for a (mission, user) pair
    Current {
        #[arg(long)]
        mission: String,
        #[arg(long)]
        user: String,
    },

    /// Aggregate access statistics
    Stats,
}

pub fn execute(
    command: LedgerCommands,
    orchestrator: &UnlockOrchestrator,
    format: OutputFormat,
) -> Result<()> {
    match command {
        LedgerCommands::Query {
            mission,
            user,
            status,
            limit,
        } => {
            let query = LedgerQuery {
                mission_id: mission.map(MissionId::new),
                user_id: user.map(UserId::new),
                status,
                limit: Some(limit),
            };
            print_single(&orchestrator.ledger().query(&query)?, format)
        }
        LedgerCommands::Current { mission, user } => {
            let entry = orchestrator
                .ledger()
                .current(&MissionId::new(mission), &UserId::new(user))?;
            print_single(&entry, format)
        }
        LedgerCommands::Stats => print_single(&orchestrator.get_mission_access_statistics()?, format),
    }
}
