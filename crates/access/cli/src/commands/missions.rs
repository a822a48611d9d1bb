//! Catalog inspection.

use crate::output::{print_single, OutputFormat};
use access_orchestrator::UnlockOrchestrator;
use access_types::MissionId;
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum MissionCommands {
    /// List every mission in the catalog
    List,

    /// Show a single mission
    Get {
        /// Mission id
        id: String,
    },
}

pub fn execute(
    command: MissionCommands,
    orchestrator: &UnlockOrchestrator,
    format: OutputFormat,
) -> Result<()> {
    match command {
        MissionCommands::List => print_single(&orchestrator.catalog().list_all(), format),
        MissionCommands::Get { id } => {
            let mission = orchestrator.catalog().get(&MissionId::new(id))?;
            print_single(mission, format)
        }
    }
}
