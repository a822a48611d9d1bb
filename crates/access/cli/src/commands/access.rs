//! Eligibility checks and ledger writes.

use super::UserArgs;
use crate::output::{print_single, OutputFormat};
use access_orchestrator::UnlockOrchestrator;
use access_types::{MissionId, Tier, UserContext, UserId};
use anyhow::{bail, Result};
use clap::Subcommand;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum AccessCommands {
    /// Evaluate a user against a mission without recording anything
    Check {
        /// Mission id
        #[arg(long)]
        mission: String,
        #[command(flatten)]
        user: UserArgs,
    },

    /// Evaluate and record the verdict in the ledger
    Attempt {
        /// Mission id
        #[arg(long)]
        mission: String,
        #[command(flatten)]
        user: UserArgs,
    },

    /// Every mission with the user's eligibility and latest ledger entry
    Overview {
        #[command(flatten)]
        user: UserArgs,
    },

    /// Record a replay verdict for a (mission, user) pair
    Replay {
        #[arg(long)]
        mission: String,
        #[arg(long)]
        user: String,
        /// Replay trace hash
        #[arg(long)]
        trace: String,
        /// Mark the replay as failed validation
        #[arg(long)]
        invalid: bool,
    },

    /// Record a feedback badge and/or a verified vote
    Feedback {
        #[arg(long)]
        mission: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        badge: Option<String>,
        /// Vote verification outcome
        #[arg(long)]
        vote: Option<bool>,
    },

    /// Mark an unlocked mission as completed
    Complete {
        #[arg(long)]
        mission: String,
        #[arg(long)]
        user: String,
    },

    /// Grant access regardless of requirements (administrators only)
    Override {
        #[arg(long)]
        mission: String,
        #[command(flatten)]
        user: UserArgs,
        /// Id of the granting administrator
        #[arg(long)]
        granted_by: String,
        /// Tier of the granting user; must be stated explicitly
        #[arg(long)]
        granted_by_tier: Tier,
        #[arg(long)]
        reason: String,
    },
}

pub fn execute(
    command: AccessCommands,
    orchestrator: &UnlockOrchestrator,
    format: OutputFormat,
) -> Result<()> {
    match command {
        AccessCommands::Check { mission, user } => {
            let result =
                orchestrator.check_unlock_eligibility(&MissionId::new(mission), &user.to_context())?;
            print_single(&result, format)
        }
        AccessCommands::Attempt { mission, user } => {
            let attempt = orchestrator.attempt_unlock(&MissionId::new(mission), &user.to_context())?;
            print_single(&attempt, format)?;
            if let Some(error) = attempt.error {
                bail!("attempt was not recorded: {error}");
            }
            Ok(())
        }
        AccessCommands::Overview { user } => {
            let overview = orchestrator.get_user_missions_overview(&user.to_context())?;
            print_single(&overview, format)
        }
        AccessCommands::Replay {
            mission,
            user,
            trace,
            invalid,
        } => {
            let entry = orchestrator.update_via_replay(
                &MissionId::new(mission),
                &UserId::new(user),
                &trace,
                !invalid,
            )?;
            report_update(entry, format)
        }
        AccessCommands::Feedback {
            mission,
            user,
            badge,
            vote,
        } => {
            if badge.is_none() && vote.is_none() {
                bail!("pass --badge and/or --vote");
            }
            let entry = orchestrator.update_via_feedback(
                &MissionId::new(mission),
                &UserId::new(user),
                badge,
                vote,
            )?;
            report_update(entry, format)
        }
        AccessCommands::Complete { mission, user } => {
            let entry = orchestrator.mark_completed(&MissionId::new(mission), &UserId::new(user))?;
            print_single(&entry, format)
        }
        AccessCommands::Override {
            mission,
            user,
            granted_by,
            granted_by_tier,
            reason,
        } => {
            let admin = UserContext::new(granted_by, granted_by_tier, 100);
            let attempt = orchestrator.grant_override(
                &MissionId::new(mission),
                &user.to_context(),
                &admin,
                &reason,
            )?;
            print_single(&attempt, format)
        }
    }
}

fn report_update(
    entry: Option<access_types::LedgerEntry>,
    format: OutputFormat,
) -> Result<()> {
    match entry {
        Some(entry) => print_single(&entry, format),
        None => {
            info!("Nothing recorded: invalid replay or no prior attempt for this pair");
            Ok(())
        }
    }
}
