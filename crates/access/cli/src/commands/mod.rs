//! Command implementations and the session they share.

pub mod access;
pub mod ledger;
pub mod missions;

use access_catalog::MissionCatalog;
use access_ledger::{AccessLedger, JsonlFileSink};
use access_orchestrator::{AccessConfig, UnlockOrchestrator};
use access_types::{ReplayRecord, Tier, UserContext};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Sources every command builds its orchestrator from.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Mission catalog (YAML or JSON); the built-in civic missions when omitted
    #[arg(long, env = "CIVIC_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// JSONL ledger journal; replayed on start and appended to
    #[arg(long, env = "CIVIC_LEDGER")]
    pub ledger: Option<PathBuf>,
}

/// User context assembled from flags.
#[derive(Args, Debug, Clone)]
pub struct UserArgs {
    /// User id
    #[arg(long)]
    pub user: String,

    /// Civic tier (citizen, verifier, moderator, governor, administrator)
    #[arg(long, default_value = "citizen")]
    pub tier: Tier,

    /// Trust score, 0-100
    #[arg(long, default_value_t = 0)]
    pub trust: u8,

    /// Validated replay as MISSION:TRACE_HASH (repeatable)
    #[arg(long = "replay", value_parser = parse_replay)]
    pub replays: Vec<ReplayRecord>,

    /// Feedback badge id (repeatable)
    #[arg(long = "badge")]
    pub badges: Vec<String>,

    /// Verified votes cast
    #[arg(long, default_value_t = 0)]
    pub votes: u32,
}

impl UserArgs {
    pub fn to_context(&self) -> UserContext {
        let mut context = UserContext::new(self.user.clone(), self.tier, self.trust)
            .with_verified_votes(self.votes);
        for record in &self.replays {
            context = context.with_replay(record.clone());
        }
        for badge in &self.badges {
            context = context.with_badge(badge.clone());
        }
        context
    }
}

fn parse_replay(raw: &str) -> Result<ReplayRecord, String> {
    match raw.split_once(':') {
        Some((mission, trace)) if !mission.trim().is_empty() && !trace.trim().is_empty() => {
            Ok(ReplayRecord::valid(mission.trim(), trace.trim()))
        }
        _ => Err(format!("expected MISSION:TRACE_HASH, got '{raw}'")),
    }
}

/// Build the orchestrator for one CLI invocation.
pub fn open(session: &SessionArgs, config: &AccessConfig) -> Result<UnlockOrchestrator> {
    let catalog = match &session.catalog {
        Some(path) => MissionCatalog::from_path(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => MissionCatalog::with_defaults(),
    };

    let ledger = match &session.ledger {
        Some(path) => {
            let restored = AccessLedger::restore_jsonl(path, config.ledger.clone())
                .with_context(|| format!("restoring ledger {}", path.display()))?;
            let sink = JsonlFileSink::open(path)
                .with_context(|| format!("opening ledger {}", path.display()))?;
            restored.with_sink(Arc::new(sink))
        }
        None => AccessLedger::with_config(config.ledger.clone()),
    };
    debug!(missions = catalog.len(), entries = ledger.len(), "Session opened");

    Ok(UnlockOrchestrator::new(Arc::new(catalog), Arc::new(ledger)).with_config(config.clone()))
}
