//! Aggregate views over catalog, ledger and attempt history.

use access_ledger::LedgerStatistics;
use access_types::{
    AttemptResult, BlockerType, EligibilityResult, LedgerEntry, MissionDefinition, Tier,
    UnlockAttempt, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One catalog mission as seen by one user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MissionOverview {
    pub mission: MissionDefinition,
    pub eligibility: EligibilityResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_entry: Option<LedgerEntry>,
}

/// Every catalog mission for one user, in catalog order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MissionsOverview {
    pub user_id: UserId,
    pub missions: Vec<MissionOverview>,
    pub total: usize,
    pub unlocked: usize,
    pub blocked: usize,
}

impl MissionsOverview {
    pub fn new(user_id: UserId, missions: Vec<MissionOverview>) -> Self {
        let unlocked = missions
            .iter()
            .filter(|overview| overview.eligibility.is_unlocked)
            .count();
        Self {
            user_id,
            total: missions.len(),
            blocked: missions.len() - unlocked,
            unlocked,
            missions,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockerFrequency {
    pub blocker_type: BlockerType,
    pub count: usize,
}

/// Cross-user aggregation of retained attempts plus ledger statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccessStatistics {
    pub total_attempts: usize,
    pub by_result: HashMap<AttemptResult, usize>,
    /// Most frequent blocker types, most frequent first.
    pub top_blockers: Vec<BlockerFrequency>,
    pub tier_distribution: HashMap<Tier, usize>,
    pub recent_attempts: usize,
    pub recent_window_hours: i64,
    pub ledger: LedgerStatistics,
}

impl AccessStatistics {
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.by_result
            .get(&AttemptResult::Success)
            .copied()
            .unwrap_or(0) as f64
            / self.total_attempts as f64
    }
}

/// Folds attempts into an [`AccessStatistics`].
pub(crate) struct StatisticsBuilder {
    stats: AccessStatistics,
    blocker_counts: HashMap<BlockerType, usize>,
    window_start: DateTime<Utc>,
    top_blockers: usize,
}

impl StatisticsBuilder {
    pub(crate) fn new(window_start: DateTime<Utc>, window_hours: i64, top_blockers: usize) -> Self {
        Self {
            stats: AccessStatistics {
                recent_window_hours: window_hours,
                ..Default::default()
            },
            blocker_counts: HashMap::new(),
            window_start,
            top_blockers,
        }
    }

    pub(crate) fn add(&mut self, attempt: &UnlockAttempt) {
        self.stats.total_attempts += 1;
        *self.stats.by_result.entry(attempt.result).or_insert(0) += 1;
        *self
            .stats
            .tier_distribution
            .entry(attempt.context.tier)
            .or_insert(0) += 1;
        for blocker in &attempt.blockers {
            *self.blocker_counts.entry(blocker.blocker_type).or_insert(0) += 1;
        }
        if attempt.timestamp >= self.window_start {
            self.stats.recent_attempts += 1;
        }
    }

    pub(crate) fn finish(mut self, ledger: LedgerStatistics) -> AccessStatistics {
        let mut ranked: Vec<BlockerFrequency> = self
            .blocker_counts
            .into_iter()
            .map(|(blocker_type, count)| BlockerFrequency {
                blocker_type,
                count,
            })
            .collect();
        // Ties break on blocker type so the ranking is deterministic.
        ranked.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.blocker_type.cmp(&b.blocker_type))
        });
        ranked.truncate(self.top_blockers);

        self.stats.top_blockers = ranked;
        self.stats.ledger = ledger;
        self.stats
    }
}
