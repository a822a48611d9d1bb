//! Civic Access Orchestrator - the write path for mission access.
//!
//! The orchestrator composes the catalog, the eligibility evaluator and the
//! access ledger. It is the only component that appends to the ledger during
//! normal operation:
//!
//! - `attempt_unlock` evaluates a user against a mission and records the verdict
//! - `update_via_replay` / `update_via_feedback` forward external facts
//! - `grant_override` / `mark_completed` cover administrative and terminal transitions
//!
//! Evaluate-then-write is serialized per (mission, user) pair, so the latest
//! ledger entry for a pair always reflects the latest decision. Different
//! pairs proceed concurrently.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod history;
pub mod stats;

pub use config::{AccessConfig, HistoryConfig, StatisticsConfig};
pub use error::{AccessError, AccessResult};
pub use history::AttemptHistory;
pub use stats::{AccessStatistics, BlockerFrequency, MissionOverview, MissionsOverview};

use access_catalog::MissionCatalog;
use access_eligibility::EligibilityEvaluator;
use access_ledger::{AccessLedger, LedgerError, RecordEvent};
use access_types::{
    AccessStatus, AttemptId, AttemptResult, Clock, EligibilityResult, LedgerEntry,
    MissionDefinition, MissionId, PairKey, SystemClock, Tier, UnlockAttempt, UnlockMethod,
    UserContext, UserId,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use stats::StatisticsBuilder;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Coordinates evaluation, ledger writes and attempt history.
pub struct UnlockOrchestrator {
    catalog: Arc<MissionCatalog>,
    ledger: Arc<AccessLedger>,
    evaluator: EligibilityEvaluator,
    config: AccessConfig,
    clock: Arc<dyn Clock>,
    /// One mutex per (mission, user) pair with a write in flight.
    pair_locks: DashMap<PairKey, Arc<Mutex<()>>>,
    histories: DashMap<UserId, Arc<Mutex<AttemptHistory>>>,
}

impl UnlockOrchestrator {
    pub fn new(catalog: Arc<MissionCatalog>, ledger: Arc<AccessLedger>) -> Self {
        Self {
            catalog,
            ledger,
            evaluator: EligibilityEvaluator::new(),
            config: AccessConfig::default(),
            clock: Arc::new(SystemClock),
            pair_locks: DashMap::new(),
            histories: DashMap::new(),
        }
    }

    /// Build an orchestrator with an in-memory ledger sized by `config`.
    pub fn from_config(catalog: Arc<MissionCatalog>, config: AccessConfig) -> Self {
        let ledger = Arc::new(AccessLedger::with_config(config.ledger.clone()));
        Self::new(catalog, ledger).with_config(config)
    }

    pub fn with_config(mut self, config: AccessConfig) -> Self {
        self.config = config;
        self
    }

    /// Clock used for attempt timestamps and the statistics window.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &MissionCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &Arc<AccessLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Run `f` while holding the (mission, user) lock.
    ///
    /// The map entry is dropped again once no other caller holds or waits on
    /// it, so the lock table only tracks pairs with writes in flight.
    fn with_pair_lock<T>(
        &self,
        pair: &PairKey,
        f: impl FnOnce() -> AccessResult<T>,
    ) -> AccessResult<T> {
        // Clone out of the map so no shard lock is held while waiting.
        let lock = self.pair_locks.entry(pair.clone()).or_default().clone();
        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(AccessError::Internal("pair lock poisoned".to_string())),
        };
        drop(lock);
        // Clones are only handed out under the shard lock, so a count of one
        // means nobody else can be holding this mutex.
        self.pair_locks
            .remove_if(pair, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    fn mission(&self, mission_id: &MissionId) -> AccessResult<&MissionDefinition> {
        Ok(self.catalog.get(mission_id)?)
    }

    fn remember(&self, attempt: UnlockAttempt) {
        let history = self
            .histories
            .entry(attempt.user_id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(AttemptHistory::new(
                    self.config.history.max_attempts_per_user,
                )))
            })
            .clone();
        // History is advisory; a poisoned buffer is still usable.
        let mut history = history.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        history.push(attempt);
    }

    /// Append the attempt's verdict. A pair that already grants access keeps
    /// its status and unlock method whatever the fresh evaluation says.
    fn record_attempt(
        &self,
        mission: &MissionDefinition,
        user: &UserContext,
        eligibility: &EligibilityResult,
    ) -> Result<(LedgerEntry, bool), LedgerError> {
        let retained = self
            .ledger
            .current(&mission.id, &user.user_id)?
            .filter(|entry| entry.status.grants_access());

        let (status, method) = match &retained {
            Some(prior) => (prior.status, prior.unlocked_via),
            None => (eligibility.status, eligibility.unlocked_via.unwrap_or_default()),
        };

        let facts = user.facts_for(mission);
        let mut event = RecordEvent::new(mission.id.clone(), user.user_id.clone(), status)
            .with_requirements(mission.requirements.clone())
            .with_facts(&facts, user.feedback_badges.last().cloned())
            .with_unlocked_via(method);
        let trace = user
            .valid_replay_of(mission.replay_target())
            .map(|replay| replay.trace_hash.clone())
            .or_else(|| retained.as_ref().and_then(|prior| prior.source_trace_hash.clone()));
        if let Some(trace) = trace {
            event = event.with_trace(trace);
        }
        if let Some(prior) = &retained {
            event.replay_validated |= prior.metadata.replay_validated;
            if !eligibility.is_unlocked {
                event = event.with_note("access retained from an earlier grant");
            }
        }

        let entry = self.ledger.record_event(event)?;
        Ok((entry, retained.is_some()))
    }

    /// Evaluate `user` against the mission and record the verdict.
    ///
    /// A pair that is already unlocked or completed never moves back to a
    /// blocked status here. A ledger fault does not fail the call: the attempt
    /// comes back with [`AttemptResult::Error`], no entry id, and the computed
    /// eligibility.
    pub fn attempt_unlock(
        &self,
        mission_id: &MissionId,
        user: &UserContext,
    ) -> AccessResult<UnlockAttempt> {
        user.validate()?;
        let mission = self.mission(mission_id)?;
        let pair = PairKey::new(mission_id, &user.user_id);

        let (eligibility, recorded) = self.with_pair_lock(&pair, || {
            let eligibility = self.evaluator.evaluate(mission, user);
            let recorded = self.record_attempt(mission, user, &eligibility);
            Ok((eligibility, recorded))
        })?;

        let (result, method, entry_id, error) = match recorded {
            Ok((entry, retained)) => {
                let result = if entry.status.grants_access() {
                    AttemptResult::Success
                } else {
                    AttemptResult::Blocked
                };
                if retained {
                    debug!(
                        mission_id = %mission_id,
                        user_id = %user.user_id,
                        status = %entry.status,
                        "Existing grant retained"
                    );
                }
                (result, entry.unlocked_via, Some(entry.entry_id), None)
            }
            Err(err) => {
                warn!(
                    mission_id = %mission_id,
                    user_id = %user.user_id,
                    error = %err,
                    "Unlock attempt could not be recorded"
                );
                let method = eligibility.unlocked_via.unwrap_or_default();
                (AttemptResult::Error, method, None, Some(err.to_string()))
            }
        };

        if result == AttemptResult::Success {
            info!(
                mission_id = %mission_id,
                user_id = %user.user_id,
                unlocked_via = %method,
                "Mission unlocked"
            );
        } else {
            debug!(
                mission_id = %mission_id,
                user_id = %user.user_id,
                result = result.as_str(),
                status = %eligibility.status,
                "Unlock attempt finished"
            );
        }

        let blockers = if result == AttemptResult::Success {
            vec![]
        } else {
            eligibility.blockers.clone()
        };
        let attempt = UnlockAttempt {
            attempt_id: AttemptId::generate(),
            mission_id: mission.id.clone(),
            user_id: user.user_id.clone(),
            timestamp: self.clock.now(),
            result,
            blockers,
            method,
            entry_id,
            error,
            context: user.clone(),
            eligibility,
        };
        self.remember(attempt.clone());
        Ok(attempt)
    }

    /// Evaluation only; writes neither the ledger nor attempt history.
    pub fn check_unlock_eligibility(
        &self,
        mission_id: &MissionId,
        user: &UserContext,
    ) -> AccessResult<EligibilityResult> {
        user.validate()?;
        let mission = self.mission(mission_id)?;
        Ok(self.evaluator.evaluate(mission, user))
    }

    /// Forward a replay verdict to the ledger.
    pub fn update_via_replay(
        &self,
        mission_id: &MissionId,
        user_id: &UserId,
        replay_trace_hash: &str,
        replay_valid: bool,
    ) -> AccessResult<Option<LedgerEntry>> {
        self.mission(mission_id)?;
        self.with_pair_lock(&PairKey::new(mission_id, user_id), || {
            Ok(self
                .ledger
                .update_via_replay(mission_id, user_id, replay_trace_hash, replay_valid)?)
        })
    }

    /// Forward a feedback badge and/or vote verification to the ledger.
    pub fn update_via_feedback(
        &self,
        mission_id: &MissionId,
        user_id: &UserId,
        feedback_badge: Option<String>,
        vote_verified: Option<bool>,
    ) -> AccessResult<Option<LedgerEntry>> {
        self.mission(mission_id)?;
        self.with_pair_lock(&PairKey::new(mission_id, user_id), || {
            Ok(self
                .ledger
                .update_via_feedback(mission_id, user_id, feedback_badge, vote_verified)?)
        })
    }

    /// Unlock a mission for `target` regardless of its requirements.
    ///
    /// Only an Administrator may grant overrides.
    pub fn grant_override(
        &self,
        mission_id: &MissionId,
        target: &UserContext,
        granted_by: &UserContext,
        reason: &str,
    ) -> AccessResult<UnlockAttempt> {
        target.validate()?;
        granted_by.validate()?;
        if granted_by.tier != Tier::Administrator {
            warn!(
                mission_id = %mission_id,
                user_id = %target.user_id,
                granted_by = %granted_by.user_id,
                tier = %granted_by.tier,
                "Override rejected"
            );
            return Err(AccessError::Unauthorized(format!(
                "{} holds tier {}, overrides require {}",
                granted_by.user_id,
                granted_by.tier,
                Tier::Administrator
            )));
        }
        let mission = self.mission(mission_id)?;

        let (eligibility, entry) =
            self.with_pair_lock(&PairKey::new(mission_id, &target.user_id), || {
                let eligibility = self.evaluator.evaluate(mission, target);
                let facts = target.facts_for(mission);
                let event = RecordEvent::new(
                    mission.id.clone(),
                    target.user_id.clone(),
                    AccessStatus::Unlocked,
                )
                .with_requirements(mission.requirements.clone())
                .with_facts(&facts, target.feedback_badges.last().cloned())
                .with_unlocked_via(UnlockMethod::AdminOverride)
                .with_note(format!("override by {}: {}", granted_by.user_id, reason));
                Ok((eligibility, self.ledger.record_event(event)?))
            })?;

        info!(
            mission_id = %mission_id,
            user_id = %target.user_id,
            granted_by = %granted_by.user_id,
            reason,
            "Access granted by override"
        );

        let attempt = UnlockAttempt {
            attempt_id: AttemptId::generate(),
            mission_id: mission.id.clone(),
            user_id: target.user_id.clone(),
            timestamp: self.clock.now(),
            result: AttemptResult::Success,
            blockers: vec![],
            method: UnlockMethod::AdminOverride,
            entry_id: Some(entry.entry_id),
            error: None,
            context: target.clone(),
            eligibility,
        };
        self.remember(attempt.clone());
        Ok(attempt)
    }

    /// Move an unlocked pair to completed.
    pub fn mark_completed(
        &self,
        mission_id: &MissionId,
        user_id: &UserId,
    ) -> AccessResult<LedgerEntry> {
        self.mission(mission_id)?;
        let pair = PairKey::new(mission_id, user_id);

        self.with_pair_lock(&pair, || {
            match self.ledger.mark_completed(mission_id, user_id, None) {
                Ok(Some(entry)) => Ok(entry),
                Ok(None) => Err(AccessError::NotUnlocked(format!(
                    "{pair} has no access history"
                ))),
                Err(LedgerError::InvalidStateTransition(reason)) => {
                    Err(AccessError::NotUnlocked(reason))
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    /// Retained attempts for the user, oldest first.
    pub fn attempt_history(&self, user_id: &UserId) -> Vec<UnlockAttempt> {
        let Some(history) = self.histories.get(user_id).map(|h| h.value().clone()) else {
            return vec![];
        };
        let history = history.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        history.to_vec()
    }

    /// Every catalog mission with the user's eligibility and latest entry.
    pub fn get_user_missions_overview(&self, user: &UserContext) -> AccessResult<MissionsOverview> {
        user.validate()?;
        let missions = self
            .catalog
            .list_all()
            .iter()
            .map(|mission| {
                Ok(MissionOverview {
                    eligibility: self.evaluator.evaluate(mission, user),
                    latest_entry: self.ledger.current(&mission.id, &user.user_id)?,
                    mission: mission.clone(),
                })
            })
            .collect::<AccessResult<Vec<_>>>()?;

        Ok(MissionsOverview::new(user.user_id.clone(), missions))
    }

    /// Aggregate retained attempts across users with the ledger statistics.
    pub fn get_mission_access_statistics(&self) -> AccessResult<AccessStatistics> {
        let window_start = self
            .clock
            .now()
            .checked_sub_signed(self.config.statistics.recent_window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut builder = StatisticsBuilder::new(
            window_start,
            self.config.statistics.recent_window_hours,
            self.config.statistics.top_blockers,
        );

        let histories: Vec<_> = self
            .histories
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for history in histories {
            let history = history.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            for attempt in history.iter() {
                builder.add(attempt);
            }
        }

        Ok(builder.finish(self.ledger.statistics()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use access_types::{BlockerType, ManualClock, MissionRequirements, ReplayRecord};
    use chrono::Duration;

    fn catalog() -> Arc<MissionCatalog> {
        let mut catalog = MissionCatalog::new();
        catalog.register([
            MissionDefinition::new("town-hall", "Town Hall")
                .with_requirements(MissionRequirements::new(Tier::Verifier, 50)),
            MissionDefinition::new("archive", "Archive").with_requirements(
                MissionRequirements::new(Tier::Verifier, 50).with_replay_of("town-hall"),
            ),
        ]);
        Arc::new(catalog)
    }

    fn orchestrator() -> (UnlockOrchestrator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let ledger = Arc::new(AccessLedger::new().with_clock(clock.clone()));
        let orchestrator = UnlockOrchestrator::new(catalog(), ledger).with_clock(clock.clone());
        (orchestrator, clock)
    }

    fn mission(id: &str) -> MissionId {
        MissionId::new(id)
    }

    #[test]
    fn test_attempt_records_evaluator_verdict() {
        let (orchestrator, _) = orchestrator();
        let user = UserContext::new("u1", Tier::Citizen, 60);

        let attempt = orchestrator.attempt_unlock(&mission("town-hall"), &user).unwrap();
        assert_eq!(attempt.result, AttemptResult::Blocked);
        assert_eq!(attempt.blockers.len(), 1);
        assert_eq!(attempt.blockers[0].blocker_type, BlockerType::Tier);

        let entry = orchestrator
            .ledger()
            .get(attempt.entry_id.as_ref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, AccessStatus::TierInsufficient);
        assert_eq!(entry.metadata.unlock_attempts, 1);
    }

    #[test]
    fn test_unknown_mission_and_bad_context_are_errors() {
        let (orchestrator, _) = orchestrator();
        let user = UserContext::new("u1", Tier::Citizen, 60);

        assert!(matches!(
            orchestrator.attempt_unlock(&mission("nowhere"), &user),
            Err(AccessError::MissionNotFound(_))
        ));
        assert!(matches!(
            orchestrator.check_unlock_eligibility(&mission("town-hall"), &UserContext::new("", Tier::Citizen, 1)),
            Err(AccessError::InvalidUserContext(_))
        ));
        assert!(orchestrator.attempt_history(&user.user_id).is_empty());
        assert!(orchestrator.ledger().is_empty());
    }

    #[test]
    fn test_check_has_no_side_effects() {
        let (orchestrator, _) = orchestrator();
        let user = UserContext::new("u1", Tier::Verifier, 60);

        let result = orchestrator.check_unlock_eligibility(&mission("town-hall"), &user).unwrap();
        assert!(result.is_unlocked);
        assert!(orchestrator.ledger().is_empty());
        assert!(orchestrator.attempt_history(&user.user_id).is_empty());
    }

    #[test]
    fn test_replay_trace_is_recorded() {
        let (orchestrator, _) = orchestrator();
        let user = UserContext::new("u1", Tier::Verifier, 60)
            .with_replay(ReplayRecord::valid("town-hall", "trace-abc"));

        let attempt = orchestrator.attempt_unlock(&mission("archive"), &user).unwrap();
        assert_eq!(attempt.method, UnlockMethod::MemoryReplay);

        let entry = orchestrator
            .ledger()
            .current(&mission("archive"), &user.user_id)
            .unwrap()
            .unwrap();
        assert_eq!(entry.source_trace_hash.as_deref(), Some("trace-abc"));
        assert!(entry.metadata.replay_validated);
    }

    #[test]
    fn test_override_requires_administrator() {
        let (orchestrator, _) = orchestrator();
        let target = UserContext::new("u1", Tier::Citizen, 5);
        let moderator = UserContext::new("mod", Tier::Moderator, 90);
        let admin = UserContext::new("admin", Tier::Administrator, 90);

        assert!(matches!(
            orchestrator.grant_override(&mission("town-hall"), &target, &moderator, "pilot"),
            Err(AccessError::Unauthorized(_))
        ));
        assert!(orchestrator.ledger().is_empty());

        let attempt = orchestrator
            .grant_override(&mission("town-hall"), &target, &admin, "pilot")
            .unwrap();
        assert_eq!(attempt.method, UnlockMethod::AdminOverride);
        assert!(attempt.succeeded());
        assert!(!attempt.eligibility.is_unlocked);

        let entry = orchestrator
            .ledger()
            .current(&mission("town-hall"), &target.user_id)
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, AccessStatus::Unlocked);
        assert_eq!(entry.unlocked_via, UnlockMethod::AdminOverride);
        assert_eq!(entry.metadata.note.as_deref(), Some("override by admin: pilot"));
    }

    #[test]
    fn test_completion_requires_unlock() {
        let (orchestrator, _) = orchestrator();
        let blocked = UserContext::new("u1", Tier::Citizen, 60);
        let ready = UserContext::new("u2", Tier::Verifier, 60);

        assert!(matches!(
            orchestrator.mark_completed(&mission("town-hall"), &blocked.user_id),
            Err(AccessError::NotUnlocked(_))
        ));
        orchestrator.attempt_unlock(&mission("town-hall"), &blocked).unwrap();
        assert!(matches!(
            orchestrator.mark_completed(&mission("town-hall"), &blocked.user_id),
            Err(AccessError::NotUnlocked(_))
        ));

        orchestrator.attempt_unlock(&mission("town-hall"), &ready).unwrap();
        let entry = orchestrator
            .mark_completed(&mission("town-hall"), &ready.user_id)
            .unwrap();
        assert_eq!(entry.status, AccessStatus::Completed);
        assert_eq!(entry.unlocked_via, UnlockMethod::IdentityTier);
    }

    #[test]
    fn test_statistics_window_and_ranking() {
        let (orchestrator, clock) = orchestrator();
        let citizen = UserContext::new("u1", Tier::Citizen, 10);
        let verifier = UserContext::new("u2", Tier::Verifier, 60);

        orchestrator.attempt_unlock(&mission("archive"), &citizen).unwrap();
        clock.advance(Duration::hours(30));
        orchestrator.attempt_unlock(&mission("town-hall"), &citizen).unwrap();
        orchestrator.attempt_unlock(&mission("town-hall"), &verifier).unwrap();

        let stats = orchestrator.get_mission_access_statistics().unwrap();
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.by_result.get(&AttemptResult::Blocked), Some(&2));
        assert_eq!(stats.by_result.get(&AttemptResult::Success), Some(&1));
        assert_eq!(stats.recent_attempts, 2);
        assert_eq!(stats.tier_distribution.get(&Tier::Citizen), Some(&2));

        // Tier and trust fail twice, replay once.
        assert_eq!(stats.top_blockers.len(), 3);
        assert_eq!(stats.top_blockers[0].blocker_type, BlockerType::Tier);
        assert_eq!(stats.top_blockers[0].count, 2);
        assert_eq!(stats.top_blockers[1].blocker_type, BlockerType::Trust);
        assert_eq!(stats.top_blockers[2].blocker_type, BlockerType::Replay);

        assert_eq!(stats.ledger.total_entries, 3);
        assert_eq!(stats.ledger.recent_activity, 2);
        assert!((stats.success_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_statistics_with_oversized_window() {
        let mut config = AccessConfig::default();
        config.statistics.recent_window_hours = 10_000_000_000;
        config.ledger.recent_window_hours = 10_000_000_000;
        let orchestrator = UnlockOrchestrator::from_config(catalog(), config);
        let user = UserContext::new("u1", Tier::Verifier, 60);

        orchestrator.attempt_unlock(&mission("town-hall"), &user).unwrap();
        orchestrator.attempt_unlock(&mission("archive"), &user).unwrap();

        let stats = orchestrator.get_mission_access_statistics().unwrap();
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.recent_attempts, 2);
        assert_eq!(stats.ledger.recent_activity, 2);
    }

    #[test]
    fn test_pair_locks_are_released() {
        let (orchestrator, _clock) = orchestrator();
        let admin = UserContext::new("root", Tier::Administrator, 100);

        for n in 0..8 {
            let user = UserContext::new(format!("u{n}"), Tier::Verifier, 60);
            orchestrator.attempt_unlock(&mission("archive"), &user).unwrap();
            orchestrator
                .update_via_replay(&mission("archive"), &user.user_id, "trace", true)
                .unwrap();
            orchestrator
                .grant_override(&mission("town-hall"), &user, &admin, "pilot")
                .unwrap();
            orchestrator
                .mark_completed(&mission("town-hall"), &user.user_id)
                .unwrap();
        }
        assert!(orchestrator.pair_locks.is_empty());

        let user = UserContext::new("shared", Tier::Citizen, 10);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..16 {
                        orchestrator.attempt_unlock(&mission("town-hall"), &user).unwrap();
                    }
                });
            }
        });
        assert!(orchestrator.pair_locks.is_empty());
        assert_eq!(
            orchestrator
                .ledger()
                .attempt_count(&mission("town-hall"), &user.user_id)
                .unwrap(),
            128
        );
    }
}
