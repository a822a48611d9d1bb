//! Civic Access Ledger - append-only history of mission access decisions.
//!
//! Entries are never mutated. The "current" status of a (mission, user) pair
//! is the latest entry for that pair, found in O(1) through a secondary index.
//! Entries live in an arena ordered by (timestamp, append sequence), which
//! doubles as the time index used for capacity eviction: once the ledger
//! holds more than `max_entries`, the single oldest entry is dropped.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod query;
pub mod sink;

pub use config::{LedgerConfig, DEFAULT_MAX_ENTRIES};
pub use error::{LedgerError, LedgerResult};
pub use query::{LedgerQuery, LedgerStatistics};
pub use sink::{read_jsonl, JsonlFileSink, LedgerSink, NullSink};

use access_types::{
    AccessFacts, AccessStatus, Clock, EntryId, EntryMetadata, LedgerEntry, MissionId,
    MissionRequirements, PairKey, SystemClock, Tier, UnlockMethod, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Arena position: time first, append order breaks ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct LedgerKey {
    timestamp: DateTime<Utc>,
    seq: u64,
}

#[derive(Default)]
struct LedgerState {
    entries: BTreeMap<LedgerKey, LedgerEntry>,
    by_id: HashMap<EntryId, LedgerKey>,
    latest: HashMap<PairKey, LedgerKey>,
    /// Survives eviction so counters stay monotonic.
    attempts: HashMap<PairKey, u32>,
    next_seq: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl LedgerState {
    /// Non-decreasing timestamp for the next append.
    fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        }
    }

    fn current(&self, pair: &PairKey) -> Option<&LedgerEntry> {
        self.latest.get(pair).and_then(|key| self.entries.get(key))
    }

    fn insert(&mut self, entry: LedgerEntry) -> LedgerKey {
        let key = LedgerKey {
            timestamp: entry.timestamp,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.last_timestamp = Some(entry.timestamp);

        let pair = entry.pair_key();
        let is_newest = self.latest.get(&pair).map_or(true, |existing| key > *existing);
        if is_newest {
            self.latest.insert(pair, key);
        }
        self.by_id.insert(entry.entry_id.clone(), key);
        self.entries.insert(key, entry);
        key
    }

    /// Drop the globally oldest entry.
    fn evict_oldest(&mut self) -> LedgerResult<LedgerEntry> {
        let (key, entry) = self.entries.pop_first().ok_or_else(|| {
            LedgerError::InvariantViolation("eviction requested on an empty ledger".to_string())
        })?;

        self.by_id.remove(&entry.entry_id);
        let pair = entry.pair_key();
        if self.latest.get(&pair) == Some(&key) {
            // Oldest overall and latest for its pair means it was the pair's only entry.
            self.latest.remove(&pair);
        }
        Ok(entry)
    }
}

/// A new decision to append.
#[derive(Clone, Debug)]
pub struct RecordEvent {
    pub mission_id: MissionId,
    pub user_id: UserId,
    pub status: AccessStatus,
    pub user_tier: Tier,
    pub trust_score: u8,
    pub source_trace_hash: Option<String>,
    pub unlocked_via: UnlockMethod,
    pub requirements: MissionRequirements,
    pub replay_validated: bool,
    pub feedback_badge: Option<String>,
    pub vote_verified: Option<bool>,
    pub note: Option<String>,
}

impl RecordEvent {
    pub fn new(mission_id: MissionId, user_id: UserId, status: AccessStatus) -> Self {
        Self {
            mission_id,
            user_id,
            status,
            user_tier: Tier::Citizen,
            trust_score: 0,
            source_trace_hash: None,
            unlocked_via: UnlockMethod::None,
            requirements: MissionRequirements::default(),
            replay_validated: false,
            feedback_badge: None,
            vote_verified: None,
            note: None,
        }
    }

    pub fn with_user(mut self, tier: Tier, trust_score: u8) -> Self {
        self.user_tier = tier;
        self.trust_score = trust_score;
        self
    }

    pub fn with_requirements(mut self, requirements: MissionRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_unlocked_via(mut self, method: UnlockMethod) -> Self {
        self.unlocked_via = method;
        self
    }

    pub fn with_trace(mut self, trace_hash: impl Into<String>) -> Self {
        self.source_trace_hash = Some(trace_hash.into());
        self
    }

    pub fn with_facts(mut self, facts: &AccessFacts, feedback_badge: Option<String>) -> Self {
        self.user_tier = facts.tier;
        self.trust_score = facts.trust_score;
        self.replay_validated = facts.replay_validated;
        self.feedback_badge = feedback_badge;
        self.vote_verified = Some(facts.has_verified_vote);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// The access ledger.
///
/// All state sits behind one mutex that is held only for the in-memory
/// append and the sink write, which keeps the sink order identical to the
/// arena order.
pub struct AccessLedger {
    state: Mutex<LedgerState>,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn LedgerSink>,
}

impl AccessLedger {
    /// Create an in-memory ledger with default capacity.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            config,
            clock: Arc::new(SystemClock),
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mirror every append to `sink`; a sink failure aborts the append.
    pub fn with_sink(mut self, sink: Arc<dyn LedgerSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Rebuild a ledger from a JSONL file written by [`JsonlFileSink`].
    ///
    /// Entries are re-inserted in timestamp order without touching the sink.
    /// Attempt counters resume from the highest count seen per pair.
    pub fn restore_jsonl(path: impl AsRef<Path>, config: LedgerConfig) -> LedgerResult<Self> {
        let mut entries = read_jsonl(path)?;
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let ledger = Self::with_config(config);
        {
            let mut state = ledger.lock()?;
            for entry in entries {
                let pair = entry.pair_key();
                let attempts = state.attempts.entry(pair).or_insert(0);
                *attempts = (*attempts).max(entry.metadata.unlock_attempts);
                state.insert(entry);
                if state.entries.len() > ledger.config.max_entries {
                    state.evict_oldest()?;
                }
            }
            info!(entries = state.entries.len(), "Ledger restored from journal");
        }
        Ok(ledger)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".to_string()))
    }

    /// Hand the entry to the sink, then make it visible and enforce capacity.
    fn append(&self, state: &mut LedgerState, entry: LedgerEntry) -> LedgerResult<()> {
        self.sink.append(&entry).inspect_err(|err| {
            warn!(
                mission_id = %entry.mission_id,
                user_id = %entry.metadata.user_id,
                error = %err,
                "Ledger append rejected by sink"
            );
        })?;

        debug!(
            entry_id = %entry.entry_id,
            mission_id = %entry.mission_id,
            user_id = %entry.metadata.user_id,
            status = %entry.status,
            "Ledger entry appended"
        );
        state.insert(entry);

        if state.entries.len() > self.config.max_entries {
            let evicted = state.evict_oldest()?;
            debug!(
                entry_id = %evicted.entry_id,
                timestamp = %evicted.timestamp,
                "Evicted oldest ledger entry"
            );
        }
        Ok(())
    }

    /// Append a new decision. Always writes; never touches existing entries.
    pub fn record_event(&self, event: RecordEvent) -> LedgerResult<LedgerEntry> {
        let mut state = self.lock()?;
        let now = state.stamp(self.clock.now());
        let pair = PairKey::new(&event.mission_id, &event.user_id);
        let attempts = state.attempts.get(&pair).copied().unwrap_or(0) + 1;

        let entry = LedgerEntry {
            entry_id: EntryId::generate(),
            mission_id: event.mission_id,
            status: event.status,
            timestamp: now,
            source_trace_hash: event.source_trace_hash,
            tier_required: event.requirements.min_tier,
            requirements: event.requirements,
            unlocked_via: event.unlocked_via,
            metadata: EntryMetadata {
                user_id: event.user_id,
                user_tier: event.user_tier,
                trust_score: event.trust_score,
                replay_validated: event.replay_validated,
                feedback_badge: event.feedback_badge,
                vote_verified: event.vote_verified,
                unlock_attempts: attempts,
                last_attempt_at: now,
                note: event.note,
            },
        };

        self.append(&mut state, entry.clone())?;
        state.attempts.insert(pair, attempts);
        Ok(entry)
    }

    /// Record that a replay was validated for the pair.
    ///
    /// Writes nothing and returns `None` when the replay is invalid or the pair
    /// has no history. Otherwise appends a copy of the current entry with the
    /// replay marked validated; a pair blocked on replay has its status
    /// re-derived.
    pub fn update_via_replay(
        &self,
        mission_id: &MissionId,
        user_id: &UserId,
        replay_trace_hash: &str,
        replay_valid: bool,
    ) -> LedgerResult<Option<LedgerEntry>> {
        if !replay_valid {
            debug!(mission_id = %mission_id, user_id = %user_id, "Ignoring invalid replay");
            return Ok(None);
        }

        let mut state = self.lock()?;
        let pair = PairKey::new(mission_id, user_id);
        let Some(prior) = state.current(&pair).cloned() else {
            debug!(mission_id = %mission_id, user_id = %user_id, "No history for replay update");
            return Ok(None);
        };

        let mut facts = prior.facts();
        facts.replay_validated = true;

        let status = if prior.status == AccessStatus::ReplayRequired {
            prior.requirements.derive_status(&facts)
        } else {
            prior.status
        };
        let unlocked_via = if status == AccessStatus::Unlocked && !prior.unlocked_via.is_set() {
            UnlockMethod::MemoryReplay
        } else {
            prior.unlocked_via
        };

        let entry = LedgerEntry {
            entry_id: EntryId::generate(),
            status,
            timestamp: state.stamp(self.clock.now()),
            source_trace_hash: Some(replay_trace_hash.to_string()),
            unlocked_via,
            metadata: EntryMetadata {
                replay_validated: true,
                ..prior.metadata.clone()
            },
            ..prior
        };

        self.append(&mut state, entry.clone())?;
        if status == AccessStatus::Unlocked {
            info!(mission_id = %mission_id, user_id = %user_id, "Mission unlocked via replay");
        }
        Ok(Some(entry))
    }

    /// Record a feedback badge and/or a vote verification for the pair.
    ///
    /// Status is re-derived from everything known so far; pairs that already
    /// grant access keep their status. Returns `None` without writing when the
    /// pair has no history.
    pub fn update_via_feedback(
        &self,
        mission_id: &MissionId,
        user_id: &UserId,
        feedback_badge: Option<String>,
        vote_verified: Option<bool>,
    ) -> LedgerResult<Option<LedgerEntry>> {
        let mut state = self.lock()?;
        let pair = PairKey::new(mission_id, user_id);
        let Some(prior) = state.current(&pair).cloned() else {
            debug!(mission_id = %mission_id, user_id = %user_id, "No history for feedback update");
            return Ok(None);
        };

        let feedback_badge = feedback_badge.or_else(|| prior.metadata.feedback_badge.clone());
        let vote_verified = match (prior.metadata.vote_verified, vote_verified) {
            (None, None) => None,
            (known, new) => Some(known.unwrap_or(false) || new.unwrap_or(false)),
        };

        let mut facts = prior.facts();
        facts.has_feedback_badge = feedback_badge.is_some();
        facts.has_verified_vote = vote_verified.unwrap_or(false);

        let status = if prior.status.grants_access() {
            prior.status
        } else {
            prior.requirements.derive_status(&facts)
        };
        let unlocked_via = if prior.unlocked_via == UnlockMethod::AdminOverride {
            UnlockMethod::AdminOverride
        } else if status.grants_access() {
            prior.requirements.unlock_method(&facts)
        } else {
            UnlockMethod::None
        };

        let entry = LedgerEntry {
            entry_id: EntryId::generate(),
            status,
            timestamp: state.stamp(self.clock.now()),
            unlocked_via,
            metadata: EntryMetadata {
                feedback_badge,
                vote_verified,
                ..prior.metadata.clone()
            },
            ..prior
        };

        self.append(&mut state, entry.clone())?;
        if status == AccessStatus::Unlocked {
            info!(
                mission_id = %mission_id,
                user_id = %user_id,
                unlocked_via = %unlocked_via,
                "Mission unlocked via feedback"
            );
        }
        Ok(Some(entry))
    }

    /// Close out an unlocked pair with a `completed` entry.
    ///
    /// Returns `None` when the pair has no history; any current status other
    /// than unlocked is an invalid transition.
    pub fn mark_completed(
        &self,
        mission_id: &MissionId,
        user_id: &UserId,
        note: Option<String>,
    ) -> LedgerResult<Option<LedgerEntry>> {
        let mut state = self.lock()?;
        let pair = PairKey::new(mission_id, user_id);
        let Some(prior) = state.current(&pair).cloned() else {
            return Ok(None);
        };

        if prior.status != AccessStatus::Unlocked {
            return Err(LedgerError::InvalidStateTransition(format!(
                "cannot complete {} from status {}",
                pair, prior.status
            )));
        }

        let entry = LedgerEntry {
            entry_id: EntryId::generate(),
            status: AccessStatus::Completed,
            timestamp: state.stamp(self.clock.now()),
            metadata: EntryMetadata {
                note: note.or_else(|| prior.metadata.note.clone()),
                ..prior.metadata.clone()
            },
            ..prior
        };

        self.append(&mut state, entry.clone())?;
        info!(mission_id = %mission_id, user_id = %user_id, "Mission completed");
        Ok(Some(entry))
    }

    // --- Query methods ---

    /// Latest entry for the pair.
    pub fn current(
        &self,
        mission_id: &MissionId,
        user_id: &UserId,
    ) -> LedgerResult<Option<LedgerEntry>> {
        let state = self.lock()?;
        Ok(state.current(&PairKey::new(mission_id, user_id)).cloned())
    }

    pub fn current_status(
        &self,
        mission_id: &MissionId,
        user_id: &UserId,
    ) -> LedgerResult<Option<AccessStatus>> {
        Ok(self.current(mission_id, user_id)?.map(|entry| entry.status))
    }

    pub fn get(&self, entry_id: &EntryId) -> LedgerResult<Option<LedgerEntry>> {
        let state = self.lock()?;
        Ok(state
            .by_id
            .get(entry_id)
            .and_then(|key| state.entries.get(key))
            .cloned())
    }

    /// Attempts recorded for the pair, including evicted ones.
    pub fn attempt_count(&self, mission_id: &MissionId, user_id: &UserId) -> LedgerResult<u32> {
        let state = self.lock()?;
        Ok(state
            .attempts
            .get(&PairKey::new(mission_id, user_id))
            .copied()
            .unwrap_or(0))
    }

    /// Retained history of the pair, oldest first.
    pub fn history(
        &self,
        mission_id: &MissionId,
        user_id: &UserId,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let mut entries = self.query(&LedgerQuery::for_pair(mission_id, user_id))?;
        entries.reverse();
        Ok(entries)
    }

    /// Matching entries, newest first.
    pub fn query(&self, query: &LedgerQuery) -> LedgerResult<Vec<LedgerEntry>> {
        let state = self.lock()?;
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(state
            .entries
            .values()
            .rev()
            .filter(|entry| query.matches(entry))
            .take(limit)
            .cloned()
            .collect())
    }

    pub fn len(&self) -> usize {
        // Entry count stays meaningful after a writer panic.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get statistics about the ledger.
    pub fn statistics(&self) -> LedgerResult<LedgerStatistics> {
        let state = self.lock()?;
        let window_start = self
            .clock
            .now()
            .checked_sub_signed(self.config.recent_window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut stats = LedgerStatistics {
            total_entries: state.entries.len(),
            recent_window_hours: self.config.recent_window_hours,
            ..Default::default()
        };
        let mut trust_total = 0u64;

        for entry in state.entries.values() {
            *stats.by_status.entry(entry.status).or_insert(0) += 1;
            *stats.by_tier.entry(entry.metadata.user_tier).or_insert(0) += 1;
            *stats.by_unlock_method.entry(entry.unlocked_via).or_insert(0) += 1;
            trust_total += u64::from(entry.metadata.trust_score);
            if entry.timestamp >= window_start {
                stats.recent_activity += 1;
            }
        }

        if stats.total_entries > 0 {
            stats.average_trust_score = trust_total as f64 / stats.total_entries as f64;
        }
        Ok(stats)
    }
}

impl Default for AccessLedger {
    fn default() -> Self {
        Self::new()
    }
}
