//! Civic Access Types - the shared vocabulary of mission access decisions.
//!
//! Every other access crate depends on this one. It holds the mission and user
//! data model, the fixed tier order, the single status-derivation contract
//! shared by the ledger and the evaluator, and the clock abstraction.

#![deny(unsafe_code)]

pub mod attempt;
pub mod clock;
pub mod context;
pub mod eligibility;
pub mod entry;
pub mod ids;
pub mod mission;
pub mod status;
pub mod tier;

pub use attempt::{AttemptResult, UnlockAttempt};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{ContextError, ReplayRecord, UserContext, MAX_TRUST_SCORE};
pub use eligibility::{
    BlockerPriority, BlockerType, EligibilityResult, FlagCheck, RequirementSnapshot,
    ThresholdCheck, TierCheck, UnlockBlocker,
};
pub use entry::{EntryMetadata, LedgerEntry};
pub use ids::{AttemptId, EntryId, MissionId, PairKey, UserId};
pub use mission::{MissionDefinition, MissionRequirements};
pub use status::{AccessFacts, AccessStatus, RequirementChecks, UnlockMethod};
pub use tier::{Tier, UnknownTier, TIER_ORDER};
