//! Civic permission tiers.
//!
//! Tiers form a fixed total order. Comparisons go through the [`TIER_ORDER`]
//! table rather than the enum discriminants so the ordering lives in exactly
//! one place.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Ordinal civic-permission level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Citizen,
    Verifier,
    Moderator,
    Governor,
    Administrator,
}

/// Lowest to highest.
pub const TIER_ORDER: [Tier; 5] = [
    Tier::Citizen,
    Tier::Verifier,
    Tier::Moderator,
    Tier::Governor,
    Tier::Administrator,
];

impl Tier {
    /// Position of this tier in [`TIER_ORDER`].
    pub fn rank(self) -> usize {
        TIER_ORDER
            .iter()
            .position(|tier| *tier == self)
            .unwrap_or(0)
    }

    /// Signed rank difference `self - other`.
    pub fn gap(self, other: Tier) -> i32 {
        self.rank() as i32 - other.rank() as i32
    }

    /// Whether this tier is at or above `required`.
    pub fn satisfies(self, required: Tier) -> bool {
        self.gap(required) >= 0
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Citizen => "citizen",
            Tier::Verifier => "verifier",
            Tier::Moderator => "moderator",
            Tier::Governor => "governor",
            Tier::Administrator => "administrator",
        }
    }

    /// Display label used in blocker messages.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Citizen => "Citizen",
            Tier::Verifier => "Verifier",
            Tier::Moderator => "Moderator",
            Tier::Governor => "Governor",
            Tier::Administrator => "Administrator",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TIER_ORDER
            .iter()
            .copied()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_total_and_ascending() {
        for window in TIER_ORDER.windows(2) {
            assert!(window[1].satisfies(window[0]));
            assert!(!window[0].satisfies(window[1]));
            assert_eq!(window[1].gap(window[0]), 1);
        }
    }

    #[test]
    fn administrator_satisfies_everything() {
        for tier in TIER_ORDER {
            assert!(Tier::Administrator.satisfies(tier));
        }
        assert!(!Tier::Citizen.satisfies(Tier::Verifier));
        assert_eq!(Tier::Citizen.gap(Tier::Governor), -3);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Moderator".parse::<Tier>().unwrap(), Tier::Moderator);
        assert_eq!(" governor ".parse::<Tier>().unwrap(), Tier::Governor);
        assert!("mayor".parse::<Tier>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Tier::Verifier).unwrap();
        assert_eq!(json, "\"verifier\"");
    }
}
