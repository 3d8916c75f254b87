//! Segment tiers: how fast packets cross a segment and how much a pulling
//! segment takes from an inventory at once.

use crate::fixed::{speed_ratio, Fixed64};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Basic,
    Advanced,
    Elite,
    Ultimate,
}

/// The throughput knobs of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Progress added per tick. A packet crosses a segment in
    /// `ceil(100 / speed)` ticks.
    pub speed: u32,
    /// Items pulled from an adjacent inventory per ingestion attempt.
    pub pull_amount: u32,
}

/// The tier table used to build segments. Missing entries deserialize to
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTable {
    pub basic: TierSpec,
    pub advanced: TierSpec,
    pub elite: TierSpec,
    pub ultimate: TierSpec,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            basic: TierSpec { speed: 5, pull_amount: 1 },
            advanced: TierSpec { speed: 10, pull_amount: 16 },
            elite: TierSpec { speed: 20, pull_amount: 32 },
            ultimate: TierSpec { speed: 50, pull_amount: 64 },
        }
    }
}

impl TierTable {
    pub fn spec(&self, tier: Tier) -> TierSpec {
        match tier {
            Tier::Basic => self.basic,
            Tier::Advanced => self.advanced,
            Tier::Elite => self.elite,
            Tier::Ultimate => self.ultimate,
        }
    }

    /// Route cost of crossing one segment with the given speed, relative to
    /// the fastest tier. Zero speeds cost as much as a restrictive segment.
    pub fn cost_of(&self, spec: TierSpec) -> Fixed64 {
        speed_ratio(self.ultimate.speed, spec.speed).unwrap_or(RESTRICTIVE_COST)
    }
}

/// Route cost of a restrictive segment. High enough that any detour through
/// ordinary segments is preferred.
pub const RESTRICTIVE_COST: Fixed64 = Fixed64::const_from_int(1000);
