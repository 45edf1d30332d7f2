//! Generation settings
//!
//! Parsed from/rendered to JSON text by the caller; the core never reads files.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MARBLE_COUNT, SAMPLE_COUNT, SMOOTHING_PASSES};
use crate::track::{snapped, tile};

/// Loop building strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Weighted random walk on an 8-directional grid
    #[default]
    Snapped,
    /// Straight/corner tile placement on a 4-directional grid
    Tile,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Snapped => "snapped",
            Strategy::Tile => "tile",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "snapped" | "walk" | "a" => Some(Strategy::Snapped),
            "tile" | "tiles" | "b" => Some(Strategy::Tile),
            _ => None,
        }
    }

    /// Independent attempts the search driver runs for this strategy
    pub fn attempt_count(&self) -> u32 {
        match self {
            Strategy::Snapped => snapped::ATTEMPT_COUNT,
            Strategy::Tile => tile::MAX_BUILD_ATTEMPTS,
        }
    }

    /// Fork salt separating this strategy's sub-streams from the other's
    pub fn salt(&self) -> i32 {
        match self {
            Strategy::Snapped => snapped::FORK_SALT,
            Strategy::Tile => tile::FORK_SALT,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Track generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenSettings {
    /// Which loop builder to run
    pub strategy: Strategy,

    // === Post-processing ===
    /// Points in the resampled world polyline
    pub sample_count: usize,
    /// Chaikin passes before resampling
    pub smoothing_passes: u32,

    // === Validation ===
    /// Marble/car count passed to external validators
    pub marble_count: u32,
}

impl Default for GenSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::Snapped,
            sample_count: SAMPLE_COUNT,
            smoothing_passes: SMOOTHING_PASSES,
            marble_count: DEFAULT_MARBLE_COUNT,
        }
    }
}

impl GenSettings {
    /// Default settings for a given strategy
    pub fn for_strategy(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Parse settings from JSON text; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
