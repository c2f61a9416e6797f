//! Tunables for the nearby query engine.

use serde::Deserialize;

use crate::models::types::UNKNOWN_BAND_VERSION;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Values accepted for `maxDriveTimeMinutes`
    pub drive_time_brackets: Vec<u32>,

    /// Candidate station count at which matching moves onto the rayon pool
    pub parallel_threshold: usize,

    /// Reported as `bandVersion` when no matched band carries a tag
    pub unknown_band_version: String,
}

impl EngineConfig {
    pub fn is_recognized_bracket(&self, minutes: u32) -> bool {
        self.drive_time_brackets.contains(&minutes)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drive_time_brackets: (1..=9).map(|i| i * 10).collect(),
            parallel_threshold: 8,
            unknown_band_version: UNKNOWN_BAND_VERSION.to_string(),
        }
    }
}
