//! Named retention levels and the effective keep window.

use serde::{Deserialize, Serialize};

/// Risk level controlling how recently modified items are protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionLevel {
    /// Keep anything modified in the last 7 days.
    Safe,
    /// Keep anything modified in the last 3 days.
    #[default]
    Standard,
    /// No age limit: everything is eligible.
    Advanced,
}

impl RetentionLevel {
    /// Keep window of this level, in days.
    pub const fn days(self) -> u32 {
        match self {
            Self::Safe => 7,
            Self::Standard => 3,
            Self::Advanced => 0,
        }
    }
}

impl std::fmt::Display for RetentionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Safe => "safe",
            Self::Standard => "standard",
            Self::Advanced => "advanced",
        };
        f.write_str(name)
    }
}

/// Resolve the keep window from a level and a user override.
///
/// The longer window wins. Zero means no age filter at all.
pub fn effective_keep_days(level: RetentionLevel, custom_keep_days: u32) -> u32 {
    level.days().max(custom_keep_days)
}
