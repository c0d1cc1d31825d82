//! Weather safety tri-state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Safety reading reported by the weather station.
///
/// Only [`SafetyStatus::Safe`] counts as safe: an `Unknown` reading is
/// treated exactly like `Unsafe` everywhere a decision is made, because an
/// unreadable sensor gives no reason to keep the shutter open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyStatus {
    Safe,
    Unsafe,
    Unknown,
}

impl SafetyStatus {
    /// Whether this reading is definitively safe.
    #[must_use]
    pub fn is_safe(self) -> bool {
        self == Self::Safe
    }
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Safe => "safe",
            Self::Unsafe => "unsafe",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
