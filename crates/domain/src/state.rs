//! Automation state machine vocabulary.
//!
//! One state per process; the engine owns the single instance and resets it
//! to [`AutomationState::Idle`] on restart. External readers observe the
//! state as an eventually-consistent snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The phase the observatory automation is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationState {
    /// Nothing running; the only state startup may begin from.
    Idle,
    /// The startup sequence is executing.
    Starting,
    /// Startup completed; imaging and slaving loops are live.
    InOperation,
    /// The shutdown sequence is executing.
    Closing,
    /// Startup was refused because the weather was not definitively safe.
    WaitingForWeather,
    /// A startup or shutdown step failed fatally; recovery pending.
    Faulted,
    /// The fix sequence is driving hardware to a safe parked/closed state.
    Fixing,
}

impl AutomationState {
    /// Whether the startup sequence may begin from this state.
    #[must_use]
    pub fn permits_startup(self) -> bool {
        self == Self::Idle
    }

    /// Whether a delayed shutdown may be scheduled from this state.
    #[must_use]
    pub fn permits_shutdown_scheduling(self) -> bool {
        matches!(self, Self::Idle | Self::InOperation)
    }
}

impl fmt::Display for AutomationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::InOperation => "in_operation",
            Self::Closing => "closing",
            Self::WaitingForWeather => "waiting_for_weather",
            Self::Faulted => "faulted",
            Self::Fixing => "fixing",
        };
        f.write_str(name)
    }
}
