//! Common error types used across the workspace.
//!
//! The taxonomy, in increasing severity:
//!
//! - *Warnings* (refused preconditions, slaving-tolerance drift) are **not**
//!   errors — they are published as [`EventType::Warning`] events and logged,
//!   never propagated through `Result`.
//! - [`ObservatoryError::AutoOperations`] and its more specific forms
//!   [`ObservatoryError::Connection`] and
//!   [`ObservatoryError::ObjectNotLocated`]: an expected hardware action
//!   failed. These always drive the engine to `Faulted` and auto-invoke the
//!   fix sequence.
//! - [`ObservatoryError::Critical`]: raised only when the fix sequence
//!   itself cannot restore a safe state. Terminal for automatic handling;
//!   requires operator intervention.
//!
//! [`EventType::Warning`]: crate::event::EventType::Warning

use std::fmt;

use serde::{Deserialize, Serialize};

/// The hardware subsystems the engine coordinates.
///
/// Used by the error taxonomy and as the key for adapter factories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Mount,
    Dome,
    Weather,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mount => "mount",
            Self::Dome => "dome",
            Self::Weather => "weather",
        };
        f.write_str(name)
    }
}

/// Errors produced by automation sequences and hardware ports.
#[derive(Debug, thiserror::Error)]
pub enum ObservatoryError {
    /// An expected hardware action failed (e.g. "could not open dome").
    #[error("automatic operation failed: {0}")]
    AutoOperations(String),

    /// A device could not be connected during startup or shutdown.
    #[error("could not connect {device}: {reason}")]
    Connection { device: DeviceKind, reason: String },

    /// The required observation target could not be located in view.
    #[error("object not located: {0}")]
    ObjectNotLocated(String),

    /// The fix sequence failed to restore a safe parked/closed state.
    /// No further automatic recovery is attempted.
    #[error("critical observatory failure, operator intervention required: {0}")]
    Critical(String),
}

impl ObservatoryError {
    /// Shorthand for an [`ObservatoryError::AutoOperations`] failure.
    pub fn auto_operations(message: impl Into<String>) -> Self {
        Self::AutoOperations(message.into())
    }

    /// Shorthand for an [`ObservatoryError::Connection`] failure.
    pub fn connection(device: DeviceKind, reason: impl Into<String>) -> Self {
        Self::Connection {
            device,
            reason: reason.into(),
        }
    }

    /// Whether automatic recovery must not be attempted for this error.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical(_))
    }
}
