//! Startup arguments and their derived shutdown times.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::ObservatoryError;
use crate::time::Timestamp;

/// Caller-supplied options for a startup run.
///
/// `close_at` is the planned end of the session. The derived times subtract
/// the respective margins so the cameras stop before the dome starts
/// closing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartupArguments {
    /// Refuse startup unless the configured target is actually in view.
    pub require_in_view: bool,
    /// Start the timed capture loop as the last startup step.
    pub autostart: bool,
    /// Planned session end; arms the shutdown scheduler when present.
    pub close_at: Option<Timestamp>,
    /// Subtracted from `close_at` to get the shutdown time.
    pub close_margin: Option<TimeDelta>,
    /// Subtracted from `close_at` to get the camera-off time.
    pub cam_margin: Option<TimeDelta>,
}

impl StartupArguments {
    /// When the automatic shutdown should fire, if a session end was given.
    #[must_use]
    pub fn shutdown_time(&self) -> Option<Timestamp> {
        let close_at = self.close_at?;
        Some(close_at - self.close_margin.unwrap_or(TimeDelta::zero()))
    }

    /// When the capture loop should stop, if a session end was given.
    #[must_use]
    pub fn camera_off_time(&self) -> Option<Timestamp> {
        let close_at = self.close_at?;
        Some(close_at - self.cam_margin.unwrap_or(TimeDelta::zero()))
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ObservatoryError::AutoOperations`] when a margin is
    /// negative or a margin is given without a session end.
    pub fn validate(&self) -> Result<(), ObservatoryError> {
        if self.close_at.is_none() && (self.close_margin.is_some() || self.cam_margin.is_some()) {
            return Err(ObservatoryError::auto_operations(
                "margins given without a close time",
            ));
        }
        for margin in [self.close_margin, self.cam_margin].into_iter().flatten() {
            if margin < TimeDelta::zero() {
                return Err(ObservatoryError::auto_operations(format!(
                    "negative margin: {margin}"
                )));
            }
        }
        Ok(())
    }
}
