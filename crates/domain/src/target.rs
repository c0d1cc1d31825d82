//! Pointing target for the telescope mount.

use serde::{Deserialize, Serialize};

use crate::error::ObservatoryError;

/// An observation target the mount is pointed at during startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTarget {
    /// Human-readable name (e.g. `"M31"`).
    pub name: String,
    /// Right ascension in hours, `0.0..24.0`.
    pub ra_hours: f64,
    /// Declination in degrees, `-90.0..=90.0`.
    pub dec_degrees: f64,
}

impl ObservationTarget {
    /// Create a target after checking coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ObservatoryError::AutoOperations`] when the coordinates are
    /// out of range or non-finite.
    pub fn new(
        name: impl Into<String>,
        ra_hours: f64,
        dec_degrees: f64,
    ) -> Result<Self, ObservatoryError> {
        let target = Self {
            name: name.into(),
            ra_hours,
            dec_degrees,
        };
        target.validate()?;
        Ok(target)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ObservatoryError::AutoOperations`] when the name is empty
    /// or a coordinate is out of range.
    pub fn validate(&self) -> Result<(), ObservatoryError> {
        if self.name.is_empty() {
            return Err(ObservatoryError::auto_operations("target name is empty"));
        }
        if !self.ra_hours.is_finite() || !(0.0..24.0).contains(&self.ra_hours) {
            return Err(ObservatoryError::auto_operations(format!(
                "right ascension out of range: {}",
                self.ra_hours
            )));
        }
        if !self.dec_degrees.is_finite() || !(-90.0..=90.0).contains(&self.dec_degrees) {
            return Err(ObservatoryError::auto_operations(format!(
                "declination out of range: {}",
                self.dec_degrees
            )));
        }
        Ok(())
    }
}
