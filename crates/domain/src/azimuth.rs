//! Azimuth math used by dome-to-mount slaving.

/// Whether a reported azimuth is usable for a slaving decision.
///
/// Drivers occasionally report NaN or infinities while a device is
/// initialising; such readings must skip the correction cycle instead of
/// commanding a slew.
#[must_use]
pub fn is_valid(azimuth: f64) -> bool {
    azimuth.is_finite() && (0.0..360.0).contains(&azimuth)
}

/// Smallest angular separation between two azimuths, in degrees.
///
/// The result is always in `0.0..=180.0`, wrapping across north
/// (e.g. 350° and 10° are 20° apart, not 340°).
#[must_use]
pub fn separation(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 { 360.0 - diff } else { diff }
}
