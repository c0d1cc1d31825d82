//! Imaging port — the external camera collaborators.
//!
//! Image capture, storage, and timelapse scheduling live outside the
//! automation core; the engine only hands off and stops.

use std::future::Future;

use skyshed_domain::error::ObservatoryError;
use skyshed_domain::time::Timestamp;

/// External imaging collaborators (cameras, capture scheduler).
pub trait ImagingRig: Send + Sync {
    /// Start the live preview loop at the given frame rate.
    fn start_live_preview(
        &self,
        frames_per_second: f64,
    ) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Start the timed capture loop.
    ///
    /// `until` is the derived camera-off time; `None` means the loop runs
    /// until [`stop`](Self::stop) is called.
    fn start_capture_loop(
        &self,
        until: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Stop preview and capture loops; resolves once they have wound down.
    fn stop(&self) -> impl Future<Output = Result<(), ObservatoryError>> + Send;
}
