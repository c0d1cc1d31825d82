//! Virtual imaging rig — tracks the requested activity without capturing
//! anything.

use std::sync::{Mutex, MutexGuard, PoisonError};

use skyshed_domain::error::ObservatoryError;
use skyshed_domain::time::Timestamp;
use skyshed_app::ports::ImagingRig;

use super::FaultPlan;

/// What the simulated rig was last asked to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImagingActivity {
    Idle,
    /// Live preview at the given frame rate.
    Preview(f64),
    /// Capture loop, optionally bounded by a stop time.
    Capture(Option<Timestamp>),
}

/// A simulated imaging rig.
pub struct VirtualImaging {
    activity: Mutex<ImagingActivity>,
    pub faults: FaultPlan,
}

impl Default for VirtualImaging {
    fn default() -> Self {
        Self {
            activity: Mutex::new(ImagingActivity::Idle),
            faults: FaultPlan::default(),
        }
    }
}

impl VirtualImaging {
    /// The current simulated activity.
    #[must_use]
    pub fn activity(&self) -> ImagingActivity {
        *lock(&self.activity)
    }
}

impl ImagingRig for VirtualImaging {
    async fn start_live_preview(&self, frames_per_second: f64) -> Result<(), ObservatoryError> {
        if self.faults.trips("preview") {
            return Err(ObservatoryError::auto_operations("simulated preview fault"));
        }
        *lock(&self.activity) = ImagingActivity::Preview(frames_per_second);
        Ok(())
    }

    async fn start_capture_loop(&self, until: Option<Timestamp>) -> Result<(), ObservatoryError> {
        if self.faults.trips("capture") {
            return Err(ObservatoryError::auto_operations("simulated capture fault"));
        }
        *lock(&self.activity) = ImagingActivity::Capture(until);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ObservatoryError> {
        if self.faults.trips("stop") {
            return Err(ObservatoryError::auto_operations(
                "simulated imaging stop fault",
            ));
        }
        *lock(&self.activity) = ImagingActivity::Idle;
        Ok(())
    }
}

fn lock(activity: &Mutex<ImagingActivity>) -> MutexGuard<'_, ImagingActivity> {
    activity.lock().unwrap_or_else(PoisonError::into_inner)
}
