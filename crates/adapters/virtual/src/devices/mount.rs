//! Virtual telescope mount — instant, in-memory slews.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use skyshed_domain::error::{DeviceKind, ObservatoryError};
use skyshed_domain::target::ObservationTarget;
use skyshed_app::ports::{DeviceLink, MountControl};

use super::FaultPlan;

/// A simulated equatorial mount.
///
/// Slews complete instantly: `goto_target` stores the derived azimuth and
/// immediately emits a slew-completed notification. Starts parked and
/// disconnected, pointing at azimuth 0.
pub struct VirtualMount {
    connected: AtomicBool,
    parked: AtomicBool,
    azimuth: Mutex<f64>,
    slew_tx: broadcast::Sender<f64>,
    pub faults: FaultPlan,
}

impl Default for VirtualMount {
    fn default() -> Self {
        let (slew_tx, _) = broadcast::channel(16);
        Self {
            connected: AtomicBool::new(false),
            parked: AtomicBool::new(true),
            azimuth: Mutex::new(0.0),
            slew_tx,
            faults: FaultPlan::default(),
        }
    }
}

impl VirtualMount {
    /// Whether the mount is in its parked position.
    #[must_use]
    pub fn is_parked(&self) -> bool {
        self.parked.load(Ordering::SeqCst)
    }

    /// Move the mount to `azimuth` and emit a slew-completed notification,
    /// as if the operator had slewed it by hand.
    pub fn simulate_slew(&self, azimuth: f64) {
        *lock(&self.azimuth) = azimuth;
        let _ = self.slew_tx.send(azimuth);
    }

    fn ensure_connected(&self) -> Result<(), ObservatoryError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ObservatoryError::connection(
                DeviceKind::Mount,
                "not connected",
            ))
        }
    }
}

impl DeviceLink for VirtualMount {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Mount
    }

    async fn connect(&self) -> Result<bool, ObservatoryError> {
        if self.faults.trips("connect") {
            return Err(ObservatoryError::connection(
                DeviceKind::Mount,
                "simulated connect fault",
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), ObservatoryError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl MountControl for VirtualMount {
    async fn unpark(&self) -> Result<(), ObservatoryError> {
        self.ensure_connected()?;
        if self.faults.trips("unpark") {
            return Err(ObservatoryError::auto_operations("simulated unpark fault"));
        }
        self.parked.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn park(&self) -> Result<(), ObservatoryError> {
        self.ensure_connected()?;
        if self.faults.trips("park") {
            return Err(ObservatoryError::auto_operations("simulated park fault"));
        }
        // parking while already parked is a no-op
        self.parked.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn goto_target(&self, target: &ObservationTarget) -> Result<(), ObservatoryError> {
        self.ensure_connected()?;
        if self.faults.trips("goto") {
            return Err(ObservatoryError::auto_operations("simulated goto fault"));
        }
        if self.is_parked() {
            return Err(ObservatoryError::auto_operations(
                "cannot slew while parked",
            ));
        }
        // crude hour-angle projection; good enough for a simulation
        let azimuth = (target.ra_hours * 15.0).rem_euclid(360.0);
        self.simulate_slew(azimuth);
        Ok(())
    }

    async fn azimuth(&self) -> Result<f64, ObservatoryError> {
        self.ensure_connected()?;
        Ok(*lock(&self.azimuth))
    }

    fn slew_events(&self) -> broadcast::Receiver<f64> {
        self.slew_tx.subscribe()
    }
}

fn lock(azimuth: &Mutex<f64>) -> MutexGuard<'_, f64> {
    azimuth.lock().unwrap_or_else(PoisonError::into_inner)
}
