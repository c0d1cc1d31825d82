//! Virtual dome — instant shutter and azimuth movements.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use skyshed_domain::error::{DeviceKind, ObservatoryError};
use skyshed_app::ports::{DeviceLink, DomeControl};

use super::FaultPlan;

const HOME_AZIMUTH: f64 = 0.0;

/// A simulated dome with an optional native-slaving capability.
///
/// Starts disconnected, closed, and at the home azimuth.
pub struct VirtualDome {
    can_slave: bool,
    connected: AtomicBool,
    shutter_open: AtomicBool,
    slaved: AtomicBool,
    azimuth: Mutex<f64>,
    pub faults: FaultPlan,
}

impl Default for VirtualDome {
    fn default() -> Self {
        Self::new(true)
    }
}

impl VirtualDome {
    /// Create a dome; `can_slave` controls whether the simulated driver
    /// advertises native slaving.
    #[must_use]
    pub fn new(can_slave: bool) -> Self {
        Self {
            can_slave,
            connected: AtomicBool::new(false),
            shutter_open: AtomicBool::new(false),
            slaved: AtomicBool::new(false),
            azimuth: Mutex::new(HOME_AZIMUTH),
            faults: FaultPlan::default(),
        }
    }

    /// Whether the shutter is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shutter_open.load(Ordering::SeqCst)
    }

    /// Force the dome aperture to `azimuth` without a slew command, as if
    /// it had drifted.
    pub fn simulate_drift(&self, azimuth: f64) {
        *lock(&self.azimuth) = azimuth;
    }

    fn ensure_connected(&self) -> Result<(), ObservatoryError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ObservatoryError::connection(
                DeviceKind::Dome,
                "not connected",
            ))
        }
    }
}

impl DeviceLink for VirtualDome {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Dome
    }

    async fn connect(&self) -> Result<bool, ObservatoryError> {
        if self.faults.trips("connect") {
            return Err(ObservatoryError::connection(
                DeviceKind::Dome,
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

impl DomeControl for VirtualDome {
    async fn slew_to_azimuth(&self, azimuth: f64) -> Result<(), ObservatoryError> {
        self.ensure_connected()?;
        if self.faults.trips("slew_to_azimuth") {
            return Err(ObservatoryError::auto_operations("simulated slew fault"));
        }
        *lock(&self.azimuth) = azimuth.rem_euclid(360.0);
        Ok(())
    }

    async fn open_shutter(&self) -> Result<(), ObservatoryError> {
        self.ensure_connected()?;
        if self.faults.trips("open_shutter") {
            return Err(ObservatoryError::auto_operations(
                "simulated shutter open fault",
            ));
        }
        self.shutter_open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close_shutter(&self) -> Result<(), ObservatoryError> {
        self.ensure_connected()?;
        if self.faults.trips("close_shutter") {
            return Err(ObservatoryError::auto_operations(
                "simulated shutter close fault",
            ));
        }
        self.shutter_open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn home_or_park(&self) -> Result<(), ObservatoryError> {
        self.ensure_connected()?;
        if self.faults.trips("home_or_park") {
            return Err(ObservatoryError::auto_operations("simulated homing fault"));
        }
        *lock(&self.azimuth) = HOME_AZIMUTH;
        Ok(())
    }

    async fn set_slaved(&self, slaved: bool) -> Result<(), ObservatoryError> {
        self.ensure_connected()?;
        if !self.can_slave {
            return Err(ObservatoryError::auto_operations(
                "dome driver does not support native slaving",
            ));
        }
        self.slaved.store(slaved, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_all_motion(&self) -> Result<(), ObservatoryError> {
        self.ensure_connected()
    }

    async fn azimuth(&self) -> Result<f64, ObservatoryError> {
        self.ensure_connected()?;
        Ok(*lock(&self.azimuth))
    }

    async fn at_home(&self) -> Result<bool, ObservatoryError> {
        self.ensure_connected()?;
        Ok((*lock(&self.azimuth) - HOME_AZIMUTH).abs() < f64::EPSILON)
    }

    async fn at_park(&self) -> Result<bool, ObservatoryError> {
        self.at_home().await
    }

    async fn is_slewing(&self) -> Result<bool, ObservatoryError> {
        self.ensure_connected()?;
        Ok(false)
    }

    async fn is_slaved(&self) -> Result<bool, ObservatoryError> {
        self.ensure_connected()?;
        Ok(self.slaved.load(Ordering::SeqCst))
    }

    fn can_slave(&self) -> bool {
        self.can_slave
    }
}

fn lock(azimuth: &Mutex<f64>) -> MutexGuard<'_, f64> {
    azimuth.lock().unwrap_or_else(PoisonError::into_inner)
}
