//! Virtual weather station — a hand-driven safety tri-state.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use skyshed_domain::error::{DeviceKind, ObservatoryError};
use skyshed_domain::weather::SafetyStatus;
use skyshed_app::ports::{DeviceLink, WeatherStation};

use super::FaultPlan;

/// A simulated weather station whose safety reading is set by the caller.
///
/// Starts disconnected and reporting [`SafetyStatus::Safe`].
pub struct VirtualWeather {
    connected: AtomicBool,
    safety_tx: watch::Sender<SafetyStatus>,
    pub faults: FaultPlan,
}

impl Default for VirtualWeather {
    fn default() -> Self {
        Self {
            connected: AtomicBool::new(false),
            safety_tx: watch::Sender::new(SafetyStatus::Safe),
            faults: FaultPlan::default(),
        }
    }
}

impl VirtualWeather {
    /// Push a new safety reading to all subscribers.
    pub fn set_safety(&self, safety: SafetyStatus) {
        self.safety_tx.send_replace(safety);
    }
}

impl DeviceLink for VirtualWeather {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Weather
    }

    async fn connect(&self) -> Result<bool, ObservatoryError> {
        if self.faults.trips("connect") {
            return Err(ObservatoryError::connection(
                DeviceKind::Weather,
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

impl WeatherStation for VirtualWeather {
    fn safety(&self) -> SafetyStatus {
        *self.safety_tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<SafetyStatus> {
        self.safety_tx.subscribe()
    }
}
