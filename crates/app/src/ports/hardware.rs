//! Hardware capability ports — mount, dome, and weather station.
//!
//! A hardware adapter bridges a concrete driver (ASCOM/INDI, vendor serial
//! protocol, a simulator, …) into the automation core. Adapters are
//! constructed with whatever address or driver id they need; the automation
//! layer only sees the capabilities below.
//!
//! Per-command timeouts are the adapter's responsibility. The automation
//! layer awaits every call and imposes no aggregate deadline.

use std::future::Future;

use tokio::sync::{broadcast, watch};

use skyshed_domain::error::{DeviceKind, ObservatoryError};
use skyshed_domain::target::ObservationTarget;
use skyshed_domain::weather::SafetyStatus;

/// Uniform connection lifecycle shared by every hardware device.
pub trait DeviceLink: Send + Sync {
    /// Which subsystem this device is.
    fn kind(&self) -> DeviceKind;

    /// Establish the driver connection.
    ///
    /// Idempotent: connecting an already-connected device succeeds. Returns
    /// whether the connection is live afterwards.
    fn connect(&self) -> impl Future<Output = Result<bool, ObservatoryError>> + Send;

    /// Whether the driver connection is currently live.
    fn is_connected(&self) -> bool;

    /// Drop the driver connection.
    fn disconnect(&self) -> impl Future<Output = Result<(), ObservatoryError>> + Send;
}

/// Telescope mount capabilities.
pub trait MountControl: DeviceLink {
    /// Release the mount from its park position.
    fn unpark(&self) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Drive the mount to its park position.
    ///
    /// Must be safe to repeat and to issue while another park is in flight;
    /// the fix sequence may overlap commands.
    fn park(&self) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Slew to the given target and begin tracking.
    fn goto_target(
        &self,
        target: &ObservationTarget,
    ) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Current pointing azimuth in degrees.
    fn azimuth(&self) -> impl Future<Output = Result<f64, ObservatoryError>> + Send;

    /// Notification stream fired when a slew completes, carrying the new
    /// azimuth. Used by the slaving controller for immediate corrections.
    fn slew_events(&self) -> broadcast::Receiver<f64>;
}

/// Dome capabilities.
pub trait DomeControl: DeviceLink {
    /// Rotate the dome aperture to the given azimuth.
    fn slew_to_azimuth(
        &self,
        azimuth: f64,
    ) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Open the dome shutter (the dome's opening mechanism, not a camera
    /// shutter).
    fn open_shutter(&self) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Close the dome shutter. Must be repeat- and overlap-safe.
    fn close_shutter(&self) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Drive the dome to its home or park azimuth. Must be repeat- and
    /// overlap-safe.
    fn home_or_park(&self) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Enable or disable the driver's native (hardware) slaving.
    fn set_slaved(&self, slaved: bool)
    -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Immediately stop all dome motion.
    fn stop_all_motion(&self) -> impl Future<Output = Result<(), ObservatoryError>> + Send;

    /// Current aperture azimuth in degrees.
    fn azimuth(&self) -> impl Future<Output = Result<f64, ObservatoryError>> + Send;

    /// Whether the dome is at its home azimuth.
    fn at_home(&self) -> impl Future<Output = Result<bool, ObservatoryError>> + Send;

    /// Whether the dome is at its park azimuth.
    fn at_park(&self) -> impl Future<Output = Result<bool, ObservatoryError>> + Send;

    /// Whether the dome is currently rotating.
    fn is_slewing(&self) -> impl Future<Output = Result<bool, ObservatoryError>> + Send;

    /// Whether native slaving is currently engaged.
    fn is_slaved(&self) -> impl Future<Output = Result<bool, ObservatoryError>> + Send;

    /// Whether the driver supports native slaving at all.
    fn can_slave(&self) -> bool;
}

/// Weather station capabilities.
pub trait WeatherStation: DeviceLink {
    /// Current safety reading.
    fn safety(&self) -> SafetyStatus;

    /// Watch channel carrying safety updates.
    ///
    /// The receiver observes the value current at subscription time plus
    /// every later change.
    fn subscribe(&self) -> watch::Receiver<SafetyStatus>;
}
