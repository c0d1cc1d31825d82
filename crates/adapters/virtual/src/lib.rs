//! # skyshed-adapter-virtual
//!
//! Virtual hardware adapter — simulated devices for testing, demos, and
//! running the daemon without an observatory attached.
//!
//! ## Provided devices
//!
//! | Device | Behaviour |
//! |--------|-----------|
//! | [`VirtualMount`] | Instant slews, park/unpark, slew-completed notifications |
//! | [`VirtualDome`] | Instant shutter and azimuth moves, optional native slaving |
//! | [`VirtualWeather`] | Hand-driven safety tri-state |
//! | [`VirtualImaging`] | Records the requested preview/capture activity |
//!
//! Every device carries a [`FaultPlan`] for one-shot failure injection.
//!
//! ## Dependency rule
//!
//! Depends on `skyshed-app` (port traits) and `skyshed-domain` only.

mod devices;

use std::sync::Arc;

use skyshed_domain::error::DeviceKind;

pub use devices::{
    FaultPlan, ImagingActivity, VirtualDome, VirtualImaging, VirtualMount, VirtualWeather,
};

/// The full set of simulated hardware, ready to wire into the engine.
pub struct VirtualObservatory {
    pub mount: Arc<VirtualMount>,
    pub dome: Arc<VirtualDome>,
    pub weather: Arc<VirtualWeather>,
    pub imaging: Arc<VirtualImaging>,
}

impl Default for VirtualObservatory {
    fn default() -> Self {
        Self::new(true)
    }
}

impl VirtualObservatory {
    /// Build a complete simulated observatory; `dome_can_slave` controls
    /// the dome driver's native-slaving capability.
    #[must_use]
    pub fn new(dome_can_slave: bool) -> Self {
        Self {
            mount: Arc::new(VirtualMount::default()),
            dome: Arc::new(VirtualDome::new(dome_can_slave)),
            weather: Arc::new(VirtualWeather::default()),
            imaging: Arc::new(VirtualImaging::default()),
        }
    }

    /// Connection state of the link identified by `kind`.
    #[must_use]
    pub fn link_connected(&self, kind: DeviceKind) -> bool {
        use skyshed_app::ports::DeviceLink;
        match kind {
            DeviceKind::Mount => self.mount.is_connected(),
            DeviceKind::Dome => self.dome.is_connected(),
            DeviceKind::Weather => self.weather.is_connected(),
        }
    }
}
