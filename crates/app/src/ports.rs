//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the automation core and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod event_bus;
pub mod hardware;
pub mod imaging;
pub mod locator;

pub use event_bus::EventPublisher;
pub use hardware::{DeviceLink, DomeControl, MountControl, WeatherStation};
pub use imaging::ImagingRig;
pub use locator::{AlwaysVisible, ObjectLocator};
