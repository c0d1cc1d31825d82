//! # skyshed-app
//!
//! Application layer — automation sequences and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `MountControl`, `DomeControl`, `WeatherStation` — hardware capabilities
//!   - `ImagingRig` — preview and timed capture loops
//!   - `ObjectLocator` — pluggable target-visibility check
//!   - `EventPublisher` — event sink
//! - Provide the **automation core**:
//!   - `AutomationEngine` — startup/shutdown/fix state machine with the
//!     single-slot gate serializing startup and shutdown
//!   - `SlavingController` — dome-to-mount azimuth synchronization
//!   - `WeatherGuard` — weather-safety observation and unsafe callbacks
//!   - `ShutdownScheduler` — cancellable delayed shutdown trigger
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `skyshed-domain` only (plus `tokio::sync`/`tokio::time`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod engine;
pub mod event_bus;
pub mod ports;
pub mod scheduler;
pub mod slaving;
pub mod weather_guard;

#[cfg(test)]
mod test_support;
