//! Simulated observatory hardware.

mod dome;
mod imaging;
mod mount;
mod weather;

pub use dome::VirtualDome;
pub use imaging::{ImagingActivity, VirtualImaging};
pub use mount::VirtualMount;
pub use weather::VirtualWeather;

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One-shot fault switchboard for a simulated device.
///
/// Arming an operation name makes the *next* call to that operation fail;
/// the fault is consumed by the failing call. Used by tests and demos to
/// exercise the engine's failure paths against otherwise healthy hardware.
#[derive(Default)]
pub struct FaultPlan {
    armed: Mutex<HashSet<String>>,
}

impl FaultPlan {
    /// Arm a fault for the named operation.
    pub fn arm(&self, operation: impl Into<String>) {
        lock(&self.armed).insert(operation.into());
    }

    /// Check for an armed fault and consume it.
    pub(crate) fn trips(&self, operation: &str) -> bool {
        lock(&self.armed).remove(operation)
    }
}

fn lock(armed: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    armed.lock().unwrap_or_else(PoisonError::into_inner)
}
