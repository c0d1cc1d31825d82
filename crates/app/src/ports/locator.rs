//! Object locator port — the startup in-view check.

use std::future::Future;

use skyshed_domain::error::ObservatoryError;
use skyshed_domain::target::ObservationTarget;

/// Pluggable capability that verifies the configured target is actually in
/// view (e.g. by plate-solving a preview frame).
pub trait ObjectLocator: Send + Sync {
    /// Whether the target could be located.
    fn locate(
        &self,
        target: &ObservationTarget,
    ) -> impl Future<Output = Result<bool, ObservatoryError>> + Send;
}

/// Default locator that reports every target as visible.
///
/// This is an explicit stand-in for installations without a plate solver,
/// not a silent success: wiring it up is a deliberate configuration choice,
/// and startups with `require_in_view` will always pass the check.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl ObjectLocator for AlwaysVisible {
    fn locate(
        &self,
        _target: &ObservationTarget,
    ) -> impl Future<Output = Result<bool, ObservatoryError>> + Send {
        async { Ok(true) }
    }
}
