//! Event publisher port.

use std::future::Future;

use skyshed_domain::error::ObservatoryError;
use skyshed_domain::event::Event;

/// Outbound port for publishing automation events.
///
/// The engine and its control loops publish progress, warnings, and
/// operation outcomes through this trait; the calling layer subscribes via
/// a concrete bus (see [`InProcessEventBus`](crate::event_bus::InProcessEventBus)).
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    ///
    /// Publishing must succeed even when nobody is listening.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ObservatoryError>> + Send;
}
