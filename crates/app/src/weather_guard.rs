//! Weather guard — observes weather-safety changes and raises the alarm.
//!
//! Purely observational: the guard publishes change/unsafe events and hands
//! any not-definitively-safe reading to a caller-supplied callback. It never
//! retries and never touches hardware. The engine's callback decides whether
//! an automatic shutdown is warranted.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use skyshed_domain::event::{Event, EventType};
use skyshed_domain::weather::SafetyStatus;

use crate::ports::{EventPublisher, WeatherStation};

/// Weather-safety watchdog over a [`WeatherStation`]'s update stream.
pub struct WeatherGuard<W, P> {
    station: Arc<W>,
    publisher: P,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<W, P> WeatherGuard<W, P>
where
    W: WeatherStation + 'static,
    P: EventPublisher + Clone + 'static,
{
    /// Create a disarmed guard.
    pub fn new(station: Arc<W>, publisher: P) -> Self {
        Self {
            station,
            publisher,
            task: Mutex::new(None),
        }
    }

    /// Whether the guard is currently observing updates.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        lock(&self.task).is_some()
    }

    /// Arm the guard and return the current safety snapshot.
    ///
    /// For every update whose tri-state differs from the last known value, a
    /// [`EventType::WeatherChanged`] event is published; when the new value
    /// is not definitively safe (unknown counts as unsafe), a
    /// [`EventType::WeatherUnsafe`] event is published and `on_unsafe` runs.
    ///
    /// Re-arming replaces any previous subscription.
    pub fn start<F, Fut>(&self, on_unsafe: F) -> SafetyStatus
    where
        F: Fn(SafetyStatus) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.stop();

        let mut updates = self.station.subscribe();
        let snapshot = self.station.safety();
        let publisher = self.publisher.clone();
        let handle = tokio::spawn(async move {
            let mut last = snapshot;
            while updates.changed().await.is_ok() {
                let current = *updates.borrow_and_update();
                if current == last {
                    continue;
                }
                tracing::info!(from = %last, to = %current, "weather safety changed");
                let _ = publisher
                    .publish(Event::new(
                        EventType::WeatherChanged,
                        serde_json::json!({
                            "from": last,
                            "to": current,
                            "message": format!("weather safety changed: {last} -> {current}"),
                        }),
                    ))
                    .await;
                if !current.is_safe() {
                    let _ = publisher
                        .publish(Event::message(
                            EventType::WeatherUnsafe,
                            format!("weather is {current}, observatory must close"),
                        ))
                        .await;
                    on_unsafe(current).await;
                }
                last = current;
            }
        });
        *lock(&self.task) = Some(handle);

        tracing::info!(safety = %snapshot, "weather protection armed");
        snapshot
    }

    /// Disarm the guard and stop observing updates.
    pub fn stop(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
            tracing::info!("weather protection disarmed");
        }
    }
}

fn lock(task: &Mutex<Option<JoinHandle<()>>>) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    task.lock().unwrap_or_else(PoisonError::into_inner)
}
