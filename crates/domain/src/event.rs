//! Event — an immutable record of something the automation did or observed.
//!
//! Events are the progress sink and the outcome channel of the engine:
//! every major step publishes a [`EventType::Progress`] event before it runs
//! and a success/failure event after. Warnings travel here too; they never
//! become `Result` errors.

use serde::{Deserialize, Serialize};

use crate::id::EventId;
use crate::time::{Timestamp, now};

/// The kind of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Human-readable step message, emitted before each major step.
    Progress,
    /// Refused precondition or tolerated drift; informational only.
    Warning,
    StartupSucceeded,
    StartupFailed,
    ShutdownScheduled,
    ShutdownSucceeded,
    ShutdownFailed,
    FixSucceeded,
    FixFailed,
    /// The weather safety tri-state changed.
    WeatherChanged,
    /// The new weather reading is not definitively safe.
    WeatherUnsafe,
    /// Automatic recovery failed; operator intervention required.
    Critical,
}

/// An immutable automation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub timestamp: Timestamp,
    /// Free-form payload; always carries a `"message"` key for the
    /// human-readable sink.
    pub data: serde_json::Value,
}

impl Event {
    /// Create a new event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            timestamp: now(),
            data,
        }
    }

    /// Create an event that carries only a message.
    #[must_use]
    pub fn message(event_type: EventType, message: impl Into<String>) -> Self {
        Self::new(event_type, serde_json::json!({ "message": message.into() }))
    }

    /// Create a progress event.
    #[must_use]
    pub fn progress(message: impl Into<String>) -> Self {
        Self::message(EventType::Progress, message)
    }

    /// Create a warning event.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::message(EventType::Warning, message)
    }

    /// The human-readable message, when present.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.data.get("message").and_then(serde_json::Value::as_str)
    }
}
