//! Shared in-memory fakes for the automation core's unit tests.
//!
//! Every fake records the commands it receives in a [`CommandLog`] so tests
//! can assert on what hardware was (or was not) asked to do.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};

use skyshed_domain::error::{DeviceKind, ObservatoryError};
use skyshed_domain::event::{Event, EventType};
use skyshed_domain::target::ObservationTarget;
use skyshed_domain::time::Timestamp;
use skyshed_domain::weather::SafetyStatus;

use crate::ports::{
    DeviceLink, DomeControl, EventPublisher, ImagingRig, MountControl, ObjectLocator,
    WeatherStation,
};

/// Shared, clonable command recorder.
#[derive(Clone, Default)]
pub struct CommandLog(Arc<Mutex<Vec<String>>>);

impl CommandLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Event publisher that records everything it is given.
#[derive(Clone, Default)]
pub struct SpyPublisher {
    events: Arc<Mutex<Vec<Event>>>,
}

impl SpyPublisher {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn of_type(&self, event_type: EventType) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn has_message_containing(&self, event_type: EventType, needle: &str) -> bool {
        self.of_type(event_type)
            .iter()
            .any(|e| e.text().is_some_and(|m| m.contains(needle)))
    }
}

impl EventPublisher for SpyPublisher {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ObservatoryError>> + Send {
        self.events.lock().unwrap().push(event);
        async { Ok(()) }
    }
}

// ── Fake mount ─────────────────────────────────────────────────────

pub struct FakeMount {
    pub log: CommandLog,
    connected: AtomicBool,
    azimuth: Mutex<f64>,
    parked: AtomicBool,
    pub fail_connect: AtomicBool,
    pub fail_unpark: AtomicBool,
    pub fail_park: AtomicBool,
    pub fail_goto: AtomicBool,
    slew_tx: broadcast::Sender<f64>,
}

impl FakeMount {
    pub fn new() -> Self {
        let (slew_tx, _) = broadcast::channel(16);
        Self {
            log: CommandLog::default(),
            connected: AtomicBool::new(false),
            azimuth: Mutex::new(0.0),
            parked: AtomicBool::new(true),
            fail_connect: AtomicBool::new(false),
            fail_unpark: AtomicBool::new(false),
            fail_park: AtomicBool::new(false),
            fail_goto: AtomicBool::new(false),
            slew_tx,
        }
    }

    pub fn set_azimuth(&self, azimuth: f64) {
        *self.azimuth.lock().unwrap() = azimuth;
    }

    pub fn notify_slewed(&self) {
        let azimuth = *self.azimuth.lock().unwrap();
        let _ = self.slew_tx.send(azimuth);
    }

    pub fn is_parked(&self) -> bool {
        self.parked.load(Ordering::SeqCst)
    }
}

impl DeviceLink for FakeMount {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Mount
    }

    async fn connect(&self) -> Result<bool, ObservatoryError> {
        self.log.push("mount.connect");
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ObservatoryError::connection(
                DeviceKind::Mount,
                "simulated connect failure",
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), ObservatoryError> {
        self.log.push("mount.disconnect");
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl MountControl for FakeMount {
    async fn unpark(&self) -> Result<(), ObservatoryError> {
        self.log.push("mount.unpark");
        if self.fail_unpark.load(Ordering::SeqCst) {
            return Err(ObservatoryError::auto_operations("simulated unpark failure"));
        }
        self.parked.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn park(&self) -> Result<(), ObservatoryError> {
        self.log.push("mount.park");
        if self.fail_park.load(Ordering::SeqCst) {
            return Err(ObservatoryError::auto_operations("simulated park failure"));
        }
        self.parked.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn goto_target(&self, target: &ObservationTarget) -> Result<(), ObservatoryError> {
        self.log.push(format!("mount.goto {}", target.name));
        if self.fail_goto.load(Ordering::SeqCst) {
            return Err(ObservatoryError::auto_operations("simulated goto failure"));
        }
        Ok(())
    }

    async fn azimuth(&self) -> Result<f64, ObservatoryError> {
        Ok(*self.azimuth.lock().unwrap())
    }

    fn slew_events(&self) -> broadcast::Receiver<f64> {
        self.slew_tx.subscribe()
    }
}

// ── Fake dome ──────────────────────────────────────────────────────

pub struct FakeDome {
    pub log: CommandLog,
    can_slave: bool,
    connected: AtomicBool,
    azimuth: Mutex<f64>,
    open: AtomicBool,
    slaved: AtomicBool,
    pub fail_connect: AtomicBool,
    pub fail_close: AtomicBool,
    pub fail_home: AtomicBool,
    fail_open_remaining: AtomicUsize,
}

impl FakeDome {
    pub fn new(can_slave: bool) -> Self {
        Self {
            log: CommandLog::default(),
            can_slave,
            connected: AtomicBool::new(false),
            azimuth: Mutex::new(0.0),
            open: AtomicBool::new(false),
            slaved: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            fail_home: AtomicBool::new(false),
            fail_open_remaining: AtomicUsize::new(0),
        }
    }

    pub fn set_azimuth(&self, azimuth: f64) {
        *self.azimuth.lock().unwrap() = azimuth;
    }

    /// Make the next `count` shutter-open commands fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.fail_open_remaining.store(count, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl DeviceLink for FakeDome {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Dome
    }

    async fn connect(&self) -> Result<bool, ObservatoryError> {
        self.log.push("dome.connect");
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ObservatoryError::connection(
                DeviceKind::Dome,
                "simulated connect failure",
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), ObservatoryError> {
        self.log.push("dome.disconnect");
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl DomeControl for FakeDome {
    async fn slew_to_azimuth(&self, azimuth: f64) -> Result<(), ObservatoryError> {
        self.log.push(format!("dome.slew_to_azimuth {azimuth}"));
        Ok(())
    }

    async fn open_shutter(&self) -> Result<(), ObservatoryError> {
        self.log.push("dome.open_shutter");
        let remaining = self.fail_open_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_open_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ObservatoryError::auto_operations("simulated shutter failure"));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close_shutter(&self) -> Result<(), ObservatoryError> {
        self.log.push("dome.close_shutter");
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(ObservatoryError::auto_operations(
                "simulated shutter close failure",
            ));
        }
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn home_or_park(&self) -> Result<(), ObservatoryError> {
        self.log.push("dome.home_or_park");
        if self.fail_home.load(Ordering::SeqCst) {
            return Err(ObservatoryError::auto_operations("simulated homing failure"));
        }
        Ok(())
    }

    async fn set_slaved(&self, slaved: bool) -> Result<(), ObservatoryError> {
        self.log.push(format!("dome.set_slaved {slaved}"));
        self.slaved.store(slaved, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_all_motion(&self) -> Result<(), ObservatoryError> {
        self.log.push("dome.stop_all_motion");
        Ok(())
    }

    async fn azimuth(&self) -> Result<f64, ObservatoryError> {
        Ok(*self.azimuth.lock().unwrap())
    }

    async fn at_home(&self) -> Result<bool, ObservatoryError> {
        Ok(true)
    }

    async fn at_park(&self) -> Result<bool, ObservatoryError> {
        Ok(true)
    }

    async fn is_slewing(&self) -> Result<bool, ObservatoryError> {
        Ok(false)
    }

    async fn is_slaved(&self) -> Result<bool, ObservatoryError> {
        Ok(self.slaved.load(Ordering::SeqCst))
    }

    fn can_slave(&self) -> bool {
        self.can_slave
    }
}

// ── Fake weather station ───────────────────────────────────────────

pub struct FakeWeather {
    pub log: CommandLog,
    connected: AtomicBool,
    safety_tx: watch::Sender<SafetyStatus>,
}

impl FakeWeather {
    pub fn new(safety: SafetyStatus) -> Self {
        Self {
            log: CommandLog::default(),
            connected: AtomicBool::new(false),
            safety_tx: watch::Sender::new(safety),
        }
    }

    pub fn set_safety(&self, safety: SafetyStatus) {
        self.safety_tx.send_replace(safety);
    }
}

impl DeviceLink for FakeWeather {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Weather
    }

    async fn connect(&self) -> Result<bool, ObservatoryError> {
        self.log.push("weather.connect");
        self.connected.store(true, Ordering::SeqCst);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), ObservatoryError> {
        self.log.push("weather.disconnect");
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl WeatherStation for FakeWeather {
    fn safety(&self) -> SafetyStatus {
        *self.safety_tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<SafetyStatus> {
        self.safety_tx.subscribe()
    }
}

// ── Fake imaging rig ───────────────────────────────────────────────

pub struct FakeImaging {
    pub log: CommandLog,
    pub fail_preview: AtomicBool,
}

impl FakeImaging {
    pub fn new() -> Self {
        Self {
            log: CommandLog::default(),
            fail_preview: AtomicBool::new(false),
        }
    }
}

impl ImagingRig for FakeImaging {
    async fn start_live_preview(&self, frames_per_second: f64) -> Result<(), ObservatoryError> {
        self.log.push(format!("imaging.preview {frames_per_second}"));
        if self.fail_preview.load(Ordering::SeqCst) {
            return Err(ObservatoryError::auto_operations("simulated preview failure"));
        }
        Ok(())
    }

    async fn start_capture_loop(&self, until: Option<Timestamp>) -> Result<(), ObservatoryError> {
        match until {
            Some(until) => self.log.push(format!("imaging.capture until {until}")),
            None => self.log.push("imaging.capture open-ended"),
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ObservatoryError> {
        self.log.push("imaging.stop");
        Ok(())
    }
}

// ── Fixed-answer object locator ────────────────────────────────────

pub struct FixedLocator {
    pub found: bool,
}

impl ObjectLocator for FixedLocator {
    async fn locate(&self, _target: &ObservationTarget) -> Result<bool, ObservatoryError> {
        Ok(self.found)
    }
}
