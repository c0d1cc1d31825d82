//! Automation engine — drives the startup, shutdown, and fix sequences.
//!
//! The engine owns the automation state machine and coordinates the mount,
//! dome, weather station, and imaging collaborators through their ports.
//! Startup and shutdown are serialized by a single-slot gate; the fix
//! sequence is deliberately *not* gated so it can run from inside a failure
//! path, which in turn requires every hardware command it issues to be
//! repeat- and overlap-safe.
//!
//! All hardware errors are caught and classified here; none escape
//! [`startup`](AutomationEngine::startup), [`shutdown`](AutomationEngine::shutdown),
//! or [`fix`](AutomationEngine::fix) — each reports its outcome as a boolean
//! and through published events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use skyshed_domain::error::ObservatoryError;
use skyshed_domain::event::{Event, EventType};
use skyshed_domain::startup::StartupArguments;
use skyshed_domain::state::AutomationState;
use skyshed_domain::target::ObservationTarget;
use skyshed_domain::time::Timestamp;
use skyshed_domain::weather::SafetyStatus;

use crate::ports::{
    DeviceLink, DomeControl, EventPublisher, ImagingRig, MountControl, ObjectLocator,
    WeatherStation,
};
use crate::scheduler::ShutdownScheduler;
use crate::slaving::{SlavingController, SlavingSettings};
use crate::weather_guard::WeatherGuard;

/// Static configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Target the mount is pointed at during startup.
    pub target: ObservationTarget,
    /// Live preview frame rate handed to the imaging rig.
    pub preview_rate: f64,
    /// Slaving loop tuning.
    pub slaving: SlavingSettings,
}

impl EngineSettings {
    /// Settings with default preview rate and slaving tuning.
    #[must_use]
    pub fn new(target: ObservationTarget) -> Self {
        Self {
            target,
            preview_rate: 1.0,
            slaving: SlavingSettings::default(),
        }
    }
}

/// Why a startup run stopped early.
enum StartupHalt {
    /// Weather was not definitively safe; refusal, not a fault.
    UnsafeWeather(SafetyStatus),
    /// A step failed; the observatory must be secured.
    Fatal(ObservatoryError),
}

impl From<ObservatoryError> for StartupHalt {
    fn from(err: ObservatoryError) -> Self {
        Self::Fatal(err)
    }
}

/// Top-level automation engine.
///
/// Constructed once per process with injected port implementations; the
/// state resets to [`AutomationState::Idle`] on every restart.
pub struct AutomationEngine<M, D, W, I, L, P> {
    mount: Arc<M>,
    dome: Arc<D>,
    weather: Arc<W>,
    imaging: Arc<I>,
    locator: Arc<L>,
    publisher: P,
    settings: EngineSettings,
    /// Single-slot gate serializing startup and shutdown.
    gate: tokio::sync::Mutex<()>,
    state: watch::Sender<AutomationState>,
    scheduler: ShutdownScheduler,
    slaving: SlavingController<D, M, P>,
    guard: WeatherGuard<W, P>,
    fix_task: Mutex<Option<JoinHandle<bool>>>,
    auto_shutdown: Mutex<Option<JoinHandle<bool>>>,
    shared: Weak<Self>,
}

impl<M, D, W, I, L, P> AutomationEngine<M, D, W, I, L, P>
where
    M: MountControl + 'static,
    D: DomeControl + 'static,
    W: WeatherStation + 'static,
    I: ImagingRig + 'static,
    L: ObjectLocator + 'static,
    P: EventPublisher + Clone + 'static,
{
    /// Create an engine wired to the given collaborators.
    pub fn new(
        mount: Arc<M>,
        dome: Arc<D>,
        weather: Arc<W>,
        imaging: Arc<I>,
        locator: Arc<L>,
        publisher: P,
        settings: EngineSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|shared| Self {
            slaving: SlavingController::new(
                Arc::clone(&dome),
                Arc::clone(&mount),
                publisher.clone(),
                settings.slaving.clone(),
            ),
            guard: WeatherGuard::new(Arc::clone(&weather), publisher.clone()),
            scheduler: ShutdownScheduler::new(),
            gate: tokio::sync::Mutex::new(()),
            state: watch::Sender::new(AutomationState::Idle),
            fix_task: Mutex::new(None),
            auto_shutdown: Mutex::new(None),
            shared: shared.clone(),
            mount,
            dome,
            weather,
            imaging,
            locator,
            publisher,
            settings,
        })
    }

    /// Current automation state snapshot.
    #[must_use]
    pub fn state(&self) -> AutomationState {
        *self.state.borrow()
    }

    /// Watch channel for observing state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<AutomationState> {
        self.state.subscribe()
    }

    /// Whether dome slaving is currently engaged.
    #[must_use]
    pub fn is_slaving(&self) -> bool {
        self.slaving.is_slaving()
    }

    /// Whether the active slaving session uses the dome's native slaving.
    #[must_use]
    pub fn is_hardware_slaving(&self) -> bool {
        self.slaving.is_hardware_slaving()
    }

    /// The pending scheduled shutdown time, if one is armed.
    #[must_use]
    pub fn scheduled_shutdown(&self) -> Option<Timestamp> {
        self.scheduler.scheduled_for()
    }

    /// Run the startup sequence. Returns `true` only on full success.
    ///
    /// Refused (no state change, no hardware mutation) unless the
    /// automation is idle. A fatal step failure leaves the engine
    /// `Faulted` and auto-invokes [`fix`](Self::fix) as a tracked task.
    pub async fn startup(&self, args: StartupArguments) -> bool {
        let _gate = self.gate.lock().await;
        let state = self.state();
        if !state.permits_startup() {
            self.warn(format!("startup refused: automation is {state}, not idle"))
                .await;
            return false;
        }
        if let Err(err) = args.validate() {
            self.warn(format!("startup refused: {err}")).await;
            return false;
        }
        self.set_state(AutomationState::Starting);
        match self.run_startup(&args).await {
            Ok(()) => {
                self.set_state(AutomationState::InOperation);
                self.announce(
                    EventType::StartupSucceeded,
                    "startup complete, observatory in operation",
                )
                .await;
                if let Some(at) = args.shutdown_time() {
                    self.arm_scheduled_shutdown(at).await;
                }
                true
            }
            Err(StartupHalt::UnsafeWeather(status)) => {
                // a refusal, not a fault: hardware stays connected
                self.set_state(AutomationState::WaitingForWeather);
                self.warn(format!("startup refused: weather is {status}")).await;
                self.set_state(AutomationState::Idle);
                false
            }
            Err(StartupHalt::Fatal(err)) => {
                self.fail(EventType::StartupFailed, &err).await;
                false
            }
        }
    }

    async fn run_startup(&self, args: &StartupArguments) -> Result<(), StartupHalt> {
        self.progress("connecting mount").await;
        self.connect(&*self.mount).await?;
        self.progress("connecting dome").await;
        self.connect(&*self.dome).await?;
        self.progress("connecting weather station").await;
        self.connect(&*self.weather).await?;

        self.progress("arming weather protection").await;
        let safety = self.arm_weather_guard();
        if !safety.is_safe() {
            self.guard.stop();
            return Err(StartupHalt::UnsafeWeather(safety));
        }

        self.progress("opening dome").await;
        self.open_dome().await?;

        self.progress(format!(
            "unparking mount and pointing at {}",
            self.settings.target.name
        ))
        .await;
        self.mount.unpark().await?;
        self.mount.goto_target(&self.settings.target).await?;

        self.progress("engaging dome slaving").await;
        self.slaving.slave_dome_to_mount(None, None).await?;

        self.progress("starting live preview").await;
        self.imaging
            .start_live_preview(self.settings.preview_rate)
            .await?;

        if args.require_in_view {
            self.progress(format!("verifying {} is in view", self.settings.target.name))
                .await;
            let found = self.locator.locate(&self.settings.target).await?;
            if !found {
                return Err(
                    ObservatoryError::ObjectNotLocated(self.settings.target.name.clone()).into(),
                );
            }
        }

        if args.autostart {
            self.progress("starting timed capture loop").await;
            self.imaging.start_capture_loop(args.camera_off_time()).await?;
        }

        Ok(())
    }

    /// Run the shutdown sequence. Returns `true` only on full success.
    ///
    /// Mount park and dome shutter close run concurrently and are always
    /// both awaited; if either ultimately failed the engine ends `Faulted`
    /// and auto-invokes [`fix`](Self::fix).
    pub async fn shutdown(&self) -> bool {
        self.scheduler.interrupt().await;
        let _gate = self.gate.lock().await;
        self.set_state(AutomationState::Closing);
        match self.run_shutdown().await {
            Ok(()) => {
                self.set_state(AutomationState::Idle);
                self.announce(
                    EventType::ShutdownSucceeded,
                    "shutdown complete, observatory idle",
                )
                .await;
                true
            }
            Err(err) => {
                self.fail(EventType::ShutdownFailed, &err).await;
                false
            }
        }
    }

    async fn run_shutdown(&self) -> Result<(), ObservatoryError> {
        self.progress("reconnecting hardware for shutdown").await;
        self.connect(&*self.mount).await?;
        self.connect(&*self.dome).await?;

        self.progress("disarming weather protection").await;
        self.guard.stop();

        self.progress("stopping imaging").await;
        if let Err(err) = self.imaging.stop().await {
            self.warn(format!("imaging did not stop cleanly: {err}")).await;
        }

        self.progress("disengaging dome slaving").await;
        if let Err(err) = self.slaving.unslave_dome_from_mount().await {
            self.warn(format!("could not disengage dome slaving: {err}")).await;
        }

        self.progress("parking mount and closing dome shutter").await;
        let (park, close) = tokio::join!(self.mount.park(), self.dome.close_shutter());
        let mut failed = false;
        if let Err(err) = park {
            failed = true;
            self.report_step_failure(format!("mount park failed: {err}")).await;
        }
        if let Err(err) = close {
            failed = true;
            self.report_step_failure(format!("dome shutter close failed: {err}"))
                .await;
        }
        if failed {
            return Err(ObservatoryError::auto_operations(
                "could not park mount and close dome",
            ));
        }

        // shutter is closed, so a homing failure no longer endangers anything
        if let Err(err) = self.dome.home_or_park().await {
            self.warn(format!("dome homing after close failed: {err}")).await;
        }
        Ok(())
    }

    /// Best-effort recovery: drive the hardware to a safe parked/closed
    /// state. Returns `true` when both the dome and the mount were secured.
    ///
    /// Deliberately not gated — it must be callable from inside a failure
    /// path that still holds the gate. The dome and mount branches run
    /// independently; one failing does not abort the other. When either
    /// fails the engine stays `Faulted` and a critical event is raised:
    /// no further automatic recovery is attempted.
    pub async fn fix(&self) -> bool {
        self.progress("recovery: closing dome and parking mount").await;
        self.set_state(AutomationState::Fixing);
        let (dome, mount) = tokio::join!(self.secure_dome(), self.secure_mount());
        let mut secured = true;
        if let Err(err) = dome {
            secured = false;
            self.report_step_failure(format!("recovery could not secure dome: {err}"))
                .await;
        }
        if let Err(err) = mount {
            secured = false;
            self.report_step_failure(format!("recovery could not secure mount: {err}"))
                .await;
        }
        if secured {
            self.set_state(AutomationState::Idle);
            self.announce(EventType::FixSucceeded, "recovery complete, observatory idle")
                .await;
            true
        } else {
            self.set_state(AutomationState::Faulted);
            let critical =
                ObservatoryError::Critical("recovery failed, hardware may be exposed".into());
            tracing::error!(error = %critical, "automatic recovery gave up");
            self.announce(EventType::FixFailed, critical.to_string()).await;
            self.announce(EventType::Critical, critical.to_string()).await;
            false
        }
    }

    /// Schedule an automatic shutdown at `target`.
    ///
    /// Allowed from idle or in-operation only; replaces any pending
    /// schedule.
    pub async fn set_shutdown(&self, target: Timestamp) -> bool {
        let state = self.state();
        if !state.permits_shutdown_scheduling() {
            self.warn(format!("shutdown scheduling refused: automation is {state}"))
                .await;
            return false;
        }
        self.arm_scheduled_shutdown(target).await;
        true
    }

    /// Cancel the pending scheduled shutdown, if any.
    pub async fn interrupt_shutdown(&self) {
        self.scheduler.interrupt().await;
    }

    /// Await the most recently auto-invoked fix task.
    pub async fn wait_for_fix(&self) -> Option<bool> {
        let handle = lock(&self.fix_task).take()?;
        handle.await.ok()
    }

    /// Await the most recent weather-triggered shutdown task.
    pub async fn wait_for_auto_shutdown(&self) -> Option<bool> {
        let handle = lock(&self.auto_shutdown).take()?;
        handle.await.ok()
    }

    // ── internals ──────────────────────────────────────────────────

    async fn arm_scheduled_shutdown(&self, target: Timestamp) {
        let Some(engine) = self.shared.upgrade() else {
            return;
        };
        self.scheduler.schedule(target, move || async move {
            let _ = engine.shutdown().await;
        });
        self.announce(
            EventType::ShutdownScheduled,
            format!("shutdown scheduled for {target}"),
        )
        .await;
    }

    /// Arm the weather guard with a callback that shuts the observatory
    /// down exactly when the automation is in operation and the new
    /// reading is not definitively safe.
    fn arm_weather_guard(&self) -> SafetyStatus {
        let shared = self.shared.clone();
        self.guard.start(move |status| {
            let shared = shared.clone();
            async move {
                let Some(engine) = shared.upgrade() else {
                    return;
                };
                if engine.state() == AutomationState::InOperation {
                    tracing::warn!(
                        safety = %status,
                        "weather no longer safe while in operation, shutting down"
                    );
                    engine.spawn_auto_shutdown();
                }
            }
        })
    }

    /// Spawn the weather-triggered shutdown as its own tracked task so the
    /// guard (which shutdown disarms) is never cancelled mid-shutdown.
    fn spawn_auto_shutdown(&self) {
        let Some(engine) = self.shared.upgrade() else {
            return;
        };
        let handle = tokio::spawn(async move { engine.shutdown().await });
        *lock(&self.auto_shutdown) = Some(handle);
    }

    fn spawn_fix(&self) {
        let Some(engine) = self.shared.upgrade() else {
            return;
        };
        let handle = tokio::spawn(async move { engine.fix().await });
        *lock(&self.fix_task) = Some(handle);
    }

    async fn connect<T: DeviceLink>(&self, device: &T) -> Result<(), ObservatoryError> {
        if device.is_connected() {
            return Ok(());
        }
        let kind = device.kind();
        match device.connect().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ObservatoryError::connection(
                kind,
                "driver reported no connection",
            )),
            Err(err @ ObservatoryError::Connection { .. }) => Err(err),
            Err(err) => Err(ObservatoryError::connection(kind, err.to_string())),
        }
    }

    /// Home-then-shutter dome open with a one-shot reboot-and-retry.
    async fn open_dome(&self) -> Result<(), ObservatoryError> {
        if let Err(err) = self.try_open_dome().await {
            self.warn(format!(
                "dome open failed ({err}), power-cycling dome connection and retrying"
            ))
            .await;
            self.reboot_dome().await?;
            if self.try_open_dome().await.is_err() {
                return Err(ObservatoryError::auto_operations("could not open dome"));
            }
        }
        Ok(())
    }

    async fn try_open_dome(&self) -> Result<(), ObservatoryError> {
        // home first: shutter power is only guaranteed at the home azimuth
        self.dome.home_or_park().await?;
        if !(self.dome.at_home().await? || self.dome.at_park().await?) {
            return Err(ObservatoryError::auto_operations(
                "dome did not reach its home position",
            ));
        }
        self.dome.open_shutter().await
    }

    async fn reboot_dome(&self) -> Result<(), ObservatoryError> {
        self.dome.disconnect().await?;
        self.connect(&*self.dome).await
    }

    async fn secure_dome(&self) -> Result<(), ObservatoryError> {
        // halt any rotation in progress before driving the shutter
        if let Err(err) = self.dome.stop_all_motion().await {
            tracing::warn!(error = %err, "could not halt dome motion");
        }
        self.dome.close_shutter().await?;
        self.dome.home_or_park().await
    }

    async fn secure_mount(&self) -> Result<(), ObservatoryError> {
        self.mount.park().await
    }

    /// Classify a fatal sequence failure: publish it, fault the state
    /// machine, and auto-invoke recovery as a tracked task.
    async fn fail(&self, outcome: EventType, err: &ObservatoryError) {
        tracing::error!(error = %err, "automation sequence failed");
        self.announce(outcome, err.to_string()).await;
        self.set_state(AutomationState::Faulted);
        self.spawn_fix();
    }

    fn set_state(&self, next: AutomationState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "automation state changed");
        }
    }

    async fn progress(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        let _ = self.publisher.publish(Event::progress(message)).await;
    }

    async fn warn(&self, message: String) {
        tracing::warn!("{message}");
        let _ = self.publisher.publish(Event::warning(message)).await;
    }

    /// An individually reported, non-fatal step failure inside a sequence
    /// whose combined outcome is decided later.
    async fn report_step_failure(&self, message: String) {
        tracing::error!("{message}");
        let _ = self.publisher.publish(Event::warning(message)).await;
    }

    async fn announce(&self, event_type: EventType, message: impl Into<String>) {
        let _ = self
            .publisher
            .publish(Event::message(event_type, message))
            .await;
    }
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
