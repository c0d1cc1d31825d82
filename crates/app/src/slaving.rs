//! Slaving controller — keeps the dome aperture azimuth synchronized with
//! the telescope mount's pointing azimuth.
//!
//! Two modes. When the dome driver supports native slaving (and software
//! mode is not forced), the driver tracks the mount itself and this
//! controller only runs periodic *checkups* that verify the tolerance is
//! honored. Otherwise the controller runs periodic *active corrections*
//! that slew the dome whenever it drifts outside tolerance. Both modes also
//! subscribe to the mount's slew notifications for an extra immediate
//! correction.
//!
//! Periodic and slew-triggered corrections can race on the same dome, so
//! every dome command goes through a per-dome command lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use skyshed_domain::azimuth;
use skyshed_domain::error::ObservatoryError;
use skyshed_domain::event::Event;

use crate::ports::{DomeControl, EventPublisher, MountControl};

/// Tuning for the slaving loops.
#[derive(Debug, Clone)]
pub struct SlavingSettings {
    /// Maximum tolerated dome/mount azimuth separation, in degrees.
    pub tolerance_degrees: f64,
    /// Correction period in software mode.
    pub software_interval: Duration,
    /// Verification period in hardware mode.
    pub checkup_interval: Duration,
    /// Run software corrections even when the dome can slave natively.
    pub force_software: bool,
}

impl Default for SlavingSettings {
    fn default() -> Self {
        Self {
            tolerance_degrees: 3.0,
            software_interval: Duration::from_secs(10),
            checkup_interval: Duration::from_secs(60),
            force_software: false,
        }
    }
}

struct SlavingSession {
    hardware: bool,
    periodic: JoinHandle<()>,
    on_slew: JoinHandle<()>,
}

/// Dome-to-mount azimuth synchronization.
pub struct SlavingController<D, M, P> {
    dome: Arc<D>,
    mount: Arc<M>,
    publisher: P,
    settings: SlavingSettings,
    command_lock: Arc<AsyncMutex<()>>,
    session: Mutex<Option<SlavingSession>>,
}

impl<D, M, P> SlavingController<D, M, P>
where
    D: DomeControl + 'static,
    M: MountControl + 'static,
    P: EventPublisher + Clone + 'static,
{
    /// Create a controller for the given dome/mount pair.
    pub fn new(dome: Arc<D>, mount: Arc<M>, publisher: P, settings: SlavingSettings) -> Self {
        Self {
            dome,
            mount,
            publisher,
            settings,
            command_lock: Arc::new(AsyncMutex::new(())),
            session: Mutex::new(None),
        }
    }

    /// Whether a slaving session is active.
    #[must_use]
    pub fn is_slaving(&self) -> bool {
        lock(&self.session).is_some()
    }

    /// Whether the active session uses the driver's native slaving.
    #[must_use]
    pub fn is_hardware_slaving(&self) -> bool {
        lock(&self.session).as_ref().is_some_and(|session| session.hardware)
    }

    /// Engage slaving. No-op when a session is already active.
    ///
    /// Performs one immediate correction, selects the mode, and spawns the
    /// periodic and slew-triggered loops. `interval` overrides the software
    /// correction period, `checkup` the hardware verification period.
    ///
    /// # Errors
    ///
    /// Returns an error when hardware mode is selected and engaging the
    /// driver's native slaving fails.
    pub async fn slave_dome_to_mount(
        &self,
        interval: Option<Duration>,
        checkup: Option<Duration>,
    ) -> Result<(), ObservatoryError> {
        if self.is_slaving() {
            return Ok(());
        }

        let tolerance = self.settings.tolerance_degrees;
        correct_once(
            &*self.dome,
            &*self.mount,
            &self.publisher,
            &self.command_lock,
            tolerance,
        )
        .await;

        let hardware = self.dome.can_slave() && !self.settings.force_software;
        if hardware {
            self.dome.set_slaved(true).await?;
        }
        let period = if hardware {
            checkup.unwrap_or(self.settings.checkup_interval)
        } else {
            interval.unwrap_or(self.settings.software_interval)
        };

        let periodic = {
            let dome = Arc::clone(&self.dome);
            let mount = Arc::clone(&self.mount);
            let publisher = self.publisher.clone();
            let command_lock = Arc::clone(&self.command_lock);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                // the first tick resolves immediately; the immediate
                // correction above already covered it
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if hardware {
                        checkup_once(&*dome, &*mount, &publisher, tolerance).await;
                    } else {
                        correct_once(&*dome, &*mount, &publisher, &command_lock, tolerance).await;
                    }
                }
            })
        };

        let on_slew = {
            let dome = Arc::clone(&self.dome);
            let mount = Arc::clone(&self.mount);
            let publisher = self.publisher.clone();
            let command_lock = Arc::clone(&self.command_lock);
            let mut slews = self.mount.slew_events();
            tokio::spawn(async move {
                loop {
                    match slews.recv().await {
                        Ok(_) => {
                            correct_once(&*dome, &*mount, &publisher, &command_lock, tolerance)
                                .await;
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        };

        *lock(&self.session) = Some(SlavingSession {
            hardware,
            periodic,
            on_slew,
        });
        tracing::info!(
            mode = if hardware { "hardware" } else { "software" },
            period_secs = period.as_secs_f64(),
            "dome slaving engaged"
        );
        Ok(())
    }

    /// Disengage slaving and clear the session. No-op when not slaving.
    ///
    /// # Errors
    ///
    /// Returns an error when disengaging the driver's native slaving fails;
    /// the session is cleared regardless.
    pub async fn unslave_dome_from_mount(&self) -> Result<(), ObservatoryError> {
        let Some(session) = lock(&self.session).take() else {
            return Ok(());
        };
        session.periodic.abort();
        session.on_slew.abort();
        if session.hardware {
            self.dome.set_slaved(false).await?;
        }
        tracing::info!("dome slaving disengaged");
        Ok(())
    }
}

fn lock(session: &Mutex<Option<SlavingSession>>) -> MutexGuard<'_, Option<SlavingSession>> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read both azimuths, warning and skipping the cycle on any invalid reading.
async fn read_azimuths<D, M, P>(dome: &D, mount: &M, publisher: &P) -> Option<(f64, f64)>
where
    D: DomeControl,
    M: MountControl,
    P: EventPublisher,
{
    let dome_azimuth = match dome.azimuth().await {
        Ok(azimuth) => azimuth,
        Err(err) => {
            warn_skip(publisher, format!("could not read dome azimuth: {err}")).await;
            return None;
        }
    };
    let mount_azimuth = match mount.azimuth().await {
        Ok(azimuth) => azimuth,
        Err(err) => {
            warn_skip(publisher, format!("could not read mount azimuth: {err}")).await;
            return None;
        }
    };
    if !azimuth::is_valid(dome_azimuth) || !azimuth::is_valid(mount_azimuth) {
        warn_skip(
            publisher,
            format!("invalid azimuth reading (dome {dome_azimuth}, mount {mount_azimuth})"),
        )
        .await;
        return None;
    }
    Some((dome_azimuth, mount_azimuth))
}

/// Software-mode correction: slew the dome onto the mount azimuth when the
/// separation exceeds tolerance.
async fn correct_once<D, M, P>(
    dome: &D,
    mount: &M,
    publisher: &P,
    command_lock: &AsyncMutex<()>,
    tolerance: f64,
) where
    D: DomeControl,
    M: MountControl,
    P: EventPublisher,
{
    let Some((dome_azimuth, mount_azimuth)) = read_azimuths(dome, mount, publisher).await else {
        return;
    };
    if azimuth::separation(dome_azimuth, mount_azimuth) <= tolerance {
        return;
    }
    // let a move already in flight finish before commanding another
    if dome.is_slewing().await.unwrap_or(false) {
        return;
    }
    let _command = command_lock.lock().await;
    tracing::debug!(dome_azimuth, mount_azimuth, "correcting dome azimuth");
    if let Err(err) = dome.slew_to_azimuth(mount_azimuth).await {
        warn_skip(publisher, format!("dome correction slew failed: {err}")).await;
    }
}

/// Hardware-mode checkup: verify the driver keeps the dome within
/// tolerance; commands nothing.
async fn checkup_once<D, M, P>(dome: &D, mount: &M, publisher: &P, tolerance: f64)
where
    D: DomeControl,
    M: MountControl,
    P: EventPublisher,
{
    if let Ok(false) = dome.is_slaved().await {
        warn_skip(
            publisher,
            "dome driver no longer reports slaving engaged".to_string(),
        )
        .await;
        return;
    }
    let Some((dome_azimuth, mount_azimuth)) = read_azimuths(dome, mount, publisher).await else {
        return;
    };
    let drift = azimuth::separation(dome_azimuth, mount_azimuth);
    if drift > tolerance {
        warn_skip(
            publisher,
            format!(
                "hardware slaving drift of {drift:.1} deg exceeds tolerance of {tolerance:.1} deg"
            ),
        )
        .await;
    }
}

async fn warn_skip<P: EventPublisher>(publisher: &P, message: String) {
    tracing::warn!("{message}");
    let _ = publisher.publish(Event::warning(message)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeDome, FakeMount, SpyPublisher};
    use skyshed_domain::event::EventType;

    const FAST: Duration = Duration::from_millis(10);
    const SETTLE: Duration = Duration::from_millis(120);

    fn controller(
        dome: Arc<FakeDome>,
        mount: Arc<FakeMount>,
        publisher: SpyPublisher,
    ) -> SlavingController<FakeDome, FakeMount, SpyPublisher> {
        let settings = SlavingSettings {
            tolerance_degrees: 3.0,
            software_interval: FAST,
            checkup_interval: Duration::from_secs(3600),
            force_software: false,
        };
        SlavingController::new(dome, mount, publisher, settings)
    }

    #[tokio::test]
    async fn should_use_software_mode_for_non_capable_dome() {
        let dome = Arc::new(FakeDome::new(false));
        let mount = Arc::new(FakeMount::new());
        let slaving = controller(Arc::clone(&dome), mount, SpyPublisher::default());

        slaving.slave_dome_to_mount(None, None).await.unwrap();

        assert!(slaving.is_slaving());
        assert!(!slaving.is_hardware_slaving());
        assert!(!dome.log.contains("dome.set_slaved true"));
    }

    #[tokio::test]
    async fn should_use_hardware_mode_for_capable_dome() {
        let dome = Arc::new(FakeDome::new(true));
        let mount = Arc::new(FakeMount::new());
        let slaving = controller(Arc::clone(&dome), mount, SpyPublisher::default());

        slaving.slave_dome_to_mount(None, None).await.unwrap();

        assert!(slaving.is_slaving());
        assert!(slaving.is_hardware_slaving());
        assert!(dome.log.contains("dome.set_slaved true"));
    }

    #[tokio::test]
    async fn should_force_software_mode_when_configured() {
        let dome = Arc::new(FakeDome::new(true));
        let mount = Arc::new(FakeMount::new());
        let settings = SlavingSettings {
            force_software: true,
            ..SlavingSettings::default()
        };
        let slaving =
            SlavingController::new(Arc::clone(&dome), mount, SpyPublisher::default(), settings);

        slaving.slave_dome_to_mount(None, None).await.unwrap();

        assert!(!slaving.is_hardware_slaving());
        assert!(!dome.log.contains("dome.set_slaved true"));
    }

    #[tokio::test]
    async fn should_correct_immediately_when_out_of_tolerance() {
        let dome = Arc::new(FakeDome::new(false));
        let mount = Arc::new(FakeMount::new());
        dome.set_azimuth(10.0);
        mount.set_azimuth(100.0);
        let slaving = controller(Arc::clone(&dome), Arc::clone(&mount), SpyPublisher::default());

        slaving.slave_dome_to_mount(None, Some(Duration::from_secs(3600))).await.unwrap();

        assert!(dome.log.contains("dome.slew_to_azimuth 100"));
    }

    #[tokio::test]
    async fn should_not_correct_within_tolerance() {
        let dome = Arc::new(FakeDome::new(false));
        let mount = Arc::new(FakeMount::new());
        dome.set_azimuth(100.0);
        mount.set_azimuth(101.0);
        let slaving = controller(Arc::clone(&dome), Arc::clone(&mount), SpyPublisher::default());

        slaving.slave_dome_to_mount(None, None).await.unwrap();

        assert_eq!(dome.log.count("dome.slew_to_azimuth"), 0);
    }

    #[tokio::test]
    async fn should_run_periodic_corrections_in_software_mode() {
        let dome = Arc::new(FakeDome::new(false));
        let mount = Arc::new(FakeMount::new());
        dome.set_azimuth(10.0);
        mount.set_azimuth(200.0);
        let slaving = controller(Arc::clone(&dome), Arc::clone(&mount), SpyPublisher::default());

        slaving
            .slave_dome_to_mount(Some(FAST), None)
            .await
            .unwrap();
        tokio::time::sleep(SETTLE).await;

        // immediate correction plus several periodic ones; the fake dome
        // stays put so every cycle issues a slew
        assert!(dome.log.count("dome.slew_to_azimuth") >= 3);
    }

    #[tokio::test]
    async fn should_not_slew_dome_in_hardware_mode() {
        let dome = Arc::new(FakeDome::new(true));
        let mount = Arc::new(FakeMount::new());
        // within tolerance at engage time so the immediate correction is quiet
        dome.set_azimuth(100.0);
        mount.set_azimuth(100.0);
        let slaving = controller(Arc::clone(&dome), Arc::clone(&mount), SpyPublisher::default());

        slaving
            .slave_dome_to_mount(None, Some(FAST))
            .await
            .unwrap();
        mount.set_azimuth(250.0);
        tokio::time::sleep(SETTLE).await;

        assert_eq!(dome.log.count("dome.slew_to_azimuth"), 0);
    }

    #[tokio::test]
    async fn should_warn_on_hardware_slaving_drift() {
        let dome = Arc::new(FakeDome::new(true));
        let mount = Arc::new(FakeMount::new());
        dome.set_azimuth(100.0);
        mount.set_azimuth(100.0);
        let publisher = SpyPublisher::default();
        let slaving = controller(Arc::clone(&dome), Arc::clone(&mount), publisher.clone());

        slaving
            .slave_dome_to_mount(None, Some(FAST))
            .await
            .unwrap();
        mount.set_azimuth(250.0);
        tokio::time::sleep(SETTLE).await;

        let warnings = publisher.of_type(EventType::Warning);
        assert!(
            warnings
                .iter()
                .any(|e| e.text().is_some_and(|m| m.contains("drift"))),
            "expected a drift warning, got {warnings:?}"
        );
    }

    #[tokio::test]
    async fn should_warn_and_skip_cycle_on_invalid_azimuth() {
        let dome = Arc::new(FakeDome::new(false));
        let mount = Arc::new(FakeMount::new());
        dome.set_azimuth(f64::NAN);
        mount.set_azimuth(120.0);
        let publisher = SpyPublisher::default();
        let slaving = controller(Arc::clone(&dome), Arc::clone(&mount), publisher.clone());

        slaving
            .slave_dome_to_mount(None, Some(Duration::from_secs(3600)))
            .await
            .unwrap();

        assert_eq!(dome.log.count("dome.slew_to_azimuth"), 0);
        let warnings = publisher.of_type(EventType::Warning);
        assert!(
            warnings
                .iter()
                .any(|e| e.text().is_some_and(|m| m.contains("invalid azimuth")))
        );
    }

    #[tokio::test]
    async fn should_correct_when_mount_reports_slew_completed() {
        let dome = Arc::new(FakeDome::new(false));
        let mount = Arc::new(FakeMount::new());
        dome.set_azimuth(100.0);
        mount.set_azimuth(100.0);
        let slaving = controller(Arc::clone(&dome), Arc::clone(&mount), SpyPublisher::default());

        slaving
            .slave_dome_to_mount(Some(Duration::from_secs(3600)), None)
            .await
            .unwrap();
        assert_eq!(dome.log.count("dome.slew_to_azimuth"), 0);

        mount.set_azimuth(200.0);
        mount.notify_slewed();
        tokio::time::sleep(SETTLE).await;

        assert!(dome.log.contains("dome.slew_to_azimuth 200"));
    }

    #[tokio::test]
    async fn should_be_noop_when_already_slaving() {
        let dome = Arc::new(FakeDome::new(true));
        let mount = Arc::new(FakeMount::new());
        let slaving = controller(Arc::clone(&dome), mount, SpyPublisher::default());

        slaving.slave_dome_to_mount(None, None).await.unwrap();
        slaving.slave_dome_to_mount(None, None).await.unwrap();

        assert_eq!(dome.log.count("dome.set_slaved true"), 1);
    }

    #[tokio::test]
    async fn should_clear_session_and_disable_hardware_slaving_on_unslave() {
        let dome = Arc::new(FakeDome::new(true));
        let mount = Arc::new(FakeMount::new());
        let slaving = controller(Arc::clone(&dome), Arc::clone(&mount), SpyPublisher::default());

        slaving.slave_dome_to_mount(None, Some(FAST)).await.unwrap();
        slaving.unslave_dome_from_mount().await.unwrap();

        assert!(!slaving.is_slaving());
        assert!(dome.log.contains("dome.set_slaved false"));

        // loops are gone: a slew notification must not correct any more
        mount.set_azimuth(300.0);
        mount.notify_slewed();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dome.log.count("dome.slew_to_azimuth"), 0);
    }

    #[tokio::test]
    async fn should_tolerate_unslave_when_not_slaving() {
        let dome = Arc::new(FakeDome::new(true));
        let mount = Arc::new(FakeMount::new());
        let slaving = controller(dome, mount, SpyPublisher::default());
        assert!(slaving.unslave_dome_from_mount().await.is_ok());
    }
}
