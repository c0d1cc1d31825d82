//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `skyshed.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use skyshed_app::engine::EngineSettings;
use skyshed_app::slaving::SlavingSettings;
use skyshed_domain::startup::StartupArguments;
use skyshed_domain::target::ObservationTarget;
use skyshed_domain::time::now;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Observation target.
    pub target: TargetConfig,
    /// Startup behaviour.
    pub startup: StartupConfig,
    /// Session end planning.
    pub session: SessionConfig,
    /// Dome slaving tuning.
    pub slaving: SlavingConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// The object the mount points at during startup.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub name: String,
    /// Right ascension in hours, `0..24`.
    pub ra_hours: f64,
    /// Declination in degrees, `-90..=90`.
    pub dec_degrees: f64,
}

/// Startup behaviour.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Refuse startup unless the target is actually in view.
    pub require_in_view: bool,
    /// Start the timed capture loop as the last startup step.
    pub autostart: bool,
    /// Live preview frame rate.
    pub preview_rate: f64,
}

/// Session end planning; a missing duration means an open-ended session.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session length; arms the shutdown scheduler when present.
    pub duration_minutes: Option<u32>,
    /// Shutdown fires this many minutes before the session end.
    pub close_margin_minutes: u32,
    /// Cameras stop this many minutes before the session end.
    pub cam_margin_minutes: u32,
}

/// Dome slaving tuning.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SlavingConfig {
    pub tolerance_degrees: f64,
    pub software_interval_secs: u64,
    pub checkup_interval_secs: u64,
    pub force_software: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `skyshed.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("skyshed.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SKYSHED_TARGET") {
            self.target.name = val;
        }
        if let Ok(val) = std::env::var("SKYSHED_AUTOSTART") {
            if let Ok(autostart) = val.parse() {
                self.startup.autostart = autostart;
            }
        }
        if let Ok(val) = std::env::var("SKYSHED_SESSION_MINUTES") {
            if let Ok(minutes) = val.parse() {
                self.session.duration_minutes = Some(minutes);
            }
        }
        if let Ok(val) = std::env::var("SKYSHED_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.target()?;
        if self.startup.preview_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "preview_rate must be positive".to_string(),
            ));
        }
        if self.slaving.tolerance_degrees <= 0.0 {
            return Err(ConfigError::Validation(
                "slaving tolerance must be positive".to_string(),
            ));
        }
        if self.slaving.software_interval_secs == 0 || self.slaving.checkup_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "slaving intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured observation target.
    ///
    /// # Errors
    ///
    /// Returns an error when the coordinates are out of range.
    pub fn target(&self) -> Result<ObservationTarget, ConfigError> {
        ObservationTarget::new(
            self.target.name.clone(),
            self.target.ra_hours,
            self.target.dec_degrees,
        )
        .map_err(|err| ConfigError::Validation(err.to_string()))
    }

    /// Engine settings derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the target coordinates are out of range.
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        Ok(EngineSettings {
            target: self.target()?,
            preview_rate: self.startup.preview_rate,
            slaving: SlavingSettings {
                tolerance_degrees: self.slaving.tolerance_degrees,
                software_interval: Duration::from_secs(self.slaving.software_interval_secs),
                checkup_interval: Duration::from_secs(self.slaving.checkup_interval_secs),
                force_software: self.slaving.force_software,
            },
        })
    }

    /// Startup arguments for the session described by this configuration.
    #[must_use]
    pub fn startup_arguments(&self) -> StartupArguments {
        let close_at = self
            .session
            .duration_minutes
            .map(|minutes| now() + chrono::TimeDelta::minutes(i64::from(minutes)));
        StartupArguments {
            require_in_view: self.startup.require_in_view,
            autostart: self.startup.autostart,
            close_at,
            close_margin: close_at.map(|_| {
                chrono::TimeDelta::minutes(i64::from(self.session.close_margin_minutes))
            }),
            cam_margin: close_at
                .map(|_| chrono::TimeDelta::minutes(i64::from(self.session.cam_margin_minutes))),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            name: "M42".to_string(),
            ra_hours: 5.588,
            dec_degrees: -5.39,
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            require_in_view: false,
            autostart: true,
            preview_rate: 1.0,
        }
    }
}

impl Default for SlavingConfig {
    fn default() -> Self {
        let defaults = SlavingSettings::default();
        Self {
            tolerance_degrees: defaults.tolerance_degrees,
            software_interval_secs: defaults.software_interval.as_secs(),
            checkup_interval_secs: defaults.checkup_interval.as_secs(),
            force_software: defaults.force_software,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "skyshedd=info,skyshed=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
