use crate::controller::driver::DeviceKind;
use crate::controller::gilrs_driver::CollectorSettings;
use crate::mapping::curve::STICK_GAIN;
use crate::mapping::gyro::GYRO_GAIN;
use crate::mapping::router::{RouterSettings, SCROLL_GAIN};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn, Level};

const APP_DIR: &str = "joypointer";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Where [`Settings::load`] took its values from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    File,
    /// The file does not exist
    Defaults,
}

/// Tuning knobs read from `settings.toml`
///
/// The button layout is fixed; only gains, device selection and backend
/// switches live here.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub stick_gain: f32,
    pub gyro_gain: f32,
    pub scroll_gain: f32,
    /// Drive the pointer from accumulated gyro motion after every state tick
    pub gyro_apply: bool,
    pub device: DeviceKind,
    pub poll_interval_us: u64,
    /// Period of state snapshots, sent even when nothing changed
    pub report_interval_ms: u64,
    pub screen_width: i32,
    pub screen_height: i32,
    /// Log injector calls instead of emitting them
    pub dry_run: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stick_gain: STICK_GAIN,
            gyro_gain: GYRO_GAIN,
            scroll_gain: SCROLL_GAIN,
            gyro_apply: false,
            device: DeviceKind::Left,
            poll_interval_us: 100,
            report_interval_ms: 15,
            screen_width: 1920,
            screen_height: 1080,
            dry_run: false,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// `<config dir>/joypointer/settings.toml`
    ///
    /// Falls back to the current directory when no config directory is known.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(SETTINGS_FILE)
    }

    /// Loads and validates `path`; a missing file yields the defaults.
    ///
    /// Runs before logging is set up, so the caller reports the source.
    pub async fn load(path: &Path) -> Result<(Self, SettingsSource), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if !tokio::fs::try_exists(path).await.map_err(io_error)? {
            return Ok((Self::default(), SettingsSource::Defaults));
        }

        let content = tokio::fs::read_to_string(path).await.map_err(io_error)?;
        Ok((Self::parse(&content)?, SettingsSource::File))
    }

    /// Logs where the settings came from; call once logging is up.
    pub fn log_source(&self, path: &Path, source: SettingsSource) {
        match source {
            SettingsSource::File => info!("Loaded settings from {}", path.display()),
            SettingsSource::Defaults => {
                warn!("Settings file {} does not exist, using defaults", path.display())
            }
        }
        debug!("{:?}", self);
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, gain) in [
            ("stick_gain", self.stick_gain),
            ("gyro_gain", self.gyro_gain),
            ("scroll_gain", self.scroll_gain),
        ] {
            if !gain.is_finite() || gain <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive number, got {gain}"
                )));
            }
        }
        if self.report_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "report_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.screen_width <= 0 || self.screen_height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "screen size must be positive, got {}x{}",
                self.screen_width, self.screen_height
            )));
        }
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level {}", self.log_level)))
    }
}

impl From<&Settings> for RouterSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            stick_gain: settings.stick_gain,
            gyro_gain: settings.gyro_gain,
            scroll_gain: settings.scroll_gain,
            gyro_apply: settings.gyro_apply,
        }
    }
}

impl From<&Settings> for CollectorSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            poll_interval: Duration::from_micros(settings.poll_interval_us),
            report_interval: Duration::from_millis(settings.report_interval_ms),
            gyro_requested: settings.gyro_apply,
        }
    }
}
