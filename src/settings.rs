//! Launchpad settings.
//!
//! Precedence (lowest → highest):
//!   1) Built-in defaults
//!   2) Config file (`launchpad.{toml,yaml,json}` or an explicit path)
//!   3) Environment variables (optionally via .env)
//!
//! Env prefix: `LAUNCHPAD`, nested fields separated by `__`:
//!   LAUNCHPAD__PLATFORM__FEE_BPS=100
//!   LAUNCHPAD__PLATFORM__MIN_LAUNCH_DURATION=2d
//!   LAUNCHPAD__TELEMETRY__JSON=false
//!
//! Durations are human-readable ("24h", "30days").

use std::path::{Path, PathBuf};
use std::time::Duration;

use config as cfg;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::LaunchpadError;
use crate::registry::{validate_platform_params, PlatformInit};
use crate::types::{Address, Balance, UNIT};

/// All settings (validated).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub platform: PlatformDefaults,
    pub events: EventSettings,
    pub telemetry: TelemetrySettings,
}

/// Parameters used when the platform record is first initialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformDefaults {
    pub fee_bps: u16,
    #[serde(with = "humantime_serde")]
    pub min_launch_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub max_launch_duration: Duration,
    /// Smallest fund units.
    pub min_soft_cap: Balance,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Buffered events per broadcast subscriber before it lags.
    pub broadcast_capacity: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// RUST_LOG-like directive, e.g. "info,launchpad=debug".
    pub log_filter: String,
    pub json: bool,
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self {
            fee_bps: 250,
            min_launch_duration: Duration::from_secs(24 * 3_600),
            max_launch_duration: Duration::from_secs(30 * 86_400),
            min_soft_cap: UNIT,
        }
    }
}

impl Default for EventSettings {
    fn default() -> Self {
        Self { broadcast_capacity: 1_024 }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self { log_filter: "info".into(), json: true }
    }
}

/// Errors during settings loading/validation.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config build error: {0}")]
    Build(#[from] cfg::ConfigError),
    #[error("path not found `{0}`")]
    PathNotFound(String),
    #[error("duration `{0}` out of range")]
    DurationOutOfRange(&'static str),
    #[error("invalid platform defaults: {0}")]
    Platform(#[from] LaunchpadError),
    #[error("events.broadcast_capacity must be greater than zero")]
    ZeroCapacity,
}

impl PlatformDefaults {
    pub fn min_launch_secs(&self) -> Result<i64, SettingsError> {
        secs(self.min_launch_duration, "platform.min_launch_duration")
    }

    pub fn max_launch_secs(&self) -> Result<i64, SettingsError> {
        secs(self.max_launch_duration, "platform.max_launch_duration")
    }

    /// Arguments for `initialize` with these defaults.
    pub fn to_init(&self, admin: Address, treasury: Address) -> Result<PlatformInit, SettingsError> {
        Ok(PlatformInit {
            admin,
            treasury,
            fee_bps: self.fee_bps,
            min_launch_duration: self.min_launch_secs()?,
            max_launch_duration: self.max_launch_secs()?,
            min_soft_cap: self.min_soft_cap,
        })
    }
}

fn secs(d: Duration, key: &'static str) -> Result<i64, SettingsError> {
    i64::try_from(d.as_secs()).map_err(|_| SettingsError::DurationOutOfRange(key))
}

/// Load settings: defaults → file → environment.
pub fn load(explicit_file: Option<&Path>) -> Result<Settings, SettingsError> {
    // .env is a developer convenience; absence is fine
    let _ = dotenv();

    let mut builder = with_defaults(cfg::Config::builder())?;

    if let Some(path) = discover_config_file(explicit_file)? {
        builder = builder.add_source(cfg::File::from(path));
    }

    builder = builder.add_source(
        cfg::Environment::with_prefix("LAUNCHPAD")
            .separator("__")
            .try_parsing(true),
    );

    finish(builder)
}

/// Defaults overlaid with a TOML document. No file or environment lookup.
pub fn from_toml_str(toml: &str) -> Result<Settings, SettingsError> {
    let builder = with_defaults(cfg::Config::builder())?
        .add_source(cfg::File::from_str(toml, cfg::FileFormat::Toml));
    finish(builder)
}

fn with_defaults(
    builder: cfg::ConfigBuilder<cfg::builder::DefaultState>,
) -> Result<cfg::ConfigBuilder<cfg::builder::DefaultState>, SettingsError> {
    let d = Settings::default();
    Ok(builder
        .set_default("platform.fee_bps", u64::from(d.platform.fee_bps))?
        .set_default("platform.min_launch_duration", "24h")?
        .set_default("platform.max_launch_duration", "30days")?
        .set_default("platform.min_soft_cap", d.platform.min_soft_cap)?
        .set_default("events.broadcast_capacity", d.events.broadcast_capacity as u64)?
        .set_default("telemetry.log_filter", d.telemetry.log_filter)?
        .set_default("telemetry.json", d.telemetry.json)?)
}

fn finish(builder: cfg::ConfigBuilder<cfg::builder::DefaultState>) -> Result<Settings, SettingsError> {
    let settings: Settings = builder.build()?.try_deserialize()?;
    validate(&settings)?;
    Ok(settings)
}

/// Explicit path must exist; otherwise the first `launchpad.*` in the
/// working directory, if any.
fn discover_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>, SettingsError> {
    if let Some(p) = explicit {
        if p.exists() {
            return Ok(Some(p.to_path_buf()));
        }
        return Err(SettingsError::PathNotFound(p.display().to_string()));
    }
    Ok(["launchpad.toml", "launchpad.yaml", "launchpad.yml", "launchpad.json"]
        .iter()
        .map(PathBuf::from)
        .find(|c| c.exists()))
}

/// Same rules `initialize` applies, so bad defaults fail at load time.
pub fn validate(s: &Settings) -> Result<(), SettingsError> {
    validate_platform_params(
        s.platform.fee_bps,
        s.platform.min_launch_secs()?,
        s.platform.max_launch_secs()?,
        s.platform.min_soft_cap,
    )?;
    if s.events.broadcast_capacity == 0 {
        return Err(SettingsError::ZeroCapacity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(validate(&s).is_ok());
        assert_eq!(s.platform.min_launch_secs().unwrap(), 86_400);
        assert_eq!(s.platform.max_launch_secs().unwrap(), 30 * 86_400);
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn toml_overrides_and_humantime() {
        let s = from_toml_str(
            r#"
            [platform]
            fee_bps = 100
            min_launch_duration = "2h"
            max_launch_duration = "7days"

            [telemetry]
            json = false
            "#,
        )
        .unwrap();
        assert_eq!(s.platform.fee_bps, 100);
        assert_eq!(s.platform.min_launch_duration, Duration::from_secs(7_200));
        assert_eq!(s.platform.max_launch_secs().unwrap(), 7 * 86_400);
        assert_eq!(s.platform.min_soft_cap, UNIT);
        assert!(!s.telemetry.json);
        assert_eq!(s.events.broadcast_capacity, 1_024);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let fee = from_toml_str("[platform]\nfee_bps = 6000\n").unwrap_err();
        assert!(matches!(fee, SettingsError::Platform(LaunchpadError::InvalidPlatformFee)));

        let dur = from_toml_str("[platform]\nmin_launch_duration = \"60days\"\n").unwrap_err();
        assert!(matches!(dur, SettingsError::Platform(LaunchpadError::InvalidLaunchDuration)));

        let cap = from_toml_str("[events]\nbroadcast_capacity = 0\n").unwrap_err();
        assert!(matches!(cap, SettingsError::ZeroCapacity));
    }

    #[test]
    fn explicit_missing_file_fails() {
        let err = load(Some(Path::new("/definitely/not/here/launchpad.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::PathNotFound(_)));
    }

    #[test]
    fn to_init_converts_durations() {
        let init = PlatformDefaults::default()
            .to_init(Address([1; 20]), Address([2; 20]))
            .unwrap();
        assert_eq!(init.fee_bps, 250);
        assert_eq!(init.min_launch_duration, 86_400);
        assert_eq!(init.max_launch_duration, 2_592_000);
        assert_eq!(init.min_soft_cap, UNIT);
    }
}
