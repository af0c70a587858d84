//! Logging bootstrap for hosts embedding the launchpad.
//!
//! - Text or JSON output, RFC 3339 (UTC) timestamps.
//! - `EnvFilter` from an explicit directive, else `RUST_LOG`, else `info`.
//!
//! Library code only emits through `tracing` (target `launchpad`); calling
//! `init` is the host's choice.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::settings::TelemetrySettings;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info,launchpad=debug". `None` reads `RUST_LOG`.
    pub env_filter: Option<String>,
    /// JSON lines (`true`) or human-readable text (`false`).
    pub json: bool,
    /// Print target, file and line.
    pub with_targets_and_lines: bool,
    /// ANSI colors (text format only).
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { env_filter: None, json: true, with_targets_and_lines: true, ansi: false }
    }
}

impl From<&TelemetrySettings> for LoggingConfig {
    fn from(s: &TelemetrySettings) -> Self {
        Self {
            env_filter: Some(s.log_filter.clone()).filter(|f| !f.trim().is_empty()),
            json: s.json,
            ..Self::default()
        }
    }
}

/// Resolve the level filter. A malformed directive falls back to `info`.
pub fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    match &cfg.env_filter {
        Some(s) => EnvFilter::try_new(s.as_str()).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the global subscriber. Call once at process start; a second call
/// returns an error.
pub fn init(cfg: LoggingConfig) -> anyhow::Result<()> {
    let filter = build_filter(&cfg);

    let fmt_layer = {
        let base = fmt::layer()
            .with_target(cfg.with_targets_and_lines)
            .with_file(cfg.with_targets_and_lines)
            .with_line_number(cfg.with_targets_and_lines)
            .with_timer(fmt::time::UtcTime::rfc_3339());

        if cfg.json {
            base.json()
                .with_ansi(false)
                .with_current_span(true)
                .with_span_list(true)
                .flatten_event(true)
                .boxed()
        } else {
            base.with_ansi(cfg.ansi).boxed()
        }
    };

    Registry::default().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}
