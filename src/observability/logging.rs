//! Structured logging configuration.

use crate::config::{LogFormatSetting, ObservabilitySettings};
use std::path::PathBuf;

/// Environment variable holding a log filter directive.
pub const LOG_FILTER_ENV: &str = "DYCLEE_LOG";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl From<LogFormatSetting> for LogFormat {
    fn from(setting: LogFormatSetting) -> Self {
        match setting {
            LogFormatSetting::Pretty => Self::Pretty,
            LogFormatSetting::Json => Self::Json,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub filter: String,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from config settings.
    ///
    /// The filter is taken from `DYCLEE_LOG`, then the settings, then
    /// `debug` when verbose and `info` otherwise.
    #[must_use]
    pub fn from_settings(settings: Option<&ObservabilitySettings>, verbose: bool) -> Self {
        let filter = std::env::var(LOG_FILTER_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| settings.and_then(|s| s.log_filter.clone()))
            .unwrap_or_else(|| if verbose { "debug" } else { "info" }.to_string());

        Self {
            format: settings
                .and_then(|s| s.log_format)
                .map(LogFormat::from)
                .unwrap_or_default(),
            filter,
            file: settings.and_then(|s| s.log_file.clone()),
        }
    }
}
