//! Prometheus metrics.

use crate::config::ObservabilitySettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Environment variable that enables or disables the recorder.
pub const METRICS_ENABLED_ENV: &str = "DYCLEE_METRICS_ENABLED";

/// Metrics configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether the Prometheus recorder is installed.
    pub enabled: bool,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: Option<&ObservabilitySettings>) -> Self {
        let mut config = Self {
            enabled: settings.and_then(|s| s.metrics).unwrap_or(false),
        };
        if let Some(enabled) = parse_bool_env(METRICS_ENABLED_ENV) {
            config.enabled = enabled;
        }
        config
    }
}

/// Handle to the installed recorder.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
}

impl MetricsHandle {
    /// Renders every recorded metric in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus.render()
    }
}

/// Installs the Prometheus recorder as the global `metrics` recorder.
///
/// Returns `None` when metrics are disabled.
pub fn install_prometheus(config: MetricsConfig) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let prometheus = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|e| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    })?;

    Ok(Some(MetricsHandle { prometheus }))
}

/// Safely converts Duration to milliseconds as u64, capping at `u64::MAX`.
#[inline]
pub(crate) fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Converts usize to f64 for gauges, capping at `u32::MAX`.
#[inline]
pub(crate) fn usize_to_f64(value: usize) -> f64 {
    let capped = u32::try_from(value).unwrap_or(u32::MAX);
    f64::from(capped)
}

fn parse_bool_env(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        let value = value.to_lowercase();
        value == "true" || value == "1" || value == "yes"
    })
}
