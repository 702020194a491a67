//! Configuration management.
//!
//! Engine parameters are fixed at construction. They can be built in code
//! with the `with_*` setters or loaded from TOML:
//!
//! ```toml
//! phi = 0.06
//! t_global = 100
//! uncdim = 0
//! connectivity = "indexed"
//!
//! [forget]
//! method = "exponential"
//! lambda = 0.01
//!
//! [features]
//! long_term_memory = true
//! label_voting = true
//!
//! [snapshots]
//! alpha = 2
//! levels = 2
//!
//! [context]
//! min = [0.0, 0.0]
//! max = [10.0, 5.0]
//! ```
//!
//! `DYCLEE_PHI`, `DYCLEE_T_GLOBAL` and `DYCLEE_UNCDIM` override file values.

mod features;

pub use crate::models::ForgetMethod;
pub use features::FeatureFlags;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default relative hyperbox size.
pub const DEFAULT_PHI: f64 = 0.1;

/// Connectivity search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityStrategy {
    /// Exact per-dimension test against every live microcluster.
    #[default]
    Exhaustive,
    /// Kd-tree Manhattan radius query of `phi / 2`.
    Indexed,
}

impl ConnectivityStrategy {
    /// Parses a strategy string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "exhaustive" | "brute" | "brute-force" => Some(Self::Exhaustive),
            "indexed" | "kdtree" | "kd-tree" => Some(Self::Indexed),
            _ => None,
        }
    }
}

/// Density analysis mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityAnalysis {
    /// Mean and median over all live microclusters.
    #[default]
    Global,
    /// Per-neighborhood density analysis. Not implemented.
    Local,
}

/// Fixed normalization bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBounds {
    /// Per-dimension minimum.
    pub min: Vec<f64>,
    /// Per-dimension maximum.
    pub max: Vec<f64>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormatSetting {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Observability section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log format.
    pub log_format: Option<LogFormatSetting>,
    /// Log filter directive (e.g. `dyclee=debug`).
    pub log_filter: Option<String>,
    /// Append logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Install the Prometheus metrics recorder.
    pub metrics: Option<bool>,
}

/// Main configuration for a dyclee engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DycleeConfig {
    /// Relative hyperbox size in `[0, 1]`.
    pub phi: f64,
    /// Forgetting function applied to microclusters.
    pub forget: ForgetMethod,
    /// Optional behaviors.
    pub features: FeatureFlags,
    /// Density analysis mode.
    pub density_analysis: DensityAnalysis,
    /// Connectivity search strategy.
    pub connectivity: ConnectivityStrategy,
    /// Fixed normalization bounds; `None` selects adaptive normalization.
    pub context: Option<ContextBounds>,
    /// Observations between density stages.
    pub t_global: u64,
    /// Dimensions allowed not to overlap for two microclusters to connect.
    pub uncdim: usize,
    /// Snapshot base factor.
    pub snapshot_alpha: u64,
    /// Snapshot depth.
    pub snapshot_levels: u32,
    /// Fixed run id for generated labels (random if `None`).
    pub label_run_id: Option<String>,
    /// Logging and metrics settings.
    pub observability: ObservabilitySettings,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Relative hyperbox size.
    pub phi: Option<f64>,
    /// Density stage period.
    pub t_global: Option<u64>,
    /// Tolerated non-overlapping dimensions.
    pub uncdim: Option<usize>,
    /// Connectivity strategy.
    pub connectivity: Option<ConnectivityStrategy>,
    /// Density analysis mode.
    pub density_analysis: Option<DensityAnalysis>,
    /// Run id for generated labels.
    pub label_run_id: Option<String>,
    /// Forgetting function.
    pub forget: Option<ForgetMethod>,
    /// Feature flags.
    pub features: Option<FeatureFlags>,
    /// Snapshot settings.
    pub snapshots: Option<ConfigFileSnapshots>,
    /// Fixed context.
    pub context: Option<ContextBounds>,
    /// Observability settings.
    pub observability: Option<ObservabilitySettings>,
}

/// Snapshots section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFileSnapshots {
    /// Base factor.
    pub alpha: Option<u64>,
    /// Depth.
    pub levels: Option<u32>,
}

impl Default for DycleeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PHI)
    }
}

impl DycleeConfig {
    /// Creates a configuration with the given `phi` and reference defaults.
    #[must_use]
    pub fn new(phi: f64) -> Self {
        Self {
            phi,
            forget: ForgetMethod::None,
            features: FeatureFlags::none(),
            density_analysis: DensityAnalysis::Global,
            connectivity: ConnectivityStrategy::Exhaustive,
            context: None,
            t_global: 1,
            uncdim: 0,
            snapshot_alpha: 2,
            snapshot_levels: 2,
            label_run_id: None,
            observability: ObservabilitySettings::default(),
        }
    }

    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        let mut config = Self::from_toml(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses configuration from TOML text (no env overrides).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/dyclee/config.toml`.
    /// Returns defaults (with env overrides) if neither exists.
    #[must_use]
    pub fn load_default() -> Self {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            let candidates = [
                base_dirs.config_dir().join("dyclee").join("config.toml"),
                base_dirs
                    .home_dir()
                    .join(".config")
                    .join("dyclee")
                    .join("config.toml"),
            ];
            for path in candidates.iter().filter(|p| p.exists()) {
                if let Ok(config) = Self::load_from_file(path) {
                    return config;
                }
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Converts a `ConfigFile` to `DycleeConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::new(file.phi.unwrap_or(DEFAULT_PHI));

        if let Some(t_global) = file.t_global {
            config.t_global = t_global;
        }
        if let Some(uncdim) = file.uncdim {
            config.uncdim = uncdim;
        }
        if let Some(connectivity) = file.connectivity {
            config.connectivity = connectivity;
        }
        if let Some(density_analysis) = file.density_analysis {
            config.density_analysis = density_analysis;
        }
        if let Some(forget) = file.forget {
            config.forget = forget;
        }
        if let Some(features) = file.features {
            config.features = features;
        }
        if let Some(snapshots) = file.snapshots {
            if let Some(alpha) = snapshots.alpha {
                config.snapshot_alpha = alpha;
            }
            if let Some(levels) = snapshots.levels {
                config.snapshot_levels = levels;
            }
        }
        config.context = file.context;
        config.label_run_id = file.label_run_id;
        config.observability = file.observability.unwrap_or_default();

        config
    }

    /// Converts back into the file representation.
    #[must_use]
    pub fn to_config_file(&self) -> ConfigFile {
        ConfigFile {
            phi: Some(self.phi),
            t_global: Some(self.t_global),
            uncdim: Some(self.uncdim),
            connectivity: Some(self.connectivity),
            density_analysis: Some(self.density_analysis),
            label_run_id: self.label_run_id.clone(),
            forget: Some(self.forget),
            features: Some(self.features),
            snapshots: Some(ConfigFileSnapshots {
                alpha: Some(self.snapshot_alpha),
                levels: Some(self.snapshot_levels),
            }),
            context: self.context.clone(),
            observability: Some(self.observability.clone()),
        }
    }

    /// Applies `DYCLEE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(phi) = parse_env("DYCLEE_PHI") {
            self.phi = phi;
        }
        if let Some(t_global) = parse_env("DYCLEE_T_GLOBAL") {
            self.t_global = t_global;
        }
        if let Some(uncdim) = parse_env("DYCLEE_UNCDIM") {
            self.uncdim = uncdim;
        }
    }

    /// Checks construction-time preconditions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for out-of-range values and
    /// [`Error::NotImplemented`] for local density analysis.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.phi) {
            return Err(Error::InvalidParameter {
                name: "phi",
                reason: format!("must lie in [0, 1], got {}", self.phi),
            });
        }
        if self.t_global == 0 {
            return Err(Error::InvalidParameter {
                name: "t_global",
                reason: "must be a positive integer".to_string(),
            });
        }
        if let Some(context) = &self.context {
            if self.uncdim > context.min.len() {
                return Err(Error::InvalidParameter {
                    name: "uncdim",
                    reason: format!(
                        "{} exceeds the {} context dimensions",
                        self.uncdim,
                        context.min.len()
                    ),
                });
            }
        }
        match self.forget {
            ForgetMethod::Linear { rate } if !(rate.is_finite() && rate >= 0.0) => {
                return Err(Error::InvalidParameter {
                    name: "forget.rate",
                    reason: format!("must be finite and non-negative, got {rate}"),
                });
            },
            ForgetMethod::Exponential { lambda } if !(lambda.is_finite() && lambda >= 0.0) => {
                return Err(Error::InvalidParameter {
                    name: "forget.lambda",
                    reason: format!("must be finite and non-negative, got {lambda}"),
                });
            },
            _ => {},
        }
        if self.density_analysis == DensityAnalysis::Local {
            return Err(Error::NotImplemented("local density analysis".to_string()));
        }
        Ok(())
    }

    /// Sets the forgetting function.
    #[must_use]
    pub const fn with_forget(mut self, forget: ForgetMethod) -> Self {
        self.forget = forget;
        self
    }

    /// Sets the feature flags.
    #[must_use]
    pub const fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Sets a fixed normalization context.
    #[must_use]
    pub fn with_context(mut self, min: Vec<f64>, max: Vec<f64>) -> Self {
        self.context = Some(ContextBounds { min, max });
        self
    }

    /// Sets the density stage period.
    #[must_use]
    pub const fn with_t_global(mut self, t_global: u64) -> Self {
        self.t_global = t_global;
        self
    }

    /// Sets the tolerated non-overlapping dimension count.
    #[must_use]
    pub const fn with_uncdim(mut self, uncdim: usize) -> Self {
        self.uncdim = uncdim;
        self
    }

    /// Sets the connectivity strategy.
    #[must_use]
    pub const fn with_connectivity(mut self, connectivity: ConnectivityStrategy) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Sets the density analysis mode.
    #[must_use]
    pub const fn with_density_analysis(mut self, density_analysis: DensityAnalysis) -> Self {
        self.density_analysis = density_analysis;
        self
    }

    /// Sets the snapshot base factor and depth.
    #[must_use]
    pub const fn with_snapshots(mut self, alpha: u64, levels: u32) -> Self {
        self.snapshot_alpha = alpha;
        self.snapshot_levels = levels;
        self
    }

    /// Fixes the run id used in generated labels.
    #[must_use]
    pub fn with_label_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.label_run_id = Some(run_id.into());
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
