//! Density classification of microclusters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Density class assigned during the density stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityType {
    /// At or above both the mean and the median density.
    Dense,
    /// At or above exactly one of the mean and the median density.
    SemiDense,
    /// Below both the mean and the median density.
    LowDensity,
    /// Not (yet) supported by enough observations.
    #[default]
    Outlier,
}

impl DensityType {
    /// Classifies a density against the global mean and median.
    #[must_use]
    pub fn classify(density: f64, mean: f64, median: f64) -> Self {
        match (density >= mean, density >= median) {
            (true, true) => Self::Dense,
            (true, false) | (false, true) => Self::SemiDense,
            (false, false) => Self::LowDensity,
        }
    }

    /// Returns the density type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dense => "dense",
            Self::SemiDense => "semi_dense",
            Self::LowDensity => "low_density",
            Self::Outlier => "outlier",
        }
    }
}

impl fmt::Display for DensityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
