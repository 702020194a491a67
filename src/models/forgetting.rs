//! Forgetting functions applied by microclusters as time passes.

use serde::{Deserialize, Serialize};

/// Decay applied to a microcluster's statistics over elapsed time.
///
/// The factor is relative to the microcluster's last update, so repeated
/// decay calls between two insertions never compound.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ForgetMethod {
    /// No forgetting; statistics never decay.
    #[default]
    None,
    /// `max(0, 1 - rate * dt)`.
    Linear {
        /// Weight lost per time unit.
        rate: f64,
    },
    /// `exp(-lambda * dt)`.
    Exponential {
        /// Decay constant.
        lambda: f64,
    },
}

impl ForgetMethod {
    /// Returns the multiplicative decay factor for `elapsed` time units.
    #[must_use]
    pub fn factor(&self, elapsed: u64) -> f64 {
        let dt = elapsed as f64;
        match *self {
            Self::None => 1.0,
            Self::Linear { rate } => (1.0 - rate * dt).max(0.0),
            Self::Exponential { lambda } => (-lambda * dt).exp(),
        }
    }

    /// Returns true if this method ever decays.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns the method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Linear { .. } => "linear",
            Self::Exponential { .. } => "exponential",
        }
    }
}
