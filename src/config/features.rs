//! Feature flags for optional algorithm behavior.

use serde::{Deserialize, Serialize};

/// Switches for optional parts of the algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Archive once-dense microclusters instead of discarding them, and
    /// resurrect them when new points reach them.
    pub long_term_memory: bool,
    /// Leave points that reach no microcluster unabsorbed.
    pub reject_outliers: bool,
    /// Do not report final clusters made of a single microcluster.
    pub discard_small_clusters: bool,
    /// Count connectivity overlap only on the highest-variance dimensions.
    pub variance_based_reduction: bool,
    /// Only dense microclusters extend a final cluster.
    pub dense_only_connectivity: bool,
    /// Resolve final cluster labels by mode and density-weighted vote.
    pub label_voting: bool,
}

impl FeatureFlags {
    /// Creates feature flags with all features disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            long_term_memory: false,
            reject_outliers: false,
            discard_small_clusters: false,
            variance_based_reduction: false,
            dense_only_connectivity: false,
            label_voting: false,
        }
    }

    /// Creates feature flags with all features enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            long_term_memory: true,
            reject_outliers: true,
            discard_small_clusters: true,
            variance_based_reduction: true,
            dense_only_connectivity: true,
            label_voting: true,
        }
    }
}
