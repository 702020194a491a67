//! Microcluster summaries.

use super::{DensityType, ForgetMethod, Label, Timestamp};
use serde::Serialize;
use std::fmt;

/// Stable identifier of a microcluster inside a [`crate::MicroclusterStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClusterId(u64);

impl ClusterId {
    /// Creates an identifier from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mc-{}", self.0)
    }
}

/// Compact summary of a group of nearby observations.
///
/// Holds the decayed observation weight and linear sum from which the
/// center is derived, plus the density, label and bookkeeping the
/// distance and density stages read.
#[derive(Debug, Clone, Serialize)]
pub struct MicroCluster {
    /// Observation weight as of `last_update`.
    weight: f64,
    /// Per-dimension sum of absorbed points, scaled like `weight`.
    linear_sum: Vec<f64>,
    center: Vec<f64>,
    density: f64,
    label: Label,
    last_update: Timestamp,
    created_at: Timestamp,
    density_type: DensityType,
    was_dense: bool,
    /// Pending decay since `last_update`, folded in on the next insertion.
    #[serde(skip)]
    decay: f64,
    #[serde(skip)]
    forget: ForgetMethod,
}

impl MicroCluster {
    /// Creates a microcluster from a single normalized point.
    #[must_use]
    pub fn new(
        point: &[f64],
        timestamp: Timestamp,
        volume: f64,
        label: Label,
        forget: ForgetMethod,
    ) -> Self {
        Self {
            weight: 1.0,
            linear_sum: point.to_vec(),
            center: point.to_vec(),
            density: 1.0 / volume,
            label,
            last_update: timestamp,
            created_at: timestamp,
            density_type: DensityType::Outlier,
            was_dense: false,
            decay: 1.0,
            forget,
        }
    }

    /// Absorbs a point.
    ///
    /// A supplied external label replaces any label that is not itself
    /// external.
    pub fn insert(&mut self, point: &[f64], timestamp: Timestamp, label: &Label) {
        self.fold_decay();
        self.weight += 1.0;
        for (sum, x) in self.linear_sum.iter_mut().zip(point) {
            *sum += x;
        }
        self.recompute_center();
        self.last_update = timestamp;
        if label.is_external() && !self.label.is_external() {
            self.label = label.clone();
        }
    }

    /// Applies the forgetting function for the time elapsed since the last update.
    pub fn update_cluster(&mut self, timestamp: Timestamp) {
        self.decay = self
            .forget
            .factor(timestamp.saturating_sub(self.last_update));
    }

    /// Recomputes the density against the current hyperbox volume.
    pub fn update_density(&mut self, volume: f64) {
        self.density = self.weight() / volume;
    }

    /// Sets the density class; `Dense` is remembered in `was_dense`.
    pub fn set_density_type(&mut self, density_type: DensityType) {
        self.density_type = density_type;
        if density_type == DensityType::Dense {
            self.was_dense = true;
        }
    }

    /// Replaces the label.
    pub fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    /// Center in normalized feature space.
    #[must_use]
    pub fn center(&self) -> &[f64] {
        &self.center
    }

    /// Decayed density (`Dk`).
    #[must_use]
    pub const fn density(&self) -> f64 {
        self.density
    }

    /// Current label (`Classk`).
    #[must_use]
    pub const fn label(&self) -> &Label {
        &self.label
    }

    /// Timestamp of the most recent absorbed observation (`tlk`).
    #[must_use]
    pub const fn last_update(&self) -> Timestamp {
        self.last_update
    }

    /// Timestamp of the first absorbed observation.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Current density class.
    #[must_use]
    pub const fn density_type(&self) -> DensityType {
        self.density_type
    }

    /// Whether this microcluster has ever been classified dense.
    #[must_use]
    pub const fn was_dense(&self) -> bool {
        self.was_dense
    }

    /// Decayed observation weight.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight * self.decay
    }

    /// Dimensionality of the center.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.center.len()
    }

    fn fold_decay(&mut self) {
        if (self.decay - 1.0).abs() > f64::EPSILON {
            self.weight *= self.decay;
            for sum in &mut self.linear_sum {
                *sum *= self.decay;
            }
            self.decay = 1.0;
        }
    }

    fn recompute_center(&mut self) {
        if self.weight > 0.0 {
            for (c, sum) in self.center.iter_mut().zip(&self.linear_sum) {
                *c = sum / self.weight;
            }
        }
    }
}
