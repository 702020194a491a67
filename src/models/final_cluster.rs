//! Reported clusters produced by the density stage.

use super::{Label, MicroCluster};
use crate::metric::manhattan_distance;
use serde::Serialize;

/// A cluster formed by merging connected microclusters.
///
/// Recomputed on every density stage; only snapshots keep old ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalCluster {
    /// Cluster label.
    pub label: Label,
    /// Mean of the member centers.
    pub center: Vec<f64>,
    /// Mean member density.
    pub avg_density: f64,
    /// Largest Manhattan distance from `center` to a member center.
    pub max_distance: f64,
    /// Number of member microclusters.
    pub members: usize,
}

impl FinalCluster {
    /// Aggregates member microclusters into a final cluster.
    ///
    /// Returns `None` for an empty member list.
    #[must_use]
    pub fn from_members(label: Label, members: &[&MicroCluster]) -> Option<Self> {
        let first = members.first()?;
        let count = members.len() as f64;

        let mut center = vec![0.0; first.dimensions()];
        let mut avg_density = 0.0;
        for mc in members {
            for (c, x) in center.iter_mut().zip(mc.center()) {
                *c += x;
            }
            avg_density += mc.density();
        }
        for c in &mut center {
            *c /= count;
        }
        avg_density /= count;

        let max_distance = members
            .iter()
            .map(|mc| manhattan_distance(&center, mc.center()))
            .fold(0.0, f64::max);

        Some(Self {
            label,
            center,
            avg_density,
            max_distance,
            members: members.len(),
        })
    }
}
