//! Distance stage: assigns each observation to a microcluster.

use crate::metric::manhattan_distance;
use crate::models::{ClusterId, ForgetMethod, Label, MicroCluster, Timestamp};
use crate::storage::{Collection, MicroclusterStore};
use tracing::{debug, instrument};

/// Where an observation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Absorbed by an existing active or candidate microcluster.
    Inserted {
        /// Absorbing microcluster.
        id: ClusterId,
        /// Collection it was found in.
        collection: Collection,
    },
    /// Seeded a new candidate microcluster.
    Created {
        /// New microcluster.
        id: ClusterId,
    },
    /// Absorbed by a copy of an archived microcluster.
    Resurrected {
        /// Archived original, left untouched.
        archived: ClusterId,
        /// New candidate copy.
        id: ClusterId,
    },
    /// Reached nothing and was not absorbed.
    Rejected,
}

impl Assignment {
    /// The microcluster that absorbed the observation, if any.
    #[must_use]
    pub const fn cluster(&self) -> Option<ClusterId> {
        match self {
            Self::Inserted { id, .. } | Self::Created { id } | Self::Resurrected { id, .. } => {
                Some(*id)
            },
            Self::Rejected => None,
        }
    }

    /// Short name for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inserted { .. } => "inserted",
            Self::Created { .. } => "created",
            Self::Resurrected { .. } => "resurrected",
            Self::Rejected => "rejected",
        }
    }
}

/// Per-observation assignment rules.
#[derive(Debug, Clone, Copy)]
pub struct DistanceStage {
    forget: ForgetMethod,
    long_term_memory: bool,
    reject_outliers: bool,
}

impl DistanceStage {
    /// Creates a distance stage.
    #[must_use]
    pub const fn new(forget: ForgetMethod, long_term_memory: bool, reject_outliers: bool) -> Self {
        Self {
            forget,
            long_term_memory,
            reject_outliers,
        }
    }

    /// A point reaches a center when it lies strictly inside the hyperbox
    /// around it on every dimension.
    #[must_use]
    pub fn is_reachable(center: &[f64], point: &[f64], hyperbox_sizes: &[f64]) -> bool {
        center.len() == point.len()
            && center
                .iter()
                .zip(point)
                .zip(hyperbox_sizes)
                .all(|((c, x), size)| (c - x).abs() < size / 2.0)
    }

    /// Ids in `collection` reachable from `point`, in collection order.
    #[must_use]
    pub fn find_reachables(
        store: &MicroclusterStore,
        collection: Collection,
        point: &[f64],
        hyperbox_sizes: &[f64],
    ) -> Vec<ClusterId> {
        store
            .ids(collection)
            .iter()
            .copied()
            .filter(|id| {
                store
                    .get(*id)
                    .is_some_and(|mc| Self::is_reachable(mc.center(), point, hyperbox_sizes))
            })
            .collect()
    }

    /// Closest candidate by Manhattan distance.
    ///
    /// Equally close candidates resolve to the lowest density, then to the
    /// earliest in `candidates`.
    #[must_use]
    pub fn best_neighbor(
        store: &MicroclusterStore,
        candidates: &[ClusterId],
        point: &[f64],
    ) -> Option<ClusterId> {
        let mut best: Option<(ClusterId, f64, f64)> = None;
        for id in candidates {
            let Some(mc) = store.get(*id) else {
                continue;
            };
            let distance = manhattan_distance(mc.center(), point);
            let density = mc.density();
            let better = match best {
                None => true,
                Some((_, best_distance, best_density)) => {
                    distance < best_distance
                        || (distance == best_distance && density < best_density)
                },
            };
            if better {
                best = Some((*id, distance, density));
            }
        }
        best.map(|(id, _, _)| id)
    }

    /// Assigns a normalized point to a microcluster.
    #[instrument(
        name = "dyclee.distance.assign",
        skip(self, store, point, label, hyperbox_sizes),
        fields(component = "distance", operation = "assign", timestamp = timestamp)
    )]
    pub fn assign(
        &self,
        store: &mut MicroclusterStore,
        point: &[f64],
        timestamp: Timestamp,
        label: &Label,
        hyperbox_sizes: &[f64],
        hyperbox_volume: f64,
    ) -> Assignment {
        if store.is_empty() {
            let id = self.create(store, point, timestamp, label, hyperbox_volume);
            return Assignment::Created { id };
        }

        for collection in [Collection::Active, Collection::Candidate] {
            let reachable = Self::find_reachables(store, collection, point, hyperbox_sizes);
            if let Some(id) = Self::best_neighbor(store, &reachable, point) {
                if let Some(mc) = store.get_mut(id) {
                    mc.insert(point, timestamp, label);
                }
                return Assignment::Inserted { id, collection };
            }
        }

        if self.long_term_memory {
            let reachable =
                Self::find_reachables(store, Collection::Archive, point, hyperbox_sizes);
            if let Some(archived) = Self::best_neighbor(store, &reachable, point) {
                if let Some(original) = store.get(archived) {
                    let mut copy = original.clone();
                    copy.insert(point, timestamp, label);
                    let id = store.insert(copy, Collection::Candidate);
                    metrics::counter!(
                        "dyclee_microclusters_created_total",
                        "origin" => "resurrected"
                    )
                    .increment(1);
                    debug!(
                        archived = %archived,
                        cluster = %id,
                        "Resurrected archived microcluster"
                    );
                    return Assignment::Resurrected { archived, id };
                }
            }
        }

        if self.reject_outliers {
            metrics::counter!("dyclee_points_rejected_total").increment(1);
            debug!(timestamp, "Rejected unreachable observation");
            return Assignment::Rejected;
        }

        let id = self.create(store, point, timestamp, label, hyperbox_volume);
        Assignment::Created { id }
    }

    fn create(
        &self,
        store: &mut MicroclusterStore,
        point: &[f64],
        timestamp: Timestamp,
        label: &Label,
        hyperbox_volume: f64,
    ) -> ClusterId {
        let mc = MicroCluster::new(point, timestamp, hyperbox_volume, label.clone(), self.forget);
        let id = store.insert(mc, Collection::Candidate);
        metrics::counter!("dyclee_microclusters_created_total", "origin" => "new").increment(1);
        id
    }
}
