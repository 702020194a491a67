//! Property-based tests for the clustering invariants.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Inserted points are reachable from their microcluster
//! - Density classification is exhaustive and exclusive
//! - Snapshot retention respects the per-order cap
//! - Exhaustive and indexed connectivity agree on coarse grids
//! - Normalization round-trips under a fixed context

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use dyclee::models::{ClusterId, MicroCluster};
use dyclee::services::{DensityStage, DistanceStage};
use dyclee::storage::{
    Collection, ConnectivityIndex, ConnectivityRule, ExhaustiveIndex, KdTreeIndex, Snapshot,
};
use dyclee::{Context, ForgetMethod, Label, MicroclusterStore, SnapshotStore};
use proptest::prelude::*;
use std::collections::HashSet;

fn unit_point() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..=1.0, 2)
}

proptest! {
    /// Property: after assignment, the point is reachable from the center
    /// of the microcluster that absorbed it.
    #[test]
    fn prop_assigned_point_is_reachable(points in prop::collection::vec(unit_point(), 1..60)) {
        let sizes = [0.1, 0.1];
        let volume = 0.01;
        let stage = DistanceStage::new(ForgetMethod::None, false, false);
        let mut store = MicroclusterStore::new();

        for (t, point) in points.iter().enumerate() {
            let assignment =
                stage.assign(&mut store, point, t as u64, &Label::Unclassed, &sizes, volume);
            let id = assignment.cluster().expect("outliers are accepted");
            let center = store.get(id).expect("stored").center().to_vec();
            prop_assert!(DistanceStage::is_reachable(&center, point, &sizes));
        }
    }

    /// Property: every live microcluster gets exactly one density class.
    #[test]
    fn prop_classification_is_exhaustive(weights in prop::collection::vec(1usize..20, 1..30)) {
        let mut store = MicroclusterStore::new();
        for (i, weight) in weights.iter().enumerate() {
            let point = vec![i as f64 * 0.05, 0.5];
            let mut mc = MicroCluster::new(&point, 0, 0.01, Label::Unclassed, ForgetMethod::None);
            for _ in 1..*weight {
                mc.insert(&point, 0, &Label::Unclassed);
            }
            mc.update_density(0.01);
            store.insert(mc, Collection::Candidate);
        }
        let live = store.live_ids();
        let classes = DensityStage::classify(&mut store, &live);

        let mut seen: HashSet<ClusterId> = HashSet::new();
        for id in classes.dense.iter().chain(&classes.semi_dense).chain(&classes.low_density) {
            prop_assert!(seen.insert(*id), "{id} classified twice");
        }
        prop_assert_eq!(seen.len(), live.len());
    }

    /// Property: no order ever holds more than `alpha^L + 1` snapshots.
    #[test]
    fn prop_snapshot_cap(alpha in 2u64..5, levels in 1u32..4, count in 1u64..300) {
        let mut store = SnapshotStore::new(alpha, levels).expect("store");
        for t in 0..count {
            store.record(&Snapshot {
                timestamp: t,
                final_clusters: Vec::new(),
                microclusters: Vec::new(),
            });
            for order in store.orders() {
                prop_assert!(store.timestamps(order).len() <= store.max_per_order());
            }
        }
    }

    /// Property: when microclusters either coincide or sit at least one
    /// edge apart, the radius `phi/2` query and the per-dimension rule agree.
    #[test]
    fn prop_exhaustive_and_indexed_agree_on_grid(
        cells in prop::collection::vec((0u32..8, 0u32..8), 2..25),
    ) {
        let phi = 0.1;
        let mut store = MicroclusterStore::new();
        for (i, j) in &cells {
            let point = vec![f64::from(*i) / 8.0, f64::from(*j) / 8.0];
            store.insert(
                MicroCluster::new(&point, 0, phi * phi, Label::Unclassed, ForgetMethod::None),
                Collection::Active,
            );
        }
        let members = store.live_ids();
        let rule = ConnectivityRule::new(vec![phi, phi], 2);
        let mut exhaustive = ExhaustiveIndex::new();
        let mut indexed = KdTreeIndex::new(phi / 2.0);
        exhaustive.rebuild(&store, &members, &rule);
        indexed.rebuild(&store, &members, &rule);

        for id in members {
            let mut a = exhaustive.neighbors(&store, id);
            let mut b = indexed.neighbors(&store, id);
            a.sort();
            b.sort();
            prop_assert_eq!(a, b);
        }
    }

    /// Property: fixed-context normalization is invertible.
    #[test]
    fn prop_normalize_round_trip(
        min in prop::collection::vec(-100.0f64..0.0, 3),
        width in prop::collection::vec(0.5f64..100.0, 3),
        t in prop::collection::vec(0.0f64..=1.0, 3),
    ) {
        let max: Vec<f64> = min.iter().zip(&width).map(|(m, w)| m + w).collect();
        let point: Vec<f64> = min.iter().zip(&width).zip(&t).map(|((m, w), t)| m + w * t).collect();
        let mut context = Context::fixed(min, max, 0.1).expect("context");

        let normalized = context.normalize(&point).expect("normalize");
        let restored = context.denormalize(&normalized).expect("denormalize");
        for (a, b) in point.iter().zip(&restored) {
            prop_assert!((a - b).abs() < 1e-9);
        }
    }
}
