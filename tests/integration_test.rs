//! Integration tests for dyclee.
#![allow(
    clippy::too_many_lines,
    clippy::cast_precision_loss,
    clippy::uninlined_format_args,
    clippy::doc_markdown
)]

use dyclee::io::{self, Dataset};
use dyclee::services::DistanceStage;
use dyclee::storage::Collection;
use dyclee::{
    ConnectivityStrategy, Context, DensityAnalysis, DycleeConfig, DycleeEngine, Error,
    FeatureFlags, Label,
};
use tempfile::TempDir;
use test_case::test_case;

fn unit_square(phi: f64) -> DycleeConfig {
    DycleeConfig::new(phi)
        .with_context(vec![0.0, 0.0], vec![1.0, 1.0])
        .with_label_run_id("it")
}

#[test]
fn test_error_types() {
    let err = Error::InvalidInput("ragged".to_string());
    assert!(err.to_string().contains("invalid input"));
    assert!(err.to_string().contains("ragged"));

    let err = Error::InvalidParameter {
        name: "phi",
        reason: "must lie in [0, 1]".to_string(),
    };
    assert!(err.to_string().contains("'phi'"));

    let err = Error::NotImplemented("continuous stream ingestion".to_string());
    assert!(err.to_string().contains("not implemented"));
}

/// Three identical points in a fixed unit context collapse into one dense
/// microcluster and one final cluster.
#[test]
fn test_identical_points_single_final_cluster() {
    let mut engine = DycleeEngine::new(unit_square(0.1)).expect("engine");
    for t in 0..3 {
        engine.process(&[0.5, 0.5], t, Label::Unclassed).expect("process");
    }

    assert_eq!(engine.store().total(), 1);
    let report = engine.last_report().expect("report");
    assert!((report.mean_density - report.median_density).abs() < f64::EPSILON);
    assert_eq!(report.dense, 1);
    assert_eq!(report.final_clusters.len(), 1);

    let cluster = &report.final_clusters[0];
    assert_eq!(cluster.members, 1);
    assert!(cluster.max_distance.abs() < f64::EPSILON);
    assert_eq!(cluster.center, vec![0.5, 0.5]);
}

/// Groups farther apart than one hyperbox edge in every dimension are never
/// connected.
#[test_case(ConnectivityStrategy::Exhaustive ; "exhaustive")]
#[test_case(ConnectivityStrategy::Indexed ; "indexed")]
fn test_separated_groups_stay_apart(strategy: ConnectivityStrategy) {
    let mut engine =
        DycleeEngine::new(unit_square(0.1).with_connectivity(strategy)).expect("engine");
    let left = [[0.20, 0.20], [0.22, 0.21], [0.21, 0.19]];
    let right = [[0.80, 0.80], [0.79, 0.81], [0.81, 0.80]];

    for (t, (a, b)) in left.iter().zip(right.iter()).enumerate() {
        let t = 2 * t as u64;
        engine.process(a, t, Label::Unclassed).expect("left");
        engine.process(b, t + 1, Label::Unclassed).expect("right");
    }

    let clusters = engine.last_final_clusters();
    assert_eq!(clusters.len(), 2);
    assert_ne!(clusters[0].label, clusters[1].label);
    for cluster in clusters {
        let spread = (cluster.center[0] - cluster.center[1]).abs();
        assert!(spread < 0.05, "cluster center {:?}", cluster.center);
    }
}

/// Drives a stale microcluster at (0.8, 0.8) below a quarter of the mean and
/// median density, then sends a point back to its old center.
fn prune_and_return(long_term_memory: bool) -> (DycleeEngine, Label) {
    let config = unit_square(0.1).with_features(FeatureFlags {
        long_term_memory,
        ..FeatureFlags::none()
    });
    let mut engine = DycleeEngine::new(config).expect("engine");

    engine.process(&[0.8, 0.8], 0, Label::Unclassed).expect("seed");
    for t in 1..=20 {
        engine.process(&[0.2, 0.2], t, Label::Unclassed).expect("bulk");
    }
    let returning = engine.process(&[0.8, 0.8], 21, Label::Unclassed).expect("return");
    (engine, returning)
}

#[test]
fn test_pruned_cluster_is_unrecoverable_without_long_term_memory() {
    let (engine, returning) = prune_and_return(false);

    assert_eq!(engine.collection_len(Collection::Archive), 0);
    assert!(returning.is_unclassed());

    let store = engine.store();
    let recreated = store
        .ids(Collection::Candidate)
        .iter()
        .filter_map(|id| store.get(*id))
        .find(|mc| (mc.center()[0] - 0.8).abs() < 1e-9)
        .expect("new microcluster");
    assert_eq!(recreated.created_at(), 21);
}

#[test]
fn test_long_term_memory_resurrects_archived_cluster() {
    let (engine, returning) = prune_and_return(true);

    assert_eq!(engine.collection_len(Collection::Archive), 1);
    assert!(!returning.is_unclassed());

    let store = engine.store();
    let resurrected = store
        .ids(Collection::Candidate)
        .iter()
        .filter_map(|id| store.get(*id))
        .find(|mc| (mc.center()[0] - 0.8).abs() < 1e-9)
        .expect("resurrected copy");
    assert_eq!(resurrected.created_at(), 0);
    assert_eq!(resurrected.label(), &returning);
}

#[test]
fn test_unimplemented_entry_points() {
    let mut engine = DycleeEngine::new(unit_square(0.1)).expect("engine");

    let err = engine
        .run_dataset_windowed(&[vec![0.5, 0.5]], None, Some(10))
        .expect_err("windowed");
    assert!(matches!(err, Error::NotImplemented(_)));

    let stream = vec![(vec![0.5, 0.5], 0, Label::Unclassed)];
    let err = engine.run_stream(stream).expect_err("stream");
    assert!(matches!(err, Error::NotImplemented(_)));

    let err = DycleeEngine::new(unit_square(0.1).with_density_analysis(DensityAnalysis::Local))
        .expect_err("local density");
    assert!(matches!(err, Error::NotImplemented(_)));
}

#[test_case(-0.1 ; "negative")]
#[test_case(1.01 ; "above one")]
#[test_case(f64::NAN ; "nan")]
fn test_invalid_phi_is_rejected(phi: f64) {
    let err = DycleeEngine::new(DycleeConfig::new(phi)).expect_err("invalid phi");
    assert!(matches!(err, Error::InvalidParameter { name: "phi", .. }));
}

#[test_case(0.0 ; "zero")]
#[test_case(0.75 ; "advisory")]
#[test_case(1.0 ; "one")]
fn test_boundary_phi_is_accepted(phi: f64) {
    assert!(DycleeEngine::new(DycleeConfig::new(phi)).is_ok());
}

#[test]
fn test_degenerate_fixed_context() {
    let config = DycleeConfig::new(0.1).with_context(vec![2.0, 0.0], vec![2.0, 1.0]);
    let err = DycleeEngine::new(config).expect_err("degenerate");
    assert!(matches!(err, Error::DegenerateRange { dimension: 0 }));
}

#[test]
fn test_normalize_denormalize_round_trip() {
    let mut context =
        Context::fixed(vec![-5.0, 10.0, 0.0], vec![5.0, 30.0, 0.5], 0.1).expect("context");
    let point = [1.25, 17.5, 0.1];

    let normalized = context.normalize(&point).expect("normalize");
    let restored = context.denormalize(&normalized).expect("denormalize");
    for (a, b) in point.iter().zip(&restored) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn test_adaptive_context_expands_to_cover_stream() {
    let config = DycleeConfig::new(0.2).with_label_run_id("reach");
    let mut engine = DycleeEngine::new(config).expect("engine");
    let points = [[3.0, 1.0], [3.1, 1.2], [2.9, 0.9], [8.0, 4.0], [7.8, 4.1]];

    for (t, point) in points.iter().enumerate() {
        engine.process(point, t as u64, Label::Unclassed).expect("process");
    }

    let context = engine.context().expect("adaptive context");
    assert!(context.is_adaptive());
    assert_eq!(context.min(), &[0.0, 0.0]);
    assert_eq!(context.max(), &[8.0, 4.1]);
}

#[test]
fn test_external_labels_survive_label_voting() {
    let config = unit_square(0.1).with_features(FeatureFlags {
        label_voting: true,
        ..FeatureFlags::none()
    });
    let mut engine = DycleeEngine::new(config).expect("engine");

    engine
        .process(&[0.5, 0.5], 0, Label::external("walking"))
        .expect("labeled");
    let label = engine
        .process(&[0.5, 0.5], 1, Label::Unclassed)
        .expect("unlabeled");

    assert_eq!(label, Label::external("walking"));
    assert_eq!(
        engine.last_final_clusters()[0].label,
        Label::external("walking")
    );
}

#[test]
fn test_reject_outliers_keeps_store_unchanged() {
    let config = unit_square(0.1).with_features(FeatureFlags {
        reject_outliers: true,
        ..FeatureFlags::none()
    });
    let mut engine = DycleeEngine::new(config).expect("engine");

    engine.process(&[0.5, 0.5], 0, Label::Unclassed).expect("first");
    let label = engine.process(&[0.9, 0.1], 1, Label::Unclassed).expect("outlier");

    assert!(label.is_unclassed());
    assert_eq!(engine.store().total(), 1);
    assert_eq!(engine.processed(), 2);
}

#[test]
fn test_distance_stage_reachability_is_strict() {
    assert!(DistanceStage::is_reachable(&[0.5], &[0.5625], &[0.25]));
    assert!(!DistanceStage::is_reachable(&[0.5], &[0.625], &[0.25]));
}

#[test]
fn test_csv_dataset_end_to_end() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("stream.csv");
    let mut csv = String::from("timestamp,a,b,class\n");
    for t in 0..12 {
        let (a, b, class) = if t % 2 == 0 {
            (90.0, 5.0, "high")
        } else {
            (10.0, 95.0, "low")
        };
        csv.push_str(&format!("{t},{a},{b},{class}\n"));
    }
    std::fs::write(&input, csv).expect("write");

    let dataset: Dataset = io::read_dataset(&input).expect("read");
    let config = DycleeConfig::new(0.1)
        .with_context(vec![0.0, 0.0], vec![100.0, 100.0])
        .with_label_run_id("csv");
    let mut engine = DycleeEngine::new(config).expect("engine");
    let labels = engine
        .run_dataset(
            &dataset.rows,
            dataset.timestamps.as_deref(),
            dataset.labels.as_deref(),
        )
        .expect("run");

    assert_eq!(labels.len(), 12);
    assert_eq!(labels[0], Label::external("high"));
    assert_eq!(labels[1], Label::external("low"));

    let output = dir.path().join("labels.csv");
    io::write_labels(&output, &labels).expect("write labels");
    let written = std::fs::read_to_string(&output).expect("read labels");
    assert!(written.starts_with("row,label\n0,high\n1,low\n"));

    let centers = engine.final_cluster_centers().expect("centers");
    assert_eq!(centers.len(), 2);
    assert!(centers.iter().any(|c| (c[0] - 90.0).abs() < 1e-9));
}
