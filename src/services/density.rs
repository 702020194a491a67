//! Density stage: classification, cluster formation and restructuring.
//!
//! Runs every `t_global` observations over the union of active and
//! candidate microclusters:
//!
//! 1. Classify each microcluster against the mean and median density.
//! 2. Flood-fill the connectivity graph from every unseen dense seed.
//! 3. Aggregate each flood fill into a [`FinalCluster`].
//! 4. Rebuild the collections and apply the retention policy.
//! 5. Capture a [`Snapshot`] of the classified set.

use crate::config::{DycleeConfig, FeatureFlags};
use crate::gc::{RetentionConfig, RetentionPolicy, RetentionResult};
use crate::metric::manhattan_distance;
use crate::models::{
    ClusterId, Context, DensityType, FinalCluster, Label, LabelGenerator, MicroCluster, Timestamp,
};
use crate::observability::{duration_to_millis, usize_to_f64};
use crate::services::VarianceTracker;
use crate::storage::{
    Collection, ConnectivityIndex, ConnectivityRule, MicroclusterStore, Restructure, Snapshot,
    build_index,
};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Summary of one density stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityReport {
    /// Timestamp the stage ran at.
    pub timestamp: Timestamp,
    /// Mean density over the classified microclusters.
    pub mean_density: f64,
    /// Median density over the classified microclusters.
    pub median_density: f64,
    /// Number of dense microclusters.
    pub dense: usize,
    /// Number of semi-dense microclusters.
    pub semi_dense: usize,
    /// Number of low-density microclusters.
    pub low_density: usize,
    /// Final clusters emitted by the stage.
    pub final_clusters: Vec<FinalCluster>,
    /// Fate of the low-density microclusters.
    pub retention: RetentionResult,
    /// Stage duration in milliseconds.
    pub duration_ms: u64,
}

/// Result of density classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Mean density.
    pub mean: f64,
    /// Median density.
    pub median: f64,
    /// Dense ids, labeled ones first.
    pub dense: Vec<ClusterId>,
    /// Semi-dense ids.
    pub semi_dense: Vec<ClusterId>,
    /// Low-density ids.
    pub low_density: Vec<ClusterId>,
}

/// Traversal state shared by the flood fills of one stage.
struct FloodFill<'a> {
    store: &'a mut MicroclusterStore,
    index: &'a dyn ConnectivityIndex,
    seen: HashSet<ClusterId>,
    dense_only: bool,
}

impl FloodFill<'_> {
    fn label_of(&self, id: ClusterId) -> Label {
        self.store
            .get(id)
            .map(|mc| mc.label().clone())
            .unwrap_or_default()
    }

    fn set_label(&mut self, id: ClusterId, label: &Label) {
        if let Some(mc) = self.store.get_mut(id) {
            mc.set_label(label.clone());
        }
    }

    fn density_type(&self, id: ClusterId) -> DensityType {
        self.store
            .get(id)
            .map_or(DensityType::Outlier, MicroCluster::density_type)
    }

    fn admits(&self, id: ClusterId) -> bool {
        if self.dense_only {
            self.density_type(id) == DensityType::Dense
        } else {
            self.is_not_outlier(id)
        }
    }

    fn is_not_outlier(&self, id: ClusterId) -> bool {
        self.density_type(id) != DensityType::Outlier
    }

    /// Propagates `label` from `seed`; returns the admitted members.
    ///
    /// Every neighbor discovered from an admitted member takes the label,
    /// admitted or not.
    fn propagate(&mut self, seed: ClusterId, label: &Label) -> Vec<ClusterId> {
        let mut members = vec![seed];
        let mut frontier: VecDeque<ClusterId> = self.index.neighbors(self.store, seed).into();

        while let Some(id) = frontier.pop_front() {
            if self.seen.contains(&id) || !self.admits(id) {
                continue;
            }
            self.set_label(id, label);
            self.seen.insert(id);
            members.push(id);

            for neighbor in self.index.neighbors(self.store, id) {
                if !self.seen.contains(&neighbor) && self.admits(neighbor) {
                    frontier.push_back(neighbor);
                }
                self.set_label(neighbor, label);
            }
        }

        members
    }

    /// Traverses from `seed` collecting label votes.
    ///
    /// Admission only excludes outliers, whatever the dense-only setting.
    fn collect_votes(
        &mut self,
        seed: ClusterId,
        seed_label: &Label,
        generator: &LabelGenerator,
    ) -> Ballot {
        let mut ballot = Ballot {
            members: vec![seed],
            excluded: Vec::new(),
            encountered: vec![seed_label.clone()],
            voters: vec![seed],
            foreign: None,
        };
        let mut frontier: VecDeque<ClusterId> = self.index.neighbors(self.store, seed).into();

        while let Some(id) = frontier.pop_front() {
            if self.seen.contains(&id) || !self.is_not_outlier(id) {
                continue;
            }
            ballot.record(id, self.label_of(id), generator);
            self.seen.insert(id);
            ballot.members.push(id);

            for neighbor in self.index.neighbors(self.store, id) {
                if self.seen.contains(&neighbor) {
                    continue;
                }
                if self.is_not_outlier(neighbor) {
                    frontier.push_back(neighbor);
                    ballot.record(neighbor, self.label_of(neighbor), generator);
                } else {
                    ballot.excluded.push(neighbor);
                    self.seen.insert(neighbor);
                }
            }
        }

        ballot
    }
}

/// Labels gathered by one label-voting traversal.
struct Ballot {
    members: Vec<ClusterId>,
    excluded: Vec<ClusterId>,
    /// Every non-unclassed label seen, in encounter order (with repeats).
    encountered: Vec<Label>,
    /// Microclusters whose labels were recorded, parallel to `encountered`.
    voters: Vec<ClusterId>,
    /// Most recent label not minted by this engine.
    foreign: Option<Label>,
}

impl Ballot {
    fn record(&mut self, id: ClusterId, label: Label, generator: &LabelGenerator) {
        if label.is_unclassed() {
            return;
        }
        if !generator.owns(&label) {
            self.foreign = Some(label.clone());
        }
        self.encountered.push(label);
        self.voters.push(id);
    }

    /// Resolves the winning label.
    fn resolve(&self, store: &MicroclusterStore, seed_label: &Label, center: &[f64]) -> Label {
        if let Some(foreign) = &self.foreign {
            return foreign.clone();
        }

        let mut counts: Vec<(&Label, usize)> = Vec::new();
        for label in &self.encountered {
            match counts.iter_mut().find(|(seen, _)| *seen == label) {
                Some((_, count)) => *count += 1,
                None => counts.push((label, 1)),
            }
        }
        let top = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
        let modes: Vec<&Label> = counts
            .iter()
            .filter(|(_, count)| *count == top)
            .map(|(label, _)| *label)
            .collect();

        if let [single] = modes.as_slice() {
            return (*single).clone();
        }
        if modes.len() == self.members.len() {
            return seed_label.clone();
        }

        let mut votes: Vec<(&Label, f64)> = counts.iter().map(|(label, _)| (*label, 0.0)).collect();
        for id in &self.voters {
            let Some(mc) = store.get(*id) else {
                continue;
            };
            let weight = mc.density() * (1.0 / manhattan_distance(mc.center(), center));
            if let Some((_, total)) = votes.iter_mut().find(|(label, _)| *label == mc.label()) {
                if !weight.is_nan() {
                    *total += weight;
                }
            }
        }

        let mut winner: Option<(&Label, f64)> = None;
        for (label, total) in votes {
            if winner.is_none_or(|(_, best)| total > best) {
                winner = Some((label, total));
            }
        }
        winner.map_or_else(|| seed_label.clone(), |(label, _)| label.clone())
    }
}

/// Periodic density analysis over the live microclusters.
pub struct DensityStage {
    features: FeatureFlags,
    uncdim: usize,
    retention: RetentionPolicy,
    index: Box<dyn ConnectivityIndex>,
}

impl DensityStage {
    /// Creates a density stage from the engine configuration.
    #[must_use]
    pub fn new(config: &DycleeConfig) -> Self {
        Self {
            features: config.features,
            uncdim: config.uncdim,
            retention: RetentionPolicy::new(RetentionConfig::new(config.features.long_term_memory)),
            index: build_index(config.connectivity, config.phi),
        }
    }

    /// Name of the connectivity backend.
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.index.name()
    }

    /// Builds the connectivity rule for the current geometry.
    ///
    /// With variance-based reduction, overlap is counted only on the
    /// `common_dims` highest-variance dimensions.
    #[must_use]
    pub fn connectivity_rule(
        &self,
        context: &Context,
        variance: &VarianceTracker,
    ) -> ConnectivityRule {
        let common_dims = context.dimensions().saturating_sub(self.uncdim);
        let rule = ConnectivityRule::new(context.hyperbox_sizes().to_vec(), common_dims);
        if self.features.variance_based_reduction {
            rule.with_selected_dims(variance.top_dimensions(common_dims))
        } else {
            rule
        }
    }

    /// Classifies every id in `live` and records the class on the microcluster.
    pub fn classify(store: &mut MicroclusterStore, live: &[ClusterId]) -> Classification {
        let densities: Vec<f64> = live
            .iter()
            .filter_map(|id| store.get(*id).map(MicroCluster::density))
            .collect();
        let (mean, median) = mean_and_median(&densities);

        let mut classification = Classification {
            mean,
            median,
            ..Classification::default()
        };
        let mut unlabeled_dense = Vec::new();

        for id in live {
            let Some(mc) = store.get_mut(*id) else {
                continue;
            };
            let density_type = DensityType::classify(mc.density(), mean, median);
            mc.set_density_type(density_type);
            match density_type {
                DensityType::Dense if mc.label().is_unclassed() => unlabeled_dense.push(*id),
                DensityType::Dense => classification.dense.push(*id),
                DensityType::SemiDense => classification.semi_dense.push(*id),
                DensityType::LowDensity | DensityType::Outlier => {
                    classification.low_density.push(*id);
                },
            }
        }
        // Labeled seeds go first, most recently classified at the front.
        classification.dense.reverse();
        classification.dense.extend(unlabeled_dense);

        classification
    }

    /// Runs a full density stage.
    ///
    /// Returns the stage report and the snapshot to record.
    #[instrument(
        name = "dyclee.density.stage",
        skip_all,
        fields(
            component = "density",
            operation = "stage",
            timestamp = now,
            backend = self.index.name(),
            label_voting = self.features.label_voting
        )
    )]
    pub fn run(
        &mut self,
        store: &mut MicroclusterStore,
        labels: &mut LabelGenerator,
        context: &Context,
        variance: &VarianceTracker,
        now: Timestamp,
    ) -> (DensityReport, Snapshot) {
        let start = Instant::now();
        let live = store.live_ids();
        let classification = Self::classify(store, &live);
        debug!(
            live = live.len(),
            mean = classification.mean,
            median = classification.median,
            dense = classification.dense.len(),
            semi_dense = classification.semi_dense.len(),
            low_density = classification.low_density.len(),
            "Classified microclusters"
        );

        let rule = self.connectivity_rule(context, variance);
        self.index.rebuild(store, &live, &rule);

        let final_clusters = self.form_clusters(store, labels, &classification.dense);

        let microclusters = classification
            .dense
            .iter()
            .chain(&classification.semi_dense)
            .chain(&classification.low_density)
            .filter_map(|id| store.get(*id).cloned())
            .collect();
        let snapshot = Snapshot {
            timestamp: now,
            final_clusters: final_clusters.clone(),
            microclusters,
        };

        let retention = self.retention.apply(
            store,
            &classification.low_density,
            now,
            classification.mean,
            classification.median,
        );
        store.restructure(Restructure {
            active: classification
                .dense
                .iter()
                .chain(&classification.semi_dense)
                .copied()
                .collect(),
            candidate: retention.kept.clone(),
            archived: retention.archived.clone(),
            discarded: retention.discarded.clone(),
        });

        let report = DensityReport {
            timestamp: now,
            mean_density: classification.mean,
            median_density: classification.median,
            dense: classification.dense.len(),
            semi_dense: classification.semi_dense.len(),
            low_density: classification.low_density.len(),
            final_clusters,
            retention,
            duration_ms: duration_to_millis(start.elapsed()),
        };

        metrics::counter!("dyclee_density_cycles_total").increment(1);
        metrics::histogram!("dyclee_density_stage_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        metrics::gauge!("dyclee_final_clusters").set(usize_to_f64(report.final_clusters.len()));
        for collection in [Collection::Active, Collection::Candidate, Collection::Archive] {
            metrics::gauge!("dyclee_microclusters", "collection" => collection.as_str())
                .set(usize_to_f64(store.len(collection)));
        }

        info!(
            timestamp = now,
            final_clusters = report.final_clusters.len(),
            dense = report.dense,
            semi_dense = report.semi_dense,
            low_density = report.low_density,
            duration_ms = report.duration_ms,
            "Density stage completed"
        );

        (report, snapshot)
    }

    /// Flood-fills from every unseen dense seed and aggregates the results.
    fn form_clusters(
        &self,
        store: &mut MicroclusterStore,
        labels: &mut LabelGenerator,
        dense: &[ClusterId],
    ) -> Vec<FinalCluster> {
        let mut fill = FloodFill {
            store,
            index: self.index.as_ref(),
            seen: HashSet::new(),
            dense_only: self.features.dense_only_connectivity,
        };
        let mut final_clusters = Vec::new();

        for seed in dense {
            if !fill.seen.insert(*seed) {
                continue;
            }
            let mut seed_label = fill.label_of(*seed);
            if seed_label.is_unclassed() {
                seed_label = labels.next_label();
                fill.set_label(*seed, &seed_label);
            }

            let (members, label) = if self.features.label_voting {
                let ballot = fill.collect_votes(*seed, &seed_label, labels);
                let center = aggregate(fill.store, Label::Unclassed, &ballot.members)
                    .map(|cluster| cluster.center)
                    .unwrap_or_default();
                let label = ballot.resolve(fill.store, &seed_label, &center);
                for id in ballot.excluded.iter().chain(&ballot.members) {
                    fill.set_label(*id, &label);
                }
                (ballot.members, label)
            } else {
                (fill.propagate(*seed, &seed_label), seed_label)
            };

            if self.features.discard_small_clusters && members.len() < 2 {
                debug!(seed = %seed, "Discarded single-microcluster final cluster");
                continue;
            }
            if let Some(cluster) = aggregate(fill.store, label, &members) {
                final_clusters.push(cluster);
            }
        }

        final_clusters
    }
}

impl std::fmt::Debug for DensityStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DensityStage")
            .field("features", &self.features)
            .field("uncdim", &self.uncdim)
            .field("retention", &self.retention)
            .field("backend", &self.index.name())
            .finish()
    }
}

fn aggregate(
    store: &MicroclusterStore,
    label: Label,
    members: &[ClusterId],
) -> Option<FinalCluster> {
    let refs: Vec<&MicroCluster> = members.iter().filter_map(|id| store.get(*id)).collect();
    FinalCluster::from_members(label, &refs)
}

/// Mean and median of `values`; both zero for an empty slice.
fn mean_and_median(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    (mean, median)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectivityStrategy;
    use crate::models::ForgetMethod;

    const PHI: f64 = 0.1;
    const VOLUME: f64 = 0.01;

    fn context() -> Context {
        Context::fixed(vec![0.0, 0.0], vec![1.0, 1.0], PHI).expect("valid context")
    }

    /// A microcluster at `point` holding `weight` observations.
    fn mc(point: &[f64], weight: usize, label: Label) -> MicroCluster {
        let mut mc = MicroCluster::new(point, 0, VOLUME, label, ForgetMethod::None);
        for _ in 1..weight {
            mc.insert(point, 0, &Label::Unclassed);
        }
        mc.update_density(VOLUME);
        mc
    }

    fn run(
        config: &DycleeConfig,
        store: &mut MicroclusterStore,
        labels: &mut LabelGenerator,
    ) -> DensityReport {
        let mut stage = DensityStage::new(config);
        stage.run(store, labels, &context(), &VarianceTracker::new(), 5).0
    }

    #[test]
    fn test_mean_and_median() {
        assert_eq!(mean_and_median(&[]), (0.0, 0.0));
        assert_eq!(mean_and_median(&[3.0, 1.0, 2.0]), (2.0, 2.0));
        assert_eq!(mean_and_median(&[1.0, 2.0, 3.0, 10.0]), (4.0, 2.5));
    }

    #[test]
    fn test_classification_orders_labeled_dense_first() {
        let mut store = MicroclusterStore::new();
        let unlabeled = store.insert(mc(&[0.1, 0.1], 3, Label::Unclassed), Collection::Candidate);
        let labeled = store.insert(mc(&[0.5, 0.5], 3, Label::external("a")), Collection::Candidate);
        let low = store.insert(mc(&[0.9, 0.9], 1, Label::Unclassed), Collection::Candidate);

        let live = store.live_ids();
        let classification = DensityStage::classify(&mut store, &live);

        assert_eq!(classification.dense, vec![labeled, unlabeled]);
        assert_eq!(classification.low_density, vec![low]);
        assert!(classification.semi_dense.is_empty());
        assert!(store.get(labeled).expect("stored").was_dense());
    }

    #[test]
    fn test_classification_is_exhaustive() {
        let mut store = MicroclusterStore::new();
        for (i, weight) in [1, 2, 3, 5, 8].into_iter().enumerate() {
            let x = 0.1 + 0.15 * i as f64;
            store.insert(mc(&[x, x], weight, Label::Unclassed), Collection::Candidate);
        }
        let live = store.live_ids();
        let c = DensityStage::classify(&mut store, &live);
        assert_eq!(c.dense.len() + c.semi_dense.len() + c.low_density.len(), live.len());
    }

    #[test]
    fn test_connected_dense_merge_into_one_cluster() {
        let mut store = MicroclusterStore::new();
        let a = store.insert(mc(&[0.50, 0.50], 3, Label::Unclassed), Collection::Candidate);
        let b = store.insert(mc(&[0.55, 0.50], 3, Label::Unclassed), Collection::Candidate);
        let far = store.insert(mc(&[0.90, 0.90], 3, Label::Unclassed), Collection::Candidate);

        let mut labels = LabelGenerator::with_run_id("t");
        let report = run(&DycleeConfig::new(PHI), &mut store, &mut labels);

        assert_eq!(report.final_clusters.len(), 2);
        assert_eq!(report.final_clusters[0].members, 2);
        let label_a = store.get(a).expect("a").label().clone();
        assert_eq!(store.get(b).expect("b").label(), &label_a);
        assert_ne!(store.get(far).expect("far").label(), &label_a);
        assert_eq!(store.ids(Collection::Active).len(), 3);
    }

    #[test]
    fn test_existing_label_is_reused() {
        let mut store = MicroclusterStore::new();
        let a = store.insert(mc(&[0.5, 0.5], 3, Label::external("truth")), Collection::Candidate);
        store.insert(mc(&[0.55, 0.5], 3, Label::Unclassed), Collection::Candidate);

        let mut labels = LabelGenerator::with_run_id("t");
        let report = run(&DycleeConfig::new(PHI), &mut store, &mut labels);

        assert_eq!(report.final_clusters.len(), 1);
        assert_eq!(report.final_clusters[0].label, Label::external("truth"));
        assert_eq!(store.get(a).expect("a").label(), &Label::external("truth"));
    }

    #[test]
    fn test_dense_only_connectivity_excludes_semi_dense_members() {
        let mut store = MicroclusterStore::new();
        // Densities 5, 1, 1, 1: mean 2, median 1 -> one dense, three semi-dense.
        let seed = store.insert(mc(&[0.5, 0.5], 5, Label::Unclassed), Collection::Candidate);
        let semi = store.insert(mc(&[0.55, 0.5], 1, Label::Unclassed), Collection::Candidate);
        store.insert(mc(&[0.1, 0.1], 1, Label::Unclassed), Collection::Candidate);
        store.insert(mc(&[0.9, 0.9], 1, Label::Unclassed), Collection::Candidate);

        let mut features = FeatureFlags::none();
        features.dense_only_connectivity = true;
        let config = DycleeConfig::new(PHI).with_features(features);
        let mut labels = LabelGenerator::with_run_id("t");
        let report = run(&config, &mut store, &mut labels);

        assert_eq!(report.dense, 1);
        assert_eq!(report.final_clusters.len(), 1);
        assert_eq!(report.final_clusters[0].members, 1);
        assert!(store.get(semi).expect("semi").label().is_unclassed());
        assert!(!store.get(seed).expect("seed").label().is_unclassed());
    }

    #[test]
    fn test_label_voting_prefers_foreign_label() {
        let mut store = MicroclusterStore::new();
        let mut labels = LabelGenerator::with_run_id("t");
        let generated = labels.next_label();
        // Labeled seeds are visited newest first, so `a` seeds the fill.
        let b = store.insert(mc(&[0.55, 0.5], 3, Label::external("truth")), Collection::Candidate);
        let a = store.insert(mc(&[0.50, 0.5], 3, generated), Collection::Candidate);

        let mut features = FeatureFlags::none();
        features.label_voting = true;
        let config = DycleeConfig::new(PHI).with_features(features);
        let report = run(&config, &mut store, &mut labels);

        assert_eq!(report.final_clusters.len(), 1);
        assert_eq!(report.final_clusters[0].label, Label::external("truth"));
        assert_eq!(store.get(a).expect("a").label(), &Label::external("truth"));
        assert_eq!(store.get(b).expect("b").label(), &Label::external("truth"));
    }

    #[test]
    fn test_label_voting_unique_mode_wins() {
        let mut store = MicroclusterStore::new();
        let mut labels = LabelGenerator::with_run_id("t");
        let first = labels.next_label();
        let second = labels.next_label();
        store.insert(mc(&[0.50, 0.5], 3, first.clone()), Collection::Candidate);
        store.insert(mc(&[0.55, 0.5], 3, second.clone()), Collection::Candidate);
        store.insert(mc(&[0.60, 0.5], 3, second.clone()), Collection::Candidate);

        let mut features = FeatureFlags::none();
        features.label_voting = true;
        let config = DycleeConfig::new(PHI).with_features(features);
        let report = run(&config, &mut store, &mut labels);

        assert_eq!(report.final_clusters.len(), 1);
        assert_eq!(report.final_clusters[0].label, second);
    }

    fn voting_config() -> DycleeConfig {
        let mut features = FeatureFlags::none();
        features.label_voting = true;
        DycleeConfig::new(PHI).with_features(features)
    }

    #[test]
    fn test_label_voting_all_distinct_keeps_seed_label() {
        let mut store = MicroclusterStore::new();
        let mut labels = LabelGenerator::with_run_id("t");
        let seed_label = labels.next_label();
        let heavier = labels.next_label();
        // `b` outweighs `a`, but one vote each falls back to the seed label.
        let b = store.insert(mc(&[0.5625, 0.5], 5, heavier), Collection::Candidate);
        let a = store.insert(mc(&[0.5, 0.5], 3, seed_label.clone()), Collection::Candidate);
        store.insert(mc(&[0.9, 0.9], 1, Label::Unclassed), Collection::Candidate);

        let report = run(&voting_config(), &mut store, &mut labels);

        assert_eq!(report.final_clusters.len(), 1);
        assert_eq!(report.final_clusters[0].label, seed_label);
        assert_eq!(store.get(a).expect("a").label(), &seed_label);
        assert_eq!(store.get(b).expect("b").label(), &seed_label);
    }

    #[test]
    fn test_label_voting_weighs_tied_modes_by_density_and_distance() {
        let mut store = MicroclusterStore::new();
        let mut labels = LabelGenerator::with_run_id("t");
        let x = labels.next_label();
        let y = labels.next_label();

        // A fully decayed voter at the cluster center weighs 0 * inf.
        let forget = ForgetMethod::Linear { rate: 1.0 };
        let mut faded = MicroCluster::new(&[0.5, 0.5], 0, VOLUME, x.clone(), forget);
        faded.update_cluster(5);
        faded.update_density(VOLUME);
        assert!(faded.density().abs() < f64::EPSILON);

        let d = store.insert(mc(&[0.5625, 0.5], 3, y.clone()), Collection::Candidate);
        let b = store.insert(faded, Collection::Candidate);
        let a = store.insert(mc(&[0.4375, 0.5], 3, x), Collection::Candidate);

        let report = run(&voting_config(), &mut store, &mut labels);

        assert_eq!(report.final_clusters.len(), 1);
        assert_eq!(report.final_clusters[0].label, y);
        assert_eq!(report.final_clusters[0].members, 3);
        for id in [a, b, d] {
            assert_eq!(store.get(id).expect("member").label(), &y);
        }
    }

    #[test]
    fn test_label_voting_weight_tie_keeps_first_label() {
        let mut store = MicroclusterStore::new();
        let mut labels = LabelGenerator::with_run_id("t");
        let x = labels.next_label();
        let y = labels.next_label();
        // Every member sits on the center, so every weight is infinite.
        store.insert(mc(&[0.5, 0.5], 3, x.clone()), Collection::Candidate);
        let c = store.insert(mc(&[0.5, 0.5], 3, y), Collection::Candidate);
        store.insert(mc(&[0.5, 0.5], 3, x.clone()), Collection::Candidate);

        let report = run(&voting_config(), &mut store, &mut labels);

        assert_eq!(report.final_clusters.len(), 1);
        assert_eq!(report.final_clusters[0].label, x);
        assert_eq!(store.get(c).expect("c").label(), &x);
    }

    #[test]
    fn test_propagation_labels_neighbors_it_does_not_admit() {
        let mut store = MicroclusterStore::new();
        // Densities 500, 500, 200, 100, 100, 100: mean 250, median 150.
        let a = store.insert(mc(&[0.5, 0.5], 5, Label::Unclassed), Collection::Candidate);
        store.insert(mc(&[0.5625, 0.5], 5, Label::Unclassed), Collection::Candidate);
        let semi = store.insert(mc(&[0.625, 0.5], 2, Label::Unclassed), Collection::Candidate);
        for point in [[0.1, 0.1], [0.1, 0.3], [0.9, 0.9]] {
            store.insert(mc(&point, 1, Label::Unclassed), Collection::Candidate);
        }

        let mut features = FeatureFlags::none();
        features.dense_only_connectivity = true;
        let config = DycleeConfig::new(PHI).with_features(features);
        let mut labels = LabelGenerator::with_run_id("t");
        let report = run(&config, &mut store, &mut labels);

        assert_eq!(report.semi_dense, 1);
        assert_eq!(report.final_clusters.len(), 1);
        assert_eq!(report.final_clusters[0].members, 2);
        let label = store.get(a).expect("a").label().clone();
        assert!(!label.is_unclassed());
        assert_eq!(store.get(semi).expect("semi").label(), &label);
    }

    #[test]
    fn test_discard_small_clusters() {
        let mut store = MicroclusterStore::new();
        store.insert(mc(&[0.1, 0.1], 3, Label::Unclassed), Collection::Candidate);
        store.insert(mc(&[0.5, 0.5], 3, Label::Unclassed), Collection::Candidate);
        store.insert(mc(&[0.55, 0.5], 3, Label::Unclassed), Collection::Candidate);

        let mut features = FeatureFlags::none();
        features.discard_small_clusters = true;
        let config = DycleeConfig::new(PHI).with_features(features);
        let mut labels = LabelGenerator::with_run_id("t");
        let report = run(&config, &mut store, &mut labels);

        assert_eq!(report.final_clusters.len(), 1);
        assert_eq!(report.final_clusters[0].members, 2);
    }

    #[test]
    fn test_indexed_backend_matches_exhaustive_for_separated_groups() {
        let build = || {
            let mut store = MicroclusterStore::new();
            store.insert(mc(&[0.50, 0.50], 3, Label::Unclassed), Collection::Candidate);
            store.insert(mc(&[0.50, 0.50], 3, Label::Unclassed), Collection::Candidate);
            store.insert(mc(&[0.90, 0.10], 3, Label::Unclassed), Collection::Candidate);
            store
        };
        let mut counts = Vec::new();
        for strategy in [ConnectivityStrategy::Exhaustive, ConnectivityStrategy::Indexed] {
            let mut store = build();
            let mut labels = LabelGenerator::with_run_id("t");
            let config = DycleeConfig::new(PHI).with_connectivity(strategy);
            let report = run(&config, &mut store, &mut labels);
            counts.push(
                report
                    .final_clusters
                    .iter()
                    .map(|c| c.members)
                    .collect::<Vec<_>>(),
            );
        }
        assert_eq!(counts[0], counts[1]);
        assert_eq!(counts[0], vec![2, 1]);
    }

    #[test]
    fn test_snapshot_contains_classified_set() {
        let mut store = MicroclusterStore::new();
        store.insert(mc(&[0.5, 0.5], 3, Label::Unclassed), Collection::Candidate);
        store.insert(mc(&[0.9, 0.9], 1, Label::Unclassed), Collection::Candidate);

        let mut stage = DensityStage::new(&DycleeConfig::new(PHI));
        let mut labels = LabelGenerator::with_run_id("t");
        let (report, snapshot) =
            stage.run(&mut store, &mut labels, &context(), &VarianceTracker::new(), 4);

        assert_eq!(snapshot.timestamp, 4);
        assert_eq!(snapshot.microclusters.len(), 2);
        assert_eq!(snapshot.final_clusters, report.final_clusters);
    }

    #[test]
    fn test_variance_rule_selects_top_dimensions() {
        let mut features = FeatureFlags::none();
        features.variance_based_reduction = true;
        let config = DycleeConfig::new(PHI).with_features(features).with_uncdim(1);
        let stage = DensityStage::new(&config);
        let mut variance = VarianceTracker::new();
        variance.update(&[0.1, 0.9]);

        let rule = stage.connectivity_rule(&context(), &variance);
        assert_eq!(rule.common_dims(), 1);
        assert_eq!(rule.selected_dims(), Some(&[1][..]));
    }
}
