//! The streaming clustering engine.

use super::{Assignment, DensityReport, DensityStage, DistanceStage, VarianceTracker};
use crate::config::DycleeConfig;
use crate::models::{Context, FinalCluster, Label, LabelGenerator, Timestamp};
use crate::storage::{Collection, MicroclusterStore, SnapshotStore};
use crate::{Error, Result};
use tracing::{debug, info, instrument, warn};

/// Relative hyperbox size above which clustering quality degrades.
const PHI_ADVISORY: f64 = 0.5;

/// Streaming density-based clustering engine.
///
/// Owns every microcluster, the normalization context and the snapshot
/// history. Observations are absorbed one at a time with
/// [`process`](Self::process); every `t_global` observations the density
/// stage runs inline before `process` returns.
#[derive(Debug)]
pub struct DycleeEngine {
    config: DycleeConfig,
    context: Option<Context>,
    store: MicroclusterStore,
    snapshots: SnapshotStore,
    labels: LabelGenerator,
    variance: VarianceTracker,
    distance: DistanceStage,
    density: DensityStage,
    since_density: u64,
    processed: u64,
    last_report: Option<DensityReport>,
}

impl DycleeEngine {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation, the fixed
    /// context is malformed or degenerate, or the snapshot parameters are
    /// invalid.
    pub fn new(config: DycleeConfig) -> Result<Self> {
        config.validate()?;
        if config.phi > PHI_ADVISORY {
            warn!(phi = config.phi, "Relative hyperbox size above 0.5 may yield poor clustering");
        }

        let context = config
            .context
            .as_ref()
            .map(|bounds| Context::fixed(bounds.min.clone(), bounds.max.clone(), config.phi))
            .transpose()?;
        let snapshots = SnapshotStore::new(config.snapshot_alpha, config.snapshot_levels)?;
        let labels = config
            .label_run_id
            .as_ref()
            .map_or_else(LabelGenerator::new, LabelGenerator::with_run_id);
        let distance = DistanceStage::new(
            config.forget,
            config.features.long_term_memory,
            config.features.reject_outliers,
        );
        let density = DensityStage::new(&config);

        info!(
            phi = config.phi,
            t_global = config.t_global,
            uncdim = config.uncdim,
            forget = config.forget.as_str(),
            backend = density.backend(),
            adaptive = context.is_none(),
            run_id = labels.run_id(),
            "Engine created"
        );

        Ok(Self {
            config,
            context,
            store: MicroclusterStore::new(),
            snapshots,
            labels,
            variance: VarianceTracker::new(),
            distance,
            density,
            since_density: 0,
            processed: 0,
            last_report: None,
        })
    }

    /// Absorbs one observation.
    ///
    /// Returns the label of the absorbing microcluster as of insertion
    /// (later density stages may relabel it), or `Unclassed` for a
    /// rejected outlier.
    ///
    /// # Errors
    ///
    /// Returns an error if the point is empty, non-finite or has the wrong
    /// dimensionality, or if `uncdim` exceeds the dimensionality of the
    /// first observation.
    pub fn process(&mut self, point: &[f64], timestamp: Timestamp, label: Label) -> Result<Label> {
        let normalized = self.normalize(point)?;
        let (sizes, volume) = self.geometry()?;

        if self.config.features.variance_based_reduction {
            self.variance.update(&normalized);
        }

        let assignment =
            self.distance
                .assign(&mut self.store, &normalized, timestamp, &label, &sizes, volume);
        let assigned_label = assignment
            .cluster()
            .and_then(|id| self.store.get(id))
            .map(|mc| mc.label().clone())
            .unwrap_or_default();
        if let Assignment::Created { id } = assignment {
            debug!(cluster = %id, timestamp, "Created microcluster");
        }

        self.store.decay_live(timestamp, volume);
        self.processed += 1;
        metrics::counter!("dyclee_points_processed_total").increment(1);

        self.since_density += 1;
        if self.since_density == self.config.t_global {
            self.since_density = 0;
            self.density_stage(timestamp)?;
        }

        Ok(assigned_label)
    }

    /// Runs the engine over an in-memory dataset.
    ///
    /// `timestamps` defaults to the row index and `labels` to all
    /// `Unclassed`. Returns one label per row, as [`process`](Self::process).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for ragged rows or column lengths
    /// that differ from the row count, and any error from `process`.
    #[instrument(
        name = "dyclee.engine.run_dataset",
        skip_all,
        fields(component = "engine", operation = "run_dataset", rows = rows.len())
    )]
    pub fn run_dataset(
        &mut self,
        rows: &[Vec<f64>],
        timestamps: Option<&[Timestamp]>,
        labels: Option<&[Label]>,
    ) -> Result<Vec<Label>> {
        if let Some(first) = rows.first() {
            if let Some(row) = rows.iter().position(|row| row.len() != first.len()) {
                return Err(Error::InvalidInput(format!(
                    "row {row} has {} features, expected {}",
                    rows[row].len(),
                    first.len()
                )));
            }
        }
        check_column("timestamps", timestamps.map(<[_]>::len), rows.len())?;
        check_column("labels", labels.map(<[_]>::len), rows.len())?;

        let mut assigned = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let timestamp = timestamps.map_or(i as Timestamp, |ts| ts[i]);
            let label = labels.map_or(Label::Unclassed, |ls| ls[i].clone());
            assigned.push(self.process(row, timestamp, label)?);
        }

        info!(
            rows = rows.len(),
            microclusters = self.store.total(),
            final_clusters = self.last_final_clusters().len(),
            "Dataset processed"
        );
        Ok(assigned)
    }

    /// Windowed curve-fitting ingestion.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotImplemented`].
    pub fn run_dataset_windowed(
        &mut self,
        _rows: &[Vec<f64>],
        _timestamps: Option<&[Timestamp]>,
        _max_window: Option<usize>,
    ) -> Result<Vec<Label>> {
        Err(Error::NotImplemented(
            "windowed dataset abstraction".to_string(),
        ))
    }

    /// Continuous stream ingestion.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotImplemented`].
    pub fn run_stream<I>(&mut self, _stream: I) -> Result<Vec<Label>>
    where
        I: IntoIterator<Item = (Vec<f64>, Timestamp, Label)>,
    {
        Err(Error::NotImplemented("continuous stream ingestion".to_string()))
    }

    /// Runs a density stage now and records its snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no observation has been processed
    /// and no fixed context was configured.
    pub fn density_stage(&mut self, now: Timestamp) -> Result<&DensityReport> {
        let context = self.context.as_ref().ok_or_else(|| {
            Error::InvalidInput(
                "density stage needs a context; process an observation first".to_string(),
            )
        })?;
        let (report, snapshot) =
            self.density
                .run(&mut self.store, &mut self.labels, context, &self.variance, now);
        self.snapshots.record(&snapshot);
        Ok(self.last_report.insert(report))
    }

    /// Final clusters from the most recent density stage.
    #[must_use]
    pub fn last_final_clusters(&self) -> &[FinalCluster] {
        self.last_report
            .as_ref()
            .map_or(&[], |report| report.final_clusters.as_slice())
    }

    /// Report of the most recent density stage.
    #[must_use]
    pub const fn last_report(&self) -> Option<&DensityReport> {
        self.last_report.as_ref()
    }

    /// Final cluster centers of the most recent density stage in input units.
    ///
    /// # Errors
    ///
    /// Returns an error if a center does not match the context dimensionality.
    pub fn final_cluster_centers(&self) -> Result<Vec<Vec<f64>>> {
        let Some(context) = &self.context else {
            return Ok(Vec::new());
        };
        self.last_final_clusters()
            .iter()
            .map(|cluster| context.denormalize(&cluster.center))
            .collect()
    }

    /// Maps a normalized point back into input units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] before the context exists and
    /// [`Error::DimensionMismatch`] for a point of the wrong length.
    pub fn denormalize(&self, point: &[f64]) -> Result<Vec<f64>> {
        self.context
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("no context yet".to_string()))?
            .denormalize(point)
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &DycleeConfig {
        &self.config
    }

    /// Normalization context, once known.
    #[must_use]
    pub const fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Microcluster store.
    #[must_use]
    pub const fn store(&self) -> &MicroclusterStore {
        &self.store
    }

    /// Snapshot history.
    #[must_use]
    pub const fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Run identifier embedded in generated labels.
    #[must_use]
    pub fn label_run_id(&self) -> &str {
        self.labels.run_id()
    }

    /// Number of observations processed.
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.processed
    }

    /// Number of microclusters in a collection.
    #[must_use]
    pub fn collection_len(&self, collection: Collection) -> usize {
        self.store.len(collection)
    }

    fn normalize(&mut self, point: &[f64]) -> Result<Vec<f64>> {
        if self.context.is_none() {
            let context = Context::adaptive(point, self.config.phi)?;
            if self.config.uncdim > context.dimensions() {
                return Err(Error::InvalidParameter {
                    name: "uncdim",
                    reason: format!(
                        "{} exceeds the {} observation dimensions",
                        self.config.uncdim,
                        context.dimensions()
                    ),
                });
            }
            self.context = Some(context);
        }
        self.context
            .as_mut()
            .ok_or_else(|| Error::InvalidInput("no context yet".to_string()))?
            .normalize(point)
    }

    fn geometry(&self) -> Result<(Vec<f64>, f64)> {
        self.context
            .as_ref()
            .map(|context| (context.hyperbox_sizes().to_vec(), context.hyperbox_volume()))
            .ok_or_else(|| Error::InvalidInput("no context yet".to_string()))
    }
}

fn check_column(name: &str, len: Option<usize>, rows: usize) -> Result<()> {
    match len {
        Some(len) if len != rows => Err(Error::InvalidInput(format!(
            "{name} has {len} entries for {rows} rows"
        ))),
        _ => Ok(()),
    }
}
