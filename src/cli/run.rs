//! Run CLI command.

use crate::config::DycleeConfig;
use crate::io;
use crate::observability::MetricsHandle;
use crate::services::DycleeEngine;
use crate::storage::Collection;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Clusters a dataset file and writes the requested outputs.
#[derive(Debug, Clone)]
pub struct RunCommand {
    input: PathBuf,
    output: Option<PathBuf>,
    snapshots: Option<PathBuf>,
    metrics_out: Option<PathBuf>,
}

/// Outcome of a [`RunCommand`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Rows processed.
    pub rows: usize,
    /// Feature dimensions.
    pub dimensions: usize,
    /// Final clusters reported by the last density stage.
    pub final_clusters: usize,
    /// Final cluster centers in input units.
    pub centers: Vec<Vec<f64>>,
    /// Active microclusters at the end of the run.
    pub active: usize,
    /// Candidate microclusters at the end of the run.
    pub candidate: usize,
    /// Archived microclusters at the end of the run.
    pub archived: usize,
    /// Snapshots retained.
    pub snapshots: usize,
}

impl RunSummary {
    /// One-line human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} rows x {} dims: {} final clusters, microclusters {} active / {} candidate / \
             {} archived, {} snapshots",
            self.rows,
            self.dimensions,
            self.final_clusters,
            self.active,
            self.candidate,
            self.archived,
            self.snapshots
        )
    }
}

impl RunCommand {
    /// Creates a run over `input`.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            snapshots: None,
            metrics_out: None,
        }
    }

    /// Writes per-row labels to `path` (CSV or NDJSON by extension).
    #[must_use]
    pub fn with_output(mut self, path: Option<PathBuf>) -> Self {
        self.output = path;
        self
    }

    /// Writes the snapshot history to `path` as JSON.
    #[must_use]
    pub fn with_snapshots(mut self, path: Option<PathBuf>) -> Self {
        self.snapshots = path;
        self
    }

    /// Writes rendered Prometheus metrics to `path`.
    #[must_use]
    pub fn with_metrics_out(mut self, path: Option<PathBuf>) -> Self {
        self.metrics_out = path;
        self
    }

    /// True if the run needs a metrics recorder.
    #[must_use]
    pub const fn wants_metrics(&self) -> bool {
        self.metrics_out.is_some()
    }

    /// Executes the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the input cannot
    /// be read, clustering fails or an output cannot be written. Asking for
    /// `metrics_out` without an installed recorder is
    /// [`Error::OperationFailed`].
    #[instrument(
        name = "dyclee.cli.run",
        skip_all,
        fields(component = "cli", operation = "run", input = %self.input.display())
    )]
    pub fn execute(
        &self,
        config: DycleeConfig,
        metrics: Option<&MetricsHandle>,
    ) -> Result<RunSummary> {
        let metrics_target = match (&self.metrics_out, metrics) {
            (Some(path), Some(handle)) => Some((path, handle)),
            (Some(_), None) => {
                return Err(Error::OperationFailed {
                    operation: "write_metrics".to_string(),
                    cause: "metrics recorder is not installed".to_string(),
                });
            },
            (None, _) => None,
        };

        let dataset = io::read_dataset(&self.input)?;
        let mut engine = DycleeEngine::new(config)?;
        let labels = engine.run_dataset(
            &dataset.rows,
            dataset.timestamps.as_deref(),
            dataset.labels.as_deref(),
        )?;

        if let Some(path) = &self.output {
            io::write_labels(path, &labels)?;
        }
        if let Some(path) = &self.snapshots {
            io::write_snapshots(path, engine.snapshots())?;
        }
        if let Some((path, handle)) = metrics_target {
            write_metrics(path, handle)?;
        }

        let centers = if engine.processed() == 0 {
            Vec::new()
        } else {
            engine.final_cluster_centers()?
        };

        Ok(RunSummary {
            rows: dataset.len(),
            dimensions: dataset.dimensions(),
            final_clusters: engine.last_final_clusters().len(),
            centers,
            active: engine.collection_len(Collection::Active),
            candidate: engine.collection_len(Collection::Candidate),
            archived: engine.collection_len(Collection::Archive),
            snapshots: engine.snapshots().len(),
        })
    }
}

fn write_metrics(path: &Path, handle: &MetricsHandle) -> Result<()> {
    std::fs::write(path, handle.render()).map_err(|e| Error::OperationFailed {
        operation: "write_metrics".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn two_blobs(dir: &Path) -> PathBuf {
        let path = dir.join("points.csv");
        let mut csv = String::from("time,x,y\n");
        for t in 0..10 {
            let (x, y) = if t % 2 == 0 { (1.0, 1.0) } else { (9.0, 9.0) };
            csv.push_str(&format!("{t},{x},{y}\n"));
        }
        std::fs::write(&path, csv).expect("write input");
        path
    }

    fn config() -> DycleeConfig {
        DycleeConfig::new(0.1)
            .with_context(vec![0.0, 0.0], vec![10.0, 10.0])
            .with_label_run_id("cli")
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = TempDir::new().expect("tempdir");
        let input = two_blobs(dir.path());
        let labels_path = dir.path().join("labels.csv");
        let snapshots_path = dir.path().join("snapshots.json");

        let summary = RunCommand::new(&input)
            .with_output(Some(labels_path.clone()))
            .with_snapshots(Some(snapshots_path.clone()))
            .execute(config(), None)
            .expect("run");

        assert_eq!(summary.rows, 10);
        assert_eq!(summary.dimensions, 2);
        assert_eq!(summary.final_clusters, 2);
        assert_eq!(summary.centers.len(), 2);
        assert!(summary.summary().contains("2 final clusters"));

        let labels = std::fs::read_to_string(&labels_path).expect("labels");
        assert_eq!(labels.lines().count(), 11);
        let snapshots: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&snapshots_path).expect("snapshots"))
                .expect("json");
        assert!(snapshots["orders"].is_object());
    }

    #[test]
    fn test_metrics_out_requires_recorder() {
        let dir = TempDir::new().expect("tempdir");
        let input = two_blobs(dir.path());
        let command =
            RunCommand::new(&input).with_metrics_out(Some(dir.path().join("metrics.prom")));

        assert!(command.wants_metrics());
        let err = command.execute(config(), None).expect_err("no recorder");
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().expect("tempdir");
        let err = RunCommand::new(dir.path().join("absent.csv"))
            .execute(config(), None)
            .expect_err("missing input");
        assert!(matches!(err, Error::OperationFailed { .. }));
    }
}
