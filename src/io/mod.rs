//! Dataset input and result output.
//!
//! | Format | Dataset input | Label output | Snapshot output |
//! |--------|---------------|--------------|-----------------|
//! | CSV | ✓ | ✓ | - |
//! | JSON | ✓ (NDJSON) | ✓ (NDJSON) | ✓ |
//!
//! # Examples
//!
//! ```rust,ignore
//! use dyclee::io;
//! use std::path::Path;
//!
//! let dataset = io::read_dataset(Path::new("points.csv"))?;
//! let labels = engine.run_dataset(
//!     &dataset.rows,
//!     dataset.timestamps.as_deref(),
//!     dataset.labels.as_deref(),
//! )?;
//! io::write_labels(Path::new("labels.csv"), &labels)?;
//! ```

mod dataset;
pub mod formats;

pub use dataset::Dataset;
pub use formats::Format;

use crate::models::Label;
use crate::storage::SnapshotStore;
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Reads a dataset, choosing the format from the file extension.
///
/// # Errors
///
/// Returns an error if the extension is unsupported, the file cannot be
/// opened or its contents do not parse.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let format = Format::from_path(path)?;
    let file = File::open(path).map_err(|e| open_failed("open_dataset", path, &e))?;
    let dataset = format.read_dataset(BufReader::new(file))?;
    tracing::debug!(
        path = %path.display(),
        format = %format,
        rows = dataset.len(),
        dimensions = dataset.dimensions(),
        "Read dataset"
    );
    Ok(dataset)
}

/// Writes labels, choosing the format from the file extension.
///
/// # Errors
///
/// Returns an error if the extension is unsupported or writing fails.
pub fn write_labels(path: &Path, labels: &[Label]) -> Result<()> {
    let format = Format::from_path(path)?;
    let file = File::create(path).map_err(|e| open_failed("create_labels", path, &e))?;
    format.write_labels(BufWriter::new(file), labels)
}

/// Writes the snapshot history as JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be created or writing fails.
pub fn write_snapshots(path: &Path, snapshots: &SnapshotStore) -> Result<()> {
    let file = File::create(path).map_err(|e| open_failed("create_snapshots", path, &e))?;
    formats::json::write_snapshots(BufWriter::new(file), snapshots)
}

fn open_failed(operation: &str, path: &Path, e: &std::io::Error) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: format!("{}: {e}", path.display()),
    }
}
