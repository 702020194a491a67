//! JSON adapters.
//!
//! Datasets are read from newline-delimited records such as
//! `{"point": [0.1, 0.2], "time": 3, "label": "walking"}`; `time` and
//! `label` are optional but must be present on every record or none.
//! Labels and snapshot histories are written as JSON documents.

use crate::io::Dataset;
use crate::models::{Label, Timestamp};
use crate::storage::SnapshotStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

#[derive(Debug, Deserialize)]
struct PointRecord {
    point: Vec<f64>,
    #[serde(default, alias = "timestamp")]
    time: Option<Timestamp>,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Serialize)]
struct LabelRecord<'a> {
    row: usize,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a Label>,
}

/// Reads a dataset from newline-delimited JSON. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for malformed records, ragged points or
/// optional fields present on only some records.
pub fn read_dataset<R: BufRead>(reader: R) -> Result<Dataset> {
    let mut rows = Vec::new();
    let mut timestamps = Vec::new();
    let mut labels = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::OperationFailed {
            operation: "read_json".to_string(),
            cause: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record: PointRecord = serde_json::from_str(&line).map_err(|e| {
            Error::InvalidInput(format!("line {}: {e}", line_number + 1))
        })?;
        rows.push(record.point);
        timestamps.push(record.time);
        labels.push(record.label.as_deref().map(Label::parse));
    }

    let mut dataset = Dataset::from_rows(rows)?;
    if let Some(timestamps) = all_or_none("time", timestamps)? {
        dataset = dataset.with_timestamps(timestamps)?;
    }
    if let Some(labels) = all_or_none("label", labels)? {
        dataset = dataset.with_labels(labels)?;
    }
    Ok(dataset)
}

fn all_or_none<T>(field: &str, values: Vec<Option<T>>) -> Result<Option<Vec<T>>> {
    let present = values.iter().filter(|v| v.is_some()).count();
    if present == 0 {
        return Ok(None);
    }
    if present < values.len() {
        return Err(Error::InvalidInput(format!(
            "'{field}' is present on {present} of {} records",
            values.len()
        )));
    }
    Ok(Some(values.into_iter().flatten().collect()))
}

/// Writes labels as newline-delimited `{"row", "label"}` records.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if writing fails.
pub fn write_labels<W: Write>(mut writer: W, labels: &[Label]) -> Result<()> {
    for (row, label) in labels.iter().enumerate() {
        let record = LabelRecord {
            row,
            label: label.to_string(),
            detail: matches!(label, Label::Generated(_)).then_some(label),
        };
        serde_json::to_writer(&mut writer, &record).map_err(|e| Error::OperationFailed {
            operation: "write_json".to_string(),
            cause: e.to_string(),
        })?;
        writeln!(writer).map_err(|e| Error::OperationFailed {
            operation: "write_json".to_string(),
            cause: e.to_string(),
        })?;
    }
    writer.flush().map_err(|e| Error::OperationFailed {
        operation: "flush_json".to_string(),
        cause: e.to_string(),
    })
}

/// Writes the full snapshot history as one pretty-printed JSON document.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if serialization or writing fails.
pub fn write_snapshots<W: Write>(mut writer: W, snapshots: &SnapshotStore) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, snapshots).map_err(|e| Error::OperationFailed {
        operation: "write_snapshots".to_string(),
        cause: e.to_string(),
    })?;
    writeln!(writer)
        .and_then(|()| writer.flush())
        .map_err(|e| Error::OperationFailed {
            operation: "write_snapshots".to_string(),
            cause: e.to_string(),
        })
}
