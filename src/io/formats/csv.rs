//! CSV dataset reader and label writer.
//!
//! Columns named `time` / `timestamp` / `t` hold timestamps and columns
//! named `label` / `class` / `target` hold ground-truth labels; every other
//! column is a numeric feature.

use crate::io::Dataset;
use crate::models::{Label, Timestamp};
use crate::{Error, Result};
use std::io::{Read, Write};

/// Maps CSV column indices to dataset fields.
#[derive(Debug, Default)]
struct ColumnMap {
    time: Option<usize>,
    label: Option<usize>,
    features: Vec<(usize, String)>,
}

impl ColumnMap {
    /// Creates a column map from CSV headers.
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let mut map = Self::default();

        for (i, header) in headers.iter().enumerate() {
            match header.to_lowercase().as_str() {
                "time" | "timestamp" | "t" => map.time = Some(i),
                "label" | "class" | "target" => map.label = Some(i),
                _ => map.features.push((i, header.to_string())),
            }
        }

        if map.features.is_empty() {
            return Err(Error::InvalidInput(
                "CSV must have at least one feature column".to_string(),
            ));
        }

        Ok(map)
    }
}

/// Reads a dataset from CSV with a header row.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the CSV cannot be parsed and
/// [`Error::InvalidInput`] for missing feature columns or unparseable
/// values.
pub fn read_dataset<R: Read>(reader: R) -> Result<Dataset> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::OperationFailed {
            operation: "read_csv_headers".to_string(),
            cause: e.to_string(),
        })?
        .clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut rows = Vec::new();
    let mut timestamps = columns.time.map(|_| Vec::new());
    let mut labels = columns.label.map(|_| Vec::new());

    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| Error::OperationFailed {
            operation: "read_csv_record".to_string(),
            cause: e.to_string(),
        })?;
        let field = |i: usize| record.get(i).unwrap_or_default();

        let row = columns
            .features
            .iter()
            .map(|(i, name)| {
                field(*i).parse::<f64>().map_err(|e| {
                    Error::InvalidInput(format!("row {line}, column '{name}': {e}"))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);

        if let (Some(i), Some(ts)) = (columns.time, timestamps.as_mut()) {
            let t = field(i).parse::<Timestamp>().map_err(|e| {
                Error::InvalidInput(format!("row {line}, time column: {e}"))
            })?;
            ts.push(t);
        }
        if let (Some(i), Some(ls)) = (columns.label, labels.as_mut()) {
            ls.push(Label::parse(field(i)));
        }
    }

    Ok(Dataset {
        feature_names: columns.features.into_iter().map(|(_, name)| name).collect(),
        rows,
        timestamps,
        labels,
    })
}

/// Writes one `row,label` line per assigned label.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if writing fails.
pub fn write_labels<W: Write>(writer: W, labels: &[Label]) -> Result<()> {
    let write_failed = |e: csv::Error| Error::OperationFailed {
        operation: "write_csv".to_string(),
        cause: e.to_string(),
    };
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

    csv_writer.write_record(["row", "label"]).map_err(write_failed)?;
    for (row, label) in labels.iter().enumerate() {
        csv_writer
            .write_record([row.to_string(), label.to_string()])
            .map_err(write_failed)?;
    }
    csv_writer.flush().map_err(|e| Error::OperationFailed {
        operation: "flush_csv".to_string(),
        cause: e.to_string(),
    })
}
