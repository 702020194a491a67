//! In-memory datasets.

use crate::models::{Label, Timestamp};
use crate::{Error, Result};

/// Observations with optional timestamps and ground-truth labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Feature column names, in row order.
    pub feature_names: Vec<String>,
    /// Observation rows.
    pub rows: Vec<Vec<f64>>,
    /// Per-row timestamps; row indices are used when absent.
    pub timestamps: Option<Vec<Timestamp>>,
    /// Per-row labels; all `Unclassed` when absent.
    pub labels: Option<Vec<Label>>,
}

impl Dataset {
    /// Creates a dataset from rows, naming features `x0`, `x1`, ...
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for ragged rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().position(|r| r.len() != width) {
            return Err(Error::InvalidInput(format!(
                "row {row} has {} features, expected {width}",
                rows[row].len()
            )));
        }
        Ok(Self {
            feature_names: (0..width).map(|i| format!("x{i}")).collect(),
            rows,
            timestamps: None,
            labels: None,
        })
    }

    /// Attaches per-row timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the length differs from the row count.
    pub fn with_timestamps(mut self, timestamps: Vec<Timestamp>) -> Result<Self> {
        self.check_len("timestamps", timestamps.len())?;
        self.timestamps = Some(timestamps);
        Ok(self)
    }

    /// Attaches per-row labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the length differs from the row count.
    pub fn with_labels(mut self, labels: Vec<Label>) -> Result<Self> {
        self.check_len("labels", labels.len())?;
        self.labels = Some(labels);
        Ok(self)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.feature_names.len()
    }

    fn check_len(&self, name: &str, len: usize) -> Result<()> {
        if len == self.rows.len() {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "{name} has {len} entries for {} rows",
                self.rows.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let dataset = Dataset::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).expect("dataset");
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dimensions(), 2);
        assert_eq!(dataset.feature_names, vec!["x0", "x1"]);
    }

    #[test]
    fn test_ragged_rows() {
        assert!(Dataset::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).is_err());
    }

    #[test]
    fn test_column_lengths() {
        let dataset = Dataset::from_rows(vec![vec![1.0]; 3]).expect("dataset");
        assert!(dataset.clone().with_timestamps(vec![0, 1]).is_err());
        let dataset = dataset
            .with_labels(vec![Label::Unclassed, Label::external("a"), Label::Unclassed])
            .expect("labels");
        assert_eq!(dataset.labels.as_ref().map(Vec::len), Some(3));
    }
}
