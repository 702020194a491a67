//! Format adapters for dataset input and result output.

pub mod csv;
pub mod json;

use crate::io::Dataset;
use crate::models::Label;
use crate::{Error, Result};
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// CSV with a header row.
    Csv,
    /// Newline-delimited JSON records.
    Json,
}

impl Format {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// Detects format from file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not recognized.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some(ext) => ext.parse(),
            None => Err(Error::InvalidInput(
                "Cannot determine format: file has no extension".to_string(),
            )),
        }
    }

    /// Reads a dataset in this format.
    ///
    /// # Errors
    ///
    /// Propagates parse failures from the format adapter.
    pub fn read_dataset<R: BufRead>(self, reader: R) -> Result<Dataset> {
        match self {
            Self::Csv => csv::read_dataset(reader),
            Self::Json => json::read_dataset(reader),
        }
    }

    /// Writes per-row labels in this format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if writing fails.
    pub fn write_labels<W: Write>(self, writer: W, labels: &[Label]) -> Result<()> {
        match self {
            Self::Csv => csv::write_labels(writer, labels),
            Self::Json => json::write_labels(writer, labels),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" | "ndjson" | "jsonl" => Ok(Self::Json),
            other => Err(Error::InvalidInput(format!("Unsupported format: {other}"))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}
