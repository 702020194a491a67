//! # `DyClee`
//!
//! Dynamic density-based clustering for evolving data streams.
//!
//! Observations are absorbed one at a time into hyperbox-shaped microclusters
//! (the distance stage). Every `t_global` observations the density stage
//! classifies microclusters by density, merges connected dense regions into
//! final clusters, forgets or archives stale microclusters and records a
//! pyramidal snapshot of the result.
//!
//! ## Features
//!
//! - Fixed or adaptive per-dimension normalization
//! - Active / candidate / long-term-memory microcluster collections
//! - Exhaustive or kd-tree connectivity search
//! - Default propagation or label-voting for semi-supervised streams
//! - Bounded multiscale snapshot history
//!
//! ## Example
//!
//! ```rust
//! use dyclee::{DycleeConfig, DycleeEngine, Label};
//!
//! let config = DycleeConfig::new(0.1)
//!     .with_context(vec![0.0, 0.0], vec![1.0, 1.0]);
//! let mut engine = DycleeEngine::new(config)?;
//!
//! for t in 0..3 {
//!     engine.process(&[0.5, 0.5], t, Label::Unclassed)?;
//! }
//! assert_eq!(engine.last_final_clusters().len(), 1);
//! # Ok::<(), dyclee::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod gc;
pub mod io;
pub mod metric;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::{
    ConnectivityStrategy, DensityAnalysis, DycleeConfig, FeatureFlags, ForgetMethod,
};
pub use models::{
    ClusterId, Context, DensityType, FinalCluster, Label, MicroCluster, Timestamp,
};
pub use services::{DensityReport, DycleeEngine};
pub use storage::{MicroclusterStore, Snapshot, SnapshotStore};

/// Error type for dyclee operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Ragged rows, mismatched column lengths, non-finite coordinates |
/// | `InvalidParameter` | `phi` outside `[0, 1]`, `t_global == 0`, `uncdim > d`, bad snapshot factors |
/// | `DimensionMismatch` | A point does not have the context dimensionality |
/// | `DegenerateRange` | A fixed context has `max <= min` on some dimension |
/// | `OperationFailed` | File, CSV, TOML or JSON I/O fails |
/// | `NotImplemented` | Windowed or continuous entry points, local density analysis |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - Dataset rows have differing lengths
    /// - Timestamp or label columns do not match the number of rows
    /// - A coordinate is NaN or infinite
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration parameter violates its precondition.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A point's dimensionality differs from the context.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Context dimensionality.
        expected: usize,
        /// Dimensionality of the offending point.
        actual: usize,
    },

    /// A fixed context has a zero-width (or inverted) dimension.
    ///
    /// Normalizing against such a range would divide by zero.
    #[error("degenerate context range on dimension {dimension}")]
    DegenerateRange {
        /// Index of the offending dimension.
        dimension: usize,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur
    /// - CSV, TOML or JSON (de)serialization fails
    /// - Observability is initialized twice
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not implemented.
    ///
    /// Raised when:
    /// - The windowed (curve-fitting) dataset entry point is called
    /// - The continuous-stream entry point is called
    /// - Local density analysis is configured
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// Result type alias for dyclee operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("ragged row".to_string());
        assert_eq!(err.to_string(), "invalid input: ragged row");

        let err = Error::OperationFailed {
            operation: "read_csv".to_string(),
            cause: "missing file".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'read_csv' failed: missing file");

        let err = Error::InvalidParameter {
            name: "phi",
            reason: "must lie in [0, 1]".to_string(),
        };
        assert_eq!(err.to_string(), "invalid parameter 'phi': must lie in [0, 1]");

        let err = Error::DegenerateRange { dimension: 2 };
        assert_eq!(err.to_string(), "degenerate context range on dimension 2");
    }
}
