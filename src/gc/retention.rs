//! Retention of low-density microclusters.
//!
//! After classification, every low-density microcluster is either kept in
//! the candidate collection, moved to long-term memory, or discarded.
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | `Dk > fraction * mean` and `Dk > fraction * median` | Keep |
//! | `now - tlk <= recency_window` | Keep |
//! | was ever dense and long-term memory is enabled | Archive |
//! | otherwise | Discard |

use crate::models::{ClusterId, MicroCluster, Timestamp};
use crate::observability::{duration_to_millis, usize_to_f64};
use crate::storage::MicroclusterStore;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Time units since the last update during which a microcluster is kept.
pub const DEFAULT_RECENCY_WINDOW: u64 = 10;

/// Fraction of the mean and median density a microcluster must exceed.
pub const DEFAULT_DENSITY_FRACTION: f64 = 0.25;

/// Retention policy configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionConfig {
    /// Recency window in time units.
    pub recency_window: u64,
    /// Density fraction threshold.
    pub density_fraction: f64,
    /// Archive once-dense microclusters instead of discarding them.
    pub long_term_memory: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            recency_window: DEFAULT_RECENCY_WINDOW,
            density_fraction: DEFAULT_DENSITY_FRACTION,
            long_term_memory: false,
        }
    }
}

impl RetentionConfig {
    /// Creates a config with default thresholds.
    #[must_use]
    pub fn new(long_term_memory: bool) -> Self {
        Self {
            long_term_memory,
            ..Self::default()
        }
    }

    /// Sets the recency window.
    #[must_use]
    pub const fn with_recency_window(mut self, window: u64) -> Self {
        self.recency_window = window;
        self
    }

    /// Sets the density fraction.
    #[must_use]
    pub const fn with_density_fraction(mut self, fraction: f64) -> Self {
        self.density_fraction = fraction;
        self
    }
}

/// Fate of a single low-density microcluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetentionOutcome {
    /// Stays in the candidate collection.
    Keep,
    /// Moves to long-term memory.
    Archive,
    /// Removed permanently.
    Discard,
}

impl RetentionOutcome {
    /// Returns the outcome as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Archive => "archive",
            Self::Discard => "discard",
        }
    }
}

impl fmt::Display for RetentionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionResult {
    /// Ids that stay in the candidate collection, in input order.
    pub kept: Vec<ClusterId>,
    /// Ids moved to long-term memory.
    pub archived: Vec<ClusterId>,
    /// Ids removed permanently.
    pub discarded: Vec<ClusterId>,
    /// Duration of the pass in milliseconds.
    pub duration_ms: u64,
}

impl RetentionResult {
    /// Number of microclusters examined.
    #[must_use]
    pub fn checked(&self) -> usize {
        self.kept.len() + self.archived.len() + self.discarded.len()
    }

    /// Returns a human-readable summary of the pass.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.archived.is_empty() && self.discarded.is_empty() {
            format!(
                "Kept all {} low-density microclusters ({}ms)",
                self.kept.len(),
                self.duration_ms
            )
        } else {
            format!(
                "Kept {}, archived {}, discarded {} of {} low-density microclusters ({}ms)",
                self.kept.len(),
                self.archived.len(),
                self.discarded.len(),
                self.checked(),
                self.duration_ms
            )
        }
    }
}

/// Decides what happens to low-density microclusters after a density stage.
///
/// The policy runs on every stage, including engines without a forgetting
/// function, so stale low-density microclusters never pile up.
#[derive(Debug, Clone, Default)]
pub struct RetentionPolicy {
    config: RetentionConfig,
}

impl RetentionPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Evaluates a single microcluster.
    #[must_use]
    pub fn evaluate(
        &self,
        cluster: &MicroCluster,
        now: Timestamp,
        mean: f64,
        median: f64,
    ) -> RetentionOutcome {
        let fraction = self.config.density_fraction;
        let dense_enough =
            cluster.density() > fraction * mean && cluster.density() > fraction * median;
        let recent = now.saturating_sub(cluster.last_update()) <= self.config.recency_window;

        if dense_enough || recent {
            RetentionOutcome::Keep
        } else if cluster.was_dense() && self.config.long_term_memory {
            RetentionOutcome::Archive
        } else {
            RetentionOutcome::Discard
        }
    }

    /// Applies the policy to the given low-density ids.
    ///
    /// Ids missing from the store are ignored.
    #[instrument(
        name = "dyclee.gc.retention",
        skip(self, store, low_density),
        fields(
            component = "gc",
            operation = "retention",
            low_density = low_density.len(),
            long_term_memory = self.config.long_term_memory
        )
    )]
    pub fn apply(
        &self,
        store: &MicroclusterStore,
        low_density: &[ClusterId],
        now: Timestamp,
        mean: f64,
        median: f64,
    ) -> RetentionResult {
        let start = Instant::now();
        let mut result = RetentionResult::default();

        for id in low_density {
            let Some(cluster) = store.get(*id) else {
                continue;
            };
            let outcome = self.evaluate(cluster, now, mean, median);
            debug!(
                cluster = %id,
                density = cluster.density(),
                last_update = cluster.last_update(),
                outcome = outcome.as_str(),
                "Retention decision"
            );
            match outcome {
                RetentionOutcome::Keep => result.kept.push(*id),
                RetentionOutcome::Archive => result.archived.push(*id),
                RetentionOutcome::Discard => result.discarded.push(*id),
            }
        }

        result.duration_ms = duration_to_millis(start.elapsed());

        for (outcome, count) in [
            (RetentionOutcome::Keep, result.kept.len()),
            (RetentionOutcome::Archive, result.archived.len()),
            (RetentionOutcome::Discard, result.discarded.len()),
        ] {
            metrics::counter!("dyclee_retention_total", "outcome" => outcome.as_str())
                .increment(u64::try_from(count).unwrap_or(u64::MAX));
        }
        metrics::gauge!("dyclee_retention_discarded").set(usize_to_f64(result.discarded.len()));

        if !result.archived.is_empty() || !result.discarded.is_empty() {
            info!(
                kept = result.kept.len(),
                archived = result.archived.len(),
                discarded = result.discarded.len(),
                "Retention pass completed"
            );
        }

        result
    }
}
