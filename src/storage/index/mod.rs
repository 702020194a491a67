//! Connectivity search backends.
//!
//! The density stage asks "which live microclusters are connected to this
//! one?" once per traversed microcluster. Backends are rebuilt at the start
//! of every density stage over the union of active and candidate ids.
//!
//! # Available Implementations
//!
//! | Backend | Query | Semantics |
//! |---------|-------|-----------|
//! | `ExhaustiveIndex` | O(n) scan | Exact per-dimension overlap on `common_dims` dimensions |
//! | `KdTreeIndex` | kd-tree radius query | Manhattan radius `phi / 2` over all dimensions |
//!
//! The kd-tree answers a different, joint-radius question than the exact
//! per-dimension rule. It is a speed/accuracy tradeoff, not an equivalent
//! search; the two agree when microclusters either coincide or are far apart.

mod exhaustive;
mod kdtree;

pub use exhaustive::ExhaustiveIndex;
pub use kdtree::{KdTree, KdTreeIndex};

use crate::config::ConnectivityStrategy;
use crate::models::ClusterId;
use crate::storage::MicroclusterStore;

/// Exact connectivity rule between two microcluster centers.
///
/// Two centers are connected when they are closer than one hyperbox edge
/// on at least `common_dims` of the considered dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityRule {
    edge_lengths: Vec<f64>,
    common_dims: usize,
    selected_dims: Option<Vec<usize>>,
}

impl ConnectivityRule {
    /// Creates a rule counting overlap across all dimensions.
    #[must_use]
    pub fn new(edge_lengths: Vec<f64>, common_dims: usize) -> Self {
        Self {
            edge_lengths,
            common_dims,
            selected_dims: None,
        }
    }

    /// Restricts overlap counting to the given dimensions.
    #[must_use]
    pub fn with_selected_dims(mut self, dims: Vec<usize>) -> Self {
        self.selected_dims = Some(dims);
        self
    }

    /// Minimum number of overlapping dimensions.
    #[must_use]
    pub const fn common_dims(&self) -> usize {
        self.common_dims
    }

    /// Dimensions considered, if restricted.
    #[must_use]
    pub fn selected_dims(&self) -> Option<&[usize]> {
        self.selected_dims.as_deref()
    }

    /// Tests two centers for connectivity.
    #[must_use]
    pub fn is_connected(&self, a: &[f64], b: &[f64]) -> bool {
        let overlaps = |i: &usize| {
            let i = *i;
            match (a.get(i), b.get(i), self.edge_lengths.get(i)) {
                (Some(x), Some(y), Some(edge)) => (x - y).abs() < *edge,
                _ => false,
            }
        };
        let overlapping = match &self.selected_dims {
            Some(dims) => dims.iter().filter(|&i| overlaps(i)).count(),
            None => (0..self.edge_lengths.len()).filter(overlaps).count(),
        };
        overlapping >= self.common_dims
    }
}

/// Search backend answering connectivity queries during a density stage.
pub trait ConnectivityIndex: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Rebuilds the backend over `members`.
    fn rebuild(
        &mut self,
        store: &MicroclusterStore,
        members: &[ClusterId],
        rule: &ConnectivityRule,
    );

    /// Members connected to `id` (including `id` itself), in member order.
    fn neighbors(&self, store: &MicroclusterStore, id: ClusterId) -> Vec<ClusterId>;
}

/// Creates the backend selected by `strategy`.
#[must_use]
pub fn build_index(strategy: ConnectivityStrategy, phi: f64) -> Box<dyn ConnectivityIndex> {
    match strategy {
        ConnectivityStrategy::Exhaustive => Box::new(ExhaustiveIndex::new()),
        ConnectivityStrategy::Indexed => Box::new(KdTreeIndex::new(phi / 2.0)),
    }
}
