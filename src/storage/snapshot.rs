//! Pyramidal snapshot history.
//!
//! Snapshots taken at time `t` are kept at order `k` when `alpha^k` divides
//! `t` but `alpha^(k+1)` does not, and each order keeps at most
//! `alpha^L + 1` timestamps. Recent history is fine-grained; older history
//! survives only at coarse orders.

use crate::models::{FinalCluster, MicroCluster, Timestamp};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Classification state recorded at the end of a density stage.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Density stage timestamp.
    pub timestamp: Timestamp,
    /// Final clusters emitted by the stage.
    pub final_clusters: Vec<FinalCluster>,
    /// Deep copies of every classified microcluster.
    pub microclusters: Vec<MicroCluster>,
}

/// Bounded multiscale store of [`Snapshot`]s.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStore {
    alpha: u64,
    levels: u32,
    max_per_order: usize,
    orders: BTreeMap<u32, BTreeMap<Timestamp, Snapshot>>,
}

impl SnapshotStore {
    /// Creates an empty store with base `alpha` and depth `levels`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `alpha < 2`, `levels == 0`
    /// or `alpha^levels + 1` overflows.
    pub fn new(alpha: u64, levels: u32) -> Result<Self> {
        if alpha < 2 {
            return Err(Error::InvalidParameter {
                name: "snapshot_alpha",
                reason: format!("must be at least 2, got {alpha}"),
            });
        }
        if levels == 0 {
            return Err(Error::InvalidParameter {
                name: "snapshot_levels",
                reason: "must be at least 1".to_string(),
            });
        }
        let max_per_order = alpha
            .checked_pow(levels)
            .and_then(|cap| cap.checked_add(1))
            .and_then(|cap| usize::try_from(cap).ok())
            .ok_or_else(|| Error::InvalidParameter {
                name: "snapshot_levels",
                reason: format!("{alpha}^{levels} snapshots per order overflows"),
            })?;

        Ok(Self {
            alpha,
            levels,
            max_per_order,
            orders: BTreeMap::new(),
        })
    }

    /// Records a snapshot taken at `snapshot.timestamp`.
    ///
    /// `t == 0` is divisible at every order and is never retained.
    pub fn record(&mut self, snapshot: &Snapshot) {
        let t = snapshot.timestamp;
        for order in 0..=self.max_order(t) {
            if !self.divides(order, t) {
                continue;
            }
            let stored = self.orders.entry(order).or_default();
            stored.insert(t, snapshot.clone());
            if stored.len() > self.max_per_order {
                stored.pop_first();
            }
        }

        // Entries divisible at the next order are already kept there.
        let alpha = self.alpha;
        for (order, stored) in &mut self.orders {
            stored.retain(|ts, _| !divides(alpha, order + 1, *ts));
        }
    }

    /// Snapshot stored at `(order, timestamp)`.
    #[must_use]
    pub fn get(&self, order: u32, timestamp: Timestamp) -> Option<&Snapshot> {
        self.orders.get(&order)?.get(&timestamp)
    }

    /// Orders that currently hold at least one snapshot.
    #[must_use]
    pub fn orders(&self) -> Vec<u32> {
        self.orders
            .iter()
            .filter(|(_, stored)| !stored.is_empty())
            .map(|(order, _)| *order)
            .collect()
    }

    /// Timestamps retained at `order`, oldest first.
    #[must_use]
    pub fn timestamps(&self, order: u32) -> Vec<Timestamp> {
        self.orders
            .get(&order)
            .map(|stored| stored.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Most recent snapshot across all orders.
    #[must_use]
    pub fn latest(&self) -> Option<&Snapshot> {
        self.orders
            .values()
            .filter_map(|stored| stored.last_key_value())
            .max_by_key(|(t, _)| **t)
            .map(|(_, snapshot)| snapshot)
    }

    /// Total number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.values().map(BTreeMap::len).sum()
    }

    /// True if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum retained snapshots per order (`alpha^L + 1`).
    #[must_use]
    pub const fn max_per_order(&self) -> usize {
        self.max_per_order
    }

    /// Depth parameter `L`.
    #[must_use]
    pub const fn levels(&self) -> u32 {
        self.levels
    }

    /// `floor(log_alpha(t))`, or 0 for `t == 0`.
    fn max_order(&self, t: Timestamp) -> u32 {
        let mut order = 0;
        let mut power = self.alpha;
        while power <= t {
            order += 1;
            match power.checked_mul(self.alpha) {
                Some(next) => power = next,
                None => break,
            }
        }
        order
    }

    fn divides(&self, order: u32, t: Timestamp) -> bool {
        divides(self.alpha, order, t)
    }
}

/// True if `alpha^order` divides `t`; an overflowing power divides only 0.
fn divides(alpha: u64, order: u32, t: Timestamp) -> bool {
    alpha
        .checked_pow(order)
        .map_or(t == 0, |power| t % power == 0)
}
