//! Arena of microclusters with active, candidate and archive collections.
//!
//! Microclusters live in one arena keyed by [`ClusterId`]; collections hold
//! ids only, so traversal state in the density stage never aliases owned
//! values.

use crate::models::{ClusterId, MicroCluster};
use std::collections::HashMap;
use std::fmt;

/// Logical collection a microcluster belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Dense and semi-dense microclusters.
    Active,
    /// New or low-density microclusters.
    Candidate,
    /// Long-term memory of once-dense microclusters.
    Archive,
}

impl Collection {
    /// Returns the collection as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Candidate => "candidate",
            Self::Archive => "archive",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Owner of every microcluster an engine creates.
#[derive(Debug, Default)]
pub struct MicroclusterStore {
    clusters: HashMap<ClusterId, MicroCluster>,
    active: Vec<ClusterId>,
    candidate: Vec<ClusterId>,
    archive: Vec<ClusterId>,
    next_id: u64,
}

impl MicroclusterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a microcluster to a collection and returns its id.
    pub fn insert(&mut self, cluster: MicroCluster, collection: Collection) -> ClusterId {
        let id = ClusterId::new(self.next_id);
        self.next_id += 1;
        self.clusters.insert(id, cluster);
        self.ids_mut(collection).push(id);
        id
    }

    /// Looks up a microcluster.
    #[must_use]
    pub fn get(&self, id: ClusterId) -> Option<&MicroCluster> {
        self.clusters.get(&id)
    }

    /// Looks up a microcluster mutably.
    pub fn get_mut(&mut self, id: ClusterId) -> Option<&mut MicroCluster> {
        self.clusters.get_mut(&id)
    }

    /// Ids in a collection, in insertion order.
    #[must_use]
    pub fn ids(&self, collection: Collection) -> &[ClusterId] {
        match collection {
            Collection::Active => &self.active,
            Collection::Candidate => &self.candidate,
            Collection::Archive => &self.archive,
        }
    }

    /// Active ids followed by candidate ids.
    #[must_use]
    pub fn live_ids(&self) -> Vec<ClusterId> {
        self.active.iter().chain(&self.candidate).copied().collect()
    }

    /// Number of microclusters in a collection.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.ids(collection).len()
    }

    /// Total number of stored microclusters.
    #[must_use]
    pub fn total(&self) -> usize {
        self.clusters.len()
    }

    /// True if no microcluster exists in any collection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Decays every active and candidate microcluster to `timestamp`.
    pub fn decay_live(&mut self, timestamp: crate::Timestamp, volume: f64) {
        for id in self.active.iter().chain(&self.candidate) {
            if let Some(mc) = self.clusters.get_mut(id) {
                mc.update_cluster(timestamp);
                mc.update_density(volume);
            }
        }
    }

    /// Replaces the live collections after a density stage.
    ///
    /// `archived` ids are appended to the archive; `discarded` ids are
    /// dropped from the arena for good.
    pub fn restructure(&mut self, plan: Restructure) {
        for id in &plan.discarded {
            self.clusters.remove(id);
        }
        self.active = plan.active;
        self.candidate = plan.candidate;
        self.archive.extend(plan.archived);
    }

    fn ids_mut(&mut self, collection: Collection) -> &mut Vec<ClusterId> {
        match collection {
            Collection::Active => &mut self.active,
            Collection::Candidate => &mut self.candidate,
            Collection::Archive => &mut self.archive,
        }
    }
}

/// New collection membership computed by the density stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Restructure {
    /// New active collection.
    pub active: Vec<ClusterId>,
    /// New candidate collection.
    pub candidate: Vec<ClusterId>,
    /// Ids moved into long-term memory.
    pub archived: Vec<ClusterId>,
    /// Ids removed permanently.
    pub discarded: Vec<ClusterId>,
}
