//! Storage for microclusters, connectivity indexes and snapshots.
//!
//! # Layout
//!
//! | Component | Holds |
//! |-----------|-------|
//! | `MicroclusterStore` | Arena of microclusters plus active / candidate / archive id lists |
//! | `index` | Connectivity search backends rebuilt once per density stage |
//! | `SnapshotStore` | Pyramidal history of density stage results |

pub mod index;
mod microclusters;
mod snapshot;

pub use index::{ConnectivityIndex, ConnectivityRule, ExhaustiveIndex, KdTreeIndex, build_index};
pub use microclusters::{Collection, MicroclusterStore, Restructure};
pub use snapshot::{Snapshot, SnapshotStore};
