//! Brute-force connectivity scan.

use super::{ConnectivityIndex, ConnectivityRule};
use crate::models::ClusterId;
use crate::storage::MicroclusterStore;

/// Scans every live microcluster with the exact [`ConnectivityRule`].
///
/// O(n) per query, O(n²) per density stage.
#[derive(Debug, Clone, Default)]
pub struct ExhaustiveIndex {
    members: Vec<ClusterId>,
    rule: Option<ConnectivityRule>,
}

impl ExhaustiveIndex {
    /// Creates an empty scan backend.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            members: Vec::new(),
            rule: None,
        }
    }
}

impl ConnectivityIndex for ExhaustiveIndex {
    fn name(&self) -> &'static str {
        "exhaustive"
    }

    fn rebuild(
        &mut self,
        _store: &MicroclusterStore,
        members: &[ClusterId],
        rule: &ConnectivityRule,
    ) {
        self.members = members.to_vec();
        self.rule = Some(rule.clone());
    }

    fn neighbors(&self, store: &MicroclusterStore, id: ClusterId) -> Vec<ClusterId> {
        let (Some(rule), Some(query)) = (&self.rule, store.get(id)) else {
            return Vec::new();
        };
        self.members
            .iter()
            .copied()
            .filter(|candidate| {
                store
                    .get(*candidate)
                    .is_some_and(|mc| rule.is_connected(mc.center(), query.center()))
            })
            .collect()
    }
}
