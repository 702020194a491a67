//! Kd-tree connectivity backend (Manhattan radius queries).

use super::{ConnectivityIndex, ConnectivityRule};
use crate::metric::manhattan_distance;
use crate::models::ClusterId;
use crate::storage::MicroclusterStore;

#[derive(Debug, Clone)]
struct Node {
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Static kd-tree over labelled points.
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    points: Vec<(ClusterId, Vec<f64>)>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl KdTree {
    /// Builds a tree by median splits, cycling through axes.
    #[must_use]
    pub fn build(points: Vec<(ClusterId, Vec<f64>)>) -> Self {
        let mut tree = Self {
            points,
            nodes: Vec::new(),
            root: None,
        };
        let mut order: Vec<usize> = (0..tree.points.len()).collect();
        tree.root = tree.build_node(&mut order, 0);
        tree
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the tree indexes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Ids of all points within Manhattan distance `radius` of `query`,
    /// in build order.
    #[must_use]
    pub fn radius_query(&self, query: &[f64], radius: f64) -> Vec<ClusterId> {
        let mut hits = Vec::new();
        let mut stack: Vec<usize> = self.root.into_iter().collect();

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            let point = &self.points[node.point].1;
            if manhattan_distance(point, query) <= radius {
                hits.push(node.point);
            }

            let split = point.get(node.axis).copied().unwrap_or_default();
            let q = query.get(node.axis).copied().unwrap_or_default();
            if let Some(left) = node.left {
                if q - radius <= split {
                    stack.push(left);
                }
            }
            if let Some(right) = node.right {
                if q + radius >= split {
                    stack.push(right);
                }
            }
        }

        hits.sort_unstable();
        hits.into_iter().map(|i| self.points[i].0).collect()
    }

    fn build_node(&mut self, order: &mut [usize], depth: usize) -> Option<usize> {
        if order.is_empty() {
            return None;
        }
        let dims = self.points[order[0]].1.len().max(1);
        let axis = depth % dims;
        {
            let points = &self.points;
            order.sort_by(|a, b| {
                let x = points[*a].1.get(axis).copied().unwrap_or_default();
                let y = points[*b].1.get(axis).copied().unwrap_or_default();
                x.total_cmp(&y)
            });
        }
        let mid = order.len() / 2;
        let point = order[mid];
        let (lower, upper) = order.split_at_mut(mid);
        let upper = &mut upper[1..];

        let left = self.build_node(lower, depth + 1);
        let right = self.build_node(upper, depth + 1);
        self.nodes.push(Node {
            point,
            axis,
            left,
            right,
        });
        Some(self.nodes.len() - 1)
    }
}

/// Connectivity backend answering queries with a kd-tree radius search.
///
/// Rebuilt once per density stage; ignores the per-dimension rule and
/// uses a single Manhattan radius instead.
#[derive(Debug, Clone, Default)]
pub struct KdTreeIndex {
    radius: f64,
    tree: KdTree,
}

impl KdTreeIndex {
    /// Creates an empty backend querying with `radius`.
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            tree: KdTree::default(),
        }
    }

    /// Query radius.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }
}

impl ConnectivityIndex for KdTreeIndex {
    fn name(&self) -> &'static str {
        "kdtree"
    }

    fn rebuild(
        &mut self,
        store: &MicroclusterStore,
        members: &[ClusterId],
        _rule: &ConnectivityRule,
    ) {
        let points = members
            .iter()
            .filter_map(|id| store.get(*id).map(|mc| (*id, mc.center().to_vec())))
            .collect();
        self.tree = KdTree::build(points);
    }

    fn neighbors(&self, store: &MicroclusterStore, id: ClusterId) -> Vec<ClusterId> {
        store
            .get(id)
            .map(|mc| self.tree.radius_query(mc.center(), self.radius))
            .unwrap_or_default()
    }
}
