//! Distance helpers shared by every stage.

/// Manhattan (L1) distance between two equally sized vectors.
///
/// Extra trailing coordinates in the longer slice are ignored.
#[must_use]
pub fn manhattan_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}
