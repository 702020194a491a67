//! Running per-dimension variance for dimensionality reduction.

/// Running sum of squares over normalized observations.
///
/// Normalized coordinates are treated as zero-mean, so the variance of a
/// dimension is its sum of squares divided by the observation count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarianceTracker {
    sum_squares: Vec<f64>,
    count: u64,
}

impl VarianceTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a normalized observation.
    pub fn update(&mut self, point: &[f64]) {
        if self.sum_squares.len() < point.len() {
            self.sum_squares.resize(point.len(), 0.0);
        }
        for (acc, x) in self.sum_squares.iter_mut().zip(point) {
            *acc = x.mul_add(*x, *acc);
        }
        self.count += 1;
    }

    /// Number of observations seen.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Per-dimension variances.
    #[must_use]
    pub fn variances(&self) -> Vec<f64> {
        if self.count == 0 {
            return vec![0.0; self.sum_squares.len()];
        }
        let n = self.count as f64;
        self.sum_squares.iter().map(|s| s / n).collect()
    }

    /// Indices of the `k` highest-variance dimensions.
    ///
    /// Ties go to the lower index.
    #[must_use]
    pub fn top_dimensions(&self, k: usize) -> Vec<usize> {
        let variances = self.variances();
        let mut dims: Vec<usize> = (0..variances.len()).collect();
        dims.sort_by(|a, b| variances[*b].total_cmp(&variances[*a]));
        dims.truncate(k);
        dims
    }
}
