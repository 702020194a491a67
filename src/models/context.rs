//! Normalization context and hyperbox geometry.
//!
//! A context is the 3×d matrix of per-dimension minimum, maximum and range.
//! Points are normalized into the unit hypercube against it, so every
//! hyperbox edge is `phi` long and the hyperbox volume is `phi^d`.
//!
//! # Adaptive contexts
//!
//! Without a fixed range the context starts at the origin, widens over the
//! first observation and only ever widens after that. Microcluster centers
//! computed under an older, narrower context are not renormalized when it
//! widens; clustering quality degrades gracefully while the ranges settle.

use crate::{Error, Result};

/// Per-dimension normalization bounds and derived hyperbox geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    min: Vec<f64>,
    max: Vec<f64>,
    range: Vec<f64>,
    adaptive: bool,
    phi: f64,
    hyperbox_sizes: Vec<f64>,
    hyperbox_volume: f64,
}

impl Context {
    /// Creates a fixed context from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the rows differ in length,
    /// [`Error::InvalidInput`] for empty or non-finite bounds, and
    /// [`Error::DegenerateRange`] if any dimension has `max <= min`.
    pub fn fixed(min: Vec<f64>, max: Vec<f64>, phi: f64) -> Result<Self> {
        if min.len() != max.len() {
            return Err(Error::DimensionMismatch {
                expected: min.len(),
                actual: max.len(),
            });
        }
        if min.is_empty() {
            return Err(Error::InvalidInput(
                "context must have at least one dimension".to_string(),
            ));
        }
        if min.iter().chain(&max).any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(
                "context bounds must be finite".to_string(),
            ));
        }
        if let Some(dimension) = min.iter().zip(&max).position(|(lo, hi)| hi <= lo) {
            return Err(Error::DegenerateRange { dimension });
        }

        let range = min.iter().zip(&max).map(|(lo, hi)| hi - lo).collect();
        let mut context = Self {
            min,
            max,
            range,
            adaptive: false,
            phi,
            hyperbox_sizes: Vec::new(),
            hyperbox_volume: 0.0,
        };
        context.refresh_geometry();
        Ok(context)
    }

    /// Creates an adaptive context anchored at the origin and widened over
    /// the first observation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty or non-finite point.
    pub fn adaptive(first: &[f64], phi: f64) -> Result<Self> {
        validate_point(first)?;
        if first.is_empty() {
            return Err(Error::InvalidInput(
                "observations must have at least one dimension".to_string(),
            ));
        }
        let dimensions = first.len();
        let mut context = Self {
            min: vec![0.0; dimensions],
            max: vec![0.0; dimensions],
            range: vec![0.0; dimensions],
            adaptive: true,
            phi,
            hyperbox_sizes: Vec::new(),
            hyperbox_volume: 0.0,
        };
        context.refresh_geometry();
        context.expand(first);
        Ok(context)
    }

    /// Normalizes a point, widening the bounds first if the context is adaptive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] or [`Error::InvalidInput`] for
    /// malformed points.
    pub fn normalize(&mut self, point: &[f64]) -> Result<Vec<f64>> {
        self.check_dimensions(point)?;
        validate_point(point)?;
        if self.adaptive {
            self.expand(point);
        }
        Ok(point
            .iter()
            .zip(self.min.iter().zip(&self.range))
            .map(|(x, (lo, range))| if *range > 0.0 { (x - lo) / range } else { 0.0 })
            .collect())
    }

    /// Maps a normalized point back into input units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the point has the wrong length.
    pub fn denormalize(&self, point: &[f64]) -> Result<Vec<f64>> {
        self.check_dimensions(point)?;
        Ok(point
            .iter()
            .zip(self.min.iter().zip(&self.range))
            .map(|(x, (lo, range))| x.mul_add(*range, *lo))
            .collect())
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.min.len()
    }

    /// Hyperbox edge length per dimension.
    #[must_use]
    pub fn hyperbox_sizes(&self) -> &[f64] {
        &self.hyperbox_sizes
    }

    /// Hyperbox volume (product of edge lengths).
    #[must_use]
    pub const fn hyperbox_volume(&self) -> f64 {
        self.hyperbox_volume
    }

    /// Relative hyperbox size.
    #[must_use]
    pub const fn phi(&self) -> f64 {
        self.phi
    }

    /// Whether bounds widen with new observations.
    #[must_use]
    pub const fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    /// Per-dimension minimum (row 0).
    #[must_use]
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Per-dimension maximum (row 1).
    #[must_use]
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Per-dimension `max - min` (row 2).
    #[must_use]
    pub fn range(&self) -> &[f64] {
        &self.range
    }

    fn check_dimensions(&self, point: &[f64]) -> Result<()> {
        if point.len() == self.dimensions() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.dimensions(),
                actual: point.len(),
            })
        }
    }

    fn expand(&mut self, point: &[f64]) {
        let mut changed = false;
        for (i, x) in point.iter().enumerate() {
            if *x < self.min[i] {
                self.min[i] = *x;
                changed = true;
            }
            if *x > self.max[i] {
                self.max[i] = *x;
                changed = true;
            }
        }
        if changed {
            for (r, (lo, hi)) in self.range.iter_mut().zip(self.min.iter().zip(&self.max)) {
                *r = hi - lo;
            }
            self.refresh_geometry();
        }
    }

    /// Edges are `phi` long in the unit-range convention.
    fn refresh_geometry(&mut self) {
        self.hyperbox_sizes = vec![self.phi; self.dimensions()];
        self.hyperbox_volume = self.hyperbox_sizes.iter().product();
    }
}

fn validate_point(point: &[f64]) -> Result<()> {
    if point.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(Error::InvalidInput(
            "observations must contain only finite values".to_string(),
        ))
    }
}
