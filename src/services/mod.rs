//! Clustering services.
//!
//! The engine drives two stages over the shared microcluster store:
//!
//! | Stage | Runs | Does |
//! |-------|------|------|
//! | [`DistanceStage`] | per observation | Assigns the point to a microcluster |
//! | [`DensityStage`] | every `t_global` observations | Classifies, merges, forgets, snapshots |

mod density;
mod distance;
mod engine;
mod variance;

pub use density::{Classification, DensityReport, DensityStage};
pub use distance::{Assignment, DistanceStage};
pub use engine::DycleeEngine;
pub use variance::VarianceTracker;
