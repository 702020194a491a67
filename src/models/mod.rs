//! Data models for dyclee.
//!
//! This module contains the core data structures shared by every stage.

mod context;
mod density;
mod final_cluster;
mod forgetting;
mod label;
mod microcluster;

pub use context::Context;
pub use density::DensityType;
pub use final_cluster::FinalCluster;
pub use forgetting::ForgetMethod;
pub use label::{GeneratedLabel, Label, LabelGenerator};
pub use microcluster::{ClusterId, MicroCluster};

/// Observation timestamp in caller-defined integer time units.
pub type Timestamp = u64;
