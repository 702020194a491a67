//! Garbage collection of stale microclusters.
//!
//! The density stage hands every low-density microcluster to a
//! [`RetentionPolicy`], which keeps it as a candidate, moves it to long-term
//! memory, or drops it.
//!
//! # Example
//!
//! ```rust
//! use dyclee::gc::{RetentionConfig, RetentionPolicy};
//!
//! let policy = RetentionPolicy::new(RetentionConfig::new(true));
//! assert_eq!(policy.config().recency_window, 10);
//! ```

mod retention;

pub use retention::{
    DEFAULT_DENSITY_FRACTION, DEFAULT_RECENCY_WINDOW, RetentionConfig, RetentionOutcome,
    RetentionPolicy, RetentionResult,
};
