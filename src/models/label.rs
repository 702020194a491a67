//! Cluster labels and label generation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label carried by a microcluster or final cluster.
///
/// Distinguishes "no label yet" from labels this engine minted and labels
/// supplied from outside (ground truth or identities from another run), so
/// label voting can tell them apart structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Label {
    /// No label assigned.
    #[default]
    Unclassed,
    /// Label minted by a [`LabelGenerator`].
    Generated(GeneratedLabel),
    /// Externally supplied label.
    External(String),
}

/// Identifier minted by a [`LabelGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedLabel {
    /// Run identifier of the generator that minted the label.
    pub run: String,
    /// Sequence number within the run.
    pub seq: u64,
}

impl Label {
    /// Parses a raw label value.
    ///
    /// Empty strings and `Unclassed` (any case) map to [`Label::Unclassed`];
    /// anything else is treated as an external label.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unclassed") {
            Self::Unclassed
        } else {
            Self::External(trimmed.to_string())
        }
    }

    /// Creates an external label.
    #[must_use]
    pub fn external(value: impl Into<String>) -> Self {
        Self::External(value.into())
    }

    /// Returns true if no label is assigned.
    #[must_use]
    pub const fn is_unclassed(&self) -> bool {
        matches!(self, Self::Unclassed)
    }

    /// Returns true for externally supplied labels.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclassed => write!(f, "Unclassed"),
            Self::Generated(generated) => write!(f, "dyclee-{}-{}", generated.run, generated.seq),
            Self::External(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Mints fresh cluster labels for one engine instance.
#[derive(Debug, Clone)]
pub struct LabelGenerator {
    run: String,
    next: u64,
}

impl LabelGenerator {
    /// Creates a generator with a random run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::with_run_id(uuid::Uuid::new_v4().simple().to_string()[..8].to_string())
    }

    /// Creates a generator with a fixed run identifier.
    #[must_use]
    pub fn with_run_id(run: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            next: 0,
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run
    }

    /// Mints the next label.
    pub fn next_label(&mut self) -> Label {
        let seq = self.next;
        self.next += 1;
        Label::Generated(GeneratedLabel {
            run: self.run.clone(),
            seq,
        })
    }

    /// Returns true if `label` was minted by this generator's run.
    #[must_use]
    pub fn owns(&self, label: &Label) -> bool {
        matches!(label, Label::Generated(generated) if generated.run == self.run)
    }
}

impl Default for LabelGenerator {
    fn default() -> Self {
        Self::new()
    }
}
