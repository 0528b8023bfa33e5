//! Edge weights: strength, relationship type and evidence.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StrengthError;

/// Confidence heuristic in `[0.0, 1.0]`. Not a calibrated probability.
///
/// The only way to obtain a `Strength` is [`Strength::new`], which rejects
/// out-of-range values instead of clamping them. A stage that computes a bad
/// value must surface the defect, not hide it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Strength(f64);

impl Strength {
    /// Deterministic structural relations.
    pub const CERTAIN: Self = Self(1.0);

    /// # Errors
    ///
    /// Returns [`StrengthError`] if `value` is not finite or lies outside
    /// `[0.0, 1.0]`.
    pub fn new(value: f64) -> Result<Self, StrengthError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(StrengthError(value))
        }
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Strength {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// How an edge was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// Explicitly logged by the system.
    Triggers,
    /// Deterministic structural relation (task created → task completed).
    Causes,
    /// Inferred from temporal proximity.
    Influences,
    /// Inferred from a recurring per-actor sequence.
    Correlates,
}

impl Relationship {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Triggers => "triggers",
            Self::Causes => "causes",
            Self::Influences => "influences",
            Self::Correlates => "correlates",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight of a directed edge. Identity is the ordered node pair it connects,
/// held by the graph, not by this struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub strength: Strength,
    pub relationship: Relationship,
    pub evidence: Vec<String>,
}

impl Edge {
    #[must_use]
    pub const fn new(strength: Strength, relationship: Relationship, evidence: Vec<String>) -> Self {
        Self {
            strength,
            relationship,
            evidence,
        }
    }
}
