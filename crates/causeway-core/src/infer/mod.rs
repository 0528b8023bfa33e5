//! Edge inference pipeline.
//!
//! # Stages
//!
//! Three strategies run in a fixed order over the ingested nodes:
//!
//! ```text
//! explicit   trigger links  → `triggers` (strength = logged confidence)
//!            task lifecycle → `causes`   (strength = 1.0)
//! temporal   user message → task created within the window → `influences`
//! pattern    recurring per-actor A-then-B sequences         → `correlates`
//! ```
//!
//! ## Precedence
//!
//! One edge exists per ordered pair. The explicit stage overwrites; the
//! temporal and pattern stages only fill pairs that are still empty. Stage
//! order is therefore the precedence order (explicit > temporal > pattern).
//! This is a contract: consumers comparing query results across builds rely
//! on it, so it is not replaced by strength-based merging.
//!
//! ## Invariant
//!
//! Every computed strength goes through [`checked_strength`]. A value outside
//! `[0, 1]` aborts the build with [`GraphError::StrengthOutOfRange`].

pub mod explicit;
pub mod pattern;
pub mod temporal;

use std::fmt;

use serde::Serialize;
use tracing::{error, instrument};

use crate::config::CausalConfig;
use crate::error::GraphError;
use crate::graph::{Graph, Strength};
use crate::model::{NodeKey, TriggerLink};

pub use pattern::PatternCandidate;
pub use temporal::temporal_strength;

/// Which inference stage wrote an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Explicit,
    Structural,
    Temporal,
    Pattern,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Structural => "structural",
            Self::Temporal => "temporal",
            Self::Pattern => "pattern",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one inference run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InferenceReport {
    /// `triggers` edges written from trigger links.
    pub explicit_links: usize,
    /// `causes` edges written between task lifecycle nodes.
    pub structural_links: usize,
    /// Trigger links whose endpoints did not resolve to nodes.
    pub unresolved_links: usize,
    /// `influences` edges written.
    pub temporal_links: usize,
    /// `correlates` edges written.
    pub pattern_links: usize,
    /// Every kind pair whose rate cleared the candidate threshold.
    pub candidates: Vec<PatternCandidate>,
}

impl InferenceReport {
    #[must_use]
    pub const fn total_links(&self) -> usize {
        self.explicit_links + self.structural_links + self.temporal_links + self.pattern_links
    }
}

/// Run all three stages in order.
///
/// # Errors
///
/// Returns [`GraphError::StrengthOutOfRange`] if any stage computes an
/// invalid strength. The graph is left partially populated in that case and
/// must be discarded.
#[instrument(skip_all, fields(nodes = graph.node_count(), links = links.len()))]
pub fn run(graph: &mut Graph, links: &[TriggerLink], config: &CausalConfig) -> Result<InferenceReport, GraphError> {
    let explicit = explicit::link_triggers(graph, links)?;
    let structural_links = explicit::link_task_lifecycles(graph);
    let temporal_links = temporal::infer(graph, &config.temporal)?;
    let pattern = pattern::infer(graph, &config.pattern)?;

    Ok(InferenceReport {
        explicit_links: explicit.linked,
        structural_links,
        unresolved_links: explicit.unresolved,
        temporal_links,
        pattern_links: pattern.linked,
        candidates: pattern.candidates,
    })
}

/// Validate a computed strength for an edge `from → to`.
///
/// # Errors
///
/// Returns [`GraphError::StrengthOutOfRange`] and logs at `error` level.
pub fn checked_strength(stage: Stage, value: f64, from: &NodeKey, to: &NodeKey) -> Result<Strength, GraphError> {
    Strength::new(value).map_err(|err| {
        error!(%stage, value, %from, %to, "inference produced an out-of-range strength");
        GraphError::StrengthOutOfRange {
            stage,
            from: from.to_string(),
            to: to.to_string(),
            error: err,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventKind;

    #[test]
    fn checked_strength_passes_valid_values() {
        let a = NodeKey::new("a", EventKind::TaskCreated);
        let b = NodeKey::new("b", EventKind::TaskCreated);
        let s = checked_strength(Stage::Pattern, 0.75, &a, &b).expect("valid");
        assert!((s.get() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn checked_strength_rejects_and_names_stage() {
        let a = NodeKey::new("a", EventKind::TaskCreated);
        let b = NodeKey::new("b", EventKind::TaskCreated);
        let err = checked_strength(Stage::Temporal, 1.2, &a, &b).expect_err("invalid");
        match err {
            GraphError::StrengthOutOfRange { stage, from, to, .. } => {
                assert_eq!(stage, Stage::Temporal);
                assert_eq!(from, "task_created:a");
                assert_eq!(to, "task_created:b");
            }
        }
    }
}
