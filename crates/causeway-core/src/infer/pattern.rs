//! Pattern frequency: recurring "A then soon B" habits per actor.
//!
//! For every ordered kind pair `(A, B)` in an actor's chronological sequence,
//! each A node is an *opportunity* and each B node within the next
//! `lookahead` nodes after an A is an *occurrence*. The rate is
//! `occurrences / opportunities`. Two thresholds apply: above
//! `candidate_rate` the pair is reported, above `materialize_rate` it is
//! also written into the graph with the rate as its strength, so a rate
//! above 1 surfaces as [`GraphError::StrengthOutOfRange`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, instrument};

use super::{Stage, checked_strength};
use crate::config::PatternConfig;
use crate::error::GraphError;
use crate::graph::{Edge, Graph, NodeIndex, Relationship};
use crate::model::EventKind;

/// A kind pair whose rate cleared the reporting threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternCandidate {
    pub actor: String,
    pub antecedent: EventKind,
    pub consequent: EventKind,
    pub occurrences: usize,
    pub opportunities: usize,
    pub rate: f64,
    /// True when the rate also cleared the materialization threshold.
    pub materialized: bool,
}

/// Result of [`infer`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternOutcome {
    pub linked: usize,
    pub candidates: Vec<PatternCandidate>,
}

/// Mine every actor's sequence, report candidates and materialize the
/// strong ones as `correlates` edges on still-empty pairs.
///
/// # Errors
///
/// Returns [`GraphError::StrengthOutOfRange`] if a materialized rate falls
/// outside `[0, 1]`, e.g. when several B nodes follow each A.
#[instrument(skip_all, fields(lookahead = config.lookahead))]
pub fn infer(graph: &mut Graph, config: &PatternConfig) -> Result<PatternOutcome, GraphError> {
    let sequences = actor_sequences(graph);
    let mut outcome = PatternOutcome::default();

    for (actor, sequence) in &sequences {
        let kinds: Vec<EventKind> = sequence.iter().map(|&idx| graph[idx].kind()).collect();
        let distinct: BTreeSet<EventKind> = kinds.iter().copied().collect();

        for &antecedent in &distinct {
            for &consequent in &distinct {
                let (occurrences, opportunities) = count(&kinds, antecedent, consequent, config.lookahead);
                if opportunities == 0 {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let rate = occurrences as f64 / opportunities as f64;
                if rate <= config.candidate_rate {
                    continue;
                }

                let materialized = rate > config.materialize_rate;
                if materialized {
                    outcome.linked += materialize(graph, sequence, &kinds, antecedent, consequent, rate, config.lookahead)?;
                }
                debug!(
                    actor = %actor,
                    %antecedent,
                    %consequent,
                    occurrences,
                    opportunities,
                    rate,
                    materialized,
                    "pattern candidate"
                );
                outcome.candidates.push(PatternCandidate {
                    actor: actor.clone(),
                    antecedent,
                    consequent,
                    occurrences,
                    opportunities,
                    rate,
                    materialized,
                });
            }
        }
    }

    debug!(
        linked = outcome.linked,
        candidates = outcome.candidates.len(),
        "pattern stage complete"
    );
    Ok(outcome)
}

/// Each actor's nodes in chronological order, actors sorted by name.
fn actor_sequences(graph: &Graph) -> BTreeMap<String, Vec<NodeIndex>> {
    let mut sequences: BTreeMap<String, Vec<NodeIndex>> = BTreeMap::new();
    for idx in graph.chronological() {
        sequences.entry(graph[idx].actor.clone()).or_default().push(idx);
    }
    sequences
}

/// Position of the first `consequent` within `lookahead` nodes after `pos`.
fn first_within(kinds: &[EventKind], pos: usize, consequent: EventKind, lookahead: usize) -> Option<usize> {
    let end = kinds.len().min(pos + 1 + lookahead);
    (pos + 1..end).find(|&j| kinds[j] == consequent)
}

/// `(occurrences, opportunities)` for the pair. Every B inside an A's
/// lookahead counts, so one A can contribute several occurrences.
fn count(kinds: &[EventKind], antecedent: EventKind, consequent: EventKind, lookahead: usize) -> (usize, usize) {
    let mut occurrences = 0;
    let mut opportunities = 0;
    for (pos, &kind) in kinds.iter().enumerate() {
        if kind != antecedent {
            continue;
        }
        opportunities += 1;
        let end = kinds.len().min(pos + 1 + lookahead);
        occurrences += kinds[pos + 1..end].iter().filter(|&&k| k == consequent).count();
    }
    (occurrences, opportunities)
}

fn materialize(
    graph: &mut Graph,
    sequence: &[NodeIndex],
    kinds: &[EventKind],
    antecedent: EventKind,
    consequent: EventKind,
    rate: f64,
    lookahead: usize,
) -> Result<usize, GraphError> {
    let mut linked = 0;
    for (pos, &kind) in kinds.iter().enumerate() {
        if kind != antecedent {
            continue;
        }
        let Some(hit) = first_within(kinds, pos, consequent, lookahead) else {
            continue;
        };
        let (from, to) = (sequence[pos], sequence[hit]);
        let strength = checked_strength(Stage::Pattern, rate, &graph[from].key, &graph[to].key)?;
        if graph.has_edge(from, to) {
            continue;
        }
        let evidence = vec![format!(
            "{consequent} followed {antecedent} within {lookahead} events at rate {rate:.2}"
        )];
        graph.insert_edge_if_absent(from, to, Edge::new(strength, Relationship::Correlates, evidence));
        linked += 1;
    }
    Ok(linked)
}
