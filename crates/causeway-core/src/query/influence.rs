//! Local influence score.
//!
//! ```text
//! influence(n) = out_degree(n) × 1.0
//!              + Σ strength(n → s) × 0.5
//!              + Σ out_degree(s) × 0.25      over direct successors s
//! ```
//!
//! Rounded to two decimals. This looks one hop ahead only; it is not a
//! fixed-point centrality.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use petgraph::Direction;
use serde::Serialize;

use super::{adjacent, round_to};
use crate::graph::{Graph, NodeIndex};
use crate::model::NodeKey;

const DEGREE_WEIGHT: f64 = 1.0;
const STRENGTH_WEIGHT: f64 = 0.5;
const SUCCESSOR_WEIGHT: f64 = 0.25;

/// One row of the influence ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluenceEntry {
    pub event: NodeKey,
    pub influence: f64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub out_degree: usize,
}

/// Influence of the node at `idx`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn influence_at(graph: &Graph, idx: NodeIndex) -> f64 {
    let outgoing = adjacent(graph, idx, Direction::Outgoing);
    let strength_sum: f64 = outgoing
        .iter()
        .filter_map(|&(edge, _)| graph.inner().edge_weight(edge))
        .map(|edge| edge.strength.get())
        .sum();
    let successor_degrees: usize = outgoing
        .iter()
        .map(|&(_, successor)| graph.out_degree(successor))
        .sum();

    round_to(
        outgoing.len() as f64 * DEGREE_WEIGHT
            + strength_sum * STRENGTH_WEIGHT
            + successor_degrees as f64 * SUCCESSOR_WEIGHT,
        2,
    )
}

/// Influence of `key`, or `0.0` if the graph has no such node.
#[must_use]
pub fn calculate_influence(graph: &Graph, key: &NodeKey) -> f64 {
    graph.node_index(key).map_or(0.0, |idx| influence_at(graph, idx))
}

/// The `limit` highest-scoring nodes, highest first. Nodes scoring zero are
/// left out; equal scores are ordered by node key.
#[must_use]
pub fn most_influential_events(graph: &Graph, limit: usize) -> Vec<InfluenceEntry> {
    let mut ranked: Vec<InfluenceEntry> = graph
        .nodes()
        .filter_map(|(idx, node)| {
            let influence = influence_at(graph, idx);
            (influence > 0.0).then(|| InfluenceEntry {
                event: node.key.clone(),
                influence,
                timestamp: node.timestamp,
                actor: node.actor.clone(),
                out_degree: graph.out_degree(idx),
            })
        })
        .collect();

    ranked.sort_by(|a, b| match b.influence.total_cmp(&a.influence) {
        Ordering::Equal => a.event.cmp(&b.event),
        other => other,
    });
    ranked.truncate(limit);
    ranked
}
