//! Read-only queries over a built [`Graph`].
//!
//! No query fails. An unknown key or an empty graph yields an empty result
//! (or `None` / `0.0` where the return type calls for it).
//!
//! Neighbours are visited in edge index order. Until a graph is pruned that
//! is insertion order; pruning moves the highest-indexed edge into each freed
//! slot, so the order stays deterministic but is no longer chronological.

pub mod cycles;
pub mod influence;
pub mod path;
pub mod traverse;

use petgraph::Direction;
use petgraph::visit::EdgeRef;

use crate::graph::{EdgeIndex, Graph, NodeIndex};

pub use cycles::{FeedbackLoop, detect_cycles};
pub use influence::{InfluenceEntry, calculate_influence, influence_at, most_influential_events};
pub use path::{PathHop, find_path};
pub use traverse::{CausalLink, find_causes, find_effects};

/// Edges touching `idx` in `direction`, as `(edge, other endpoint)` pairs in
/// edge index order.
pub(crate) fn adjacent(graph: &Graph, idx: NodeIndex, direction: Direction) -> Vec<(EdgeIndex, NodeIndex)> {
    let inner = graph.inner();
    let mut edges: Vec<(EdgeIndex, NodeIndex)> = inner
        .edges_directed(idx, direction)
        .filter_map(|edge| {
            let (source, target) = inner.edge_endpoints(edge.id())?;
            let other = match direction {
                Direction::Outgoing => target,
                Direction::Incoming => source,
            };
            Some((edge.id(), other))
        })
        .collect();
    edges.sort_unstable_by_key(|&(edge, _)| edge);
    edges
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
