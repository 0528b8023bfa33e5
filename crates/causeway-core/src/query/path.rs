//! Shortest path by hop count.

use std::collections::{HashMap, VecDeque};

use petgraph::Direction;
use serde::Serialize;

use super::adjacent;
use crate::graph::{EdgeIndex, Graph, NodeIndex, Relationship};
use crate::model::NodeKey;

/// One edge along a path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathHop {
    pub from: NodeKey,
    pub to: NodeKey,
    pub strength: f64,
    pub relationship: Relationship,
}

/// First path found by breadth-first search from `from` to `to` over
/// outgoing edges.
///
/// The path is shortest in edges, not strongest. A node to itself is the
/// empty path. Returns `None` if either endpoint is missing or `to` is not
/// reachable.
#[must_use]
pub fn find_path(graph: &Graph, from: &NodeKey, to: &NodeKey) -> Option<Vec<PathHop>> {
    let start = graph.node_index(from)?;
    let goal = graph.node_index(to)?;
    if start == goal {
        return Some(Vec::new());
    }

    let mut parent: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> = HashMap::new();
    let mut queue: VecDeque<NodeIndex> = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        for (edge, next) in adjacent(graph, current, Direction::Outgoing) {
            if next == start || parent.contains_key(&next) {
                continue;
            }
            parent.insert(next, (current, edge));
            if next == goal {
                return Some(reconstruct(graph, goal, &parent));
            }
            queue.push_back(next);
        }
    }

    None
}

fn reconstruct(graph: &Graph, goal: NodeIndex, parent: &HashMap<NodeIndex, (NodeIndex, EdgeIndex)>) -> Vec<PathHop> {
    let mut hops = Vec::new();
    let mut cursor = goal;
    while let Some(&(prev, edge_idx)) = parent.get(&cursor) {
        if let Some(edge) = graph.inner().edge_weight(edge_idx) {
            hops.push(PathHop {
                from: graph[prev].key.clone(),
                to: graph[cursor].key.clone(),
                strength: edge.strength.get(),
                relationship: edge.relationship,
            });
        }
        cursor = prev;
    }
    hops.reverse();
    hops
}
