//! Bounded ancestor and descendant search.
//!
//! Both directions share one visited set for the whole traversal, with the
//! start node pre-visited. A node reachable along several paths is reported
//! once, at the depth where it was first discovered, so multi-path ancestors
//! can appear shallower than their longest route would suggest.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use petgraph::Direction;
use serde::Serialize;

use super::adjacent;
use crate::graph::{EdgeIndex, Graph, NodeIndex, Relationship};
use crate::model::{Metadata, NodeKey};

/// One node reached from the query node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CausalLink {
    pub event: NodeKey,
    pub timestamp: DateTime<Utc>,
    /// Strength of the edge the node was discovered through.
    pub strength: f64,
    pub relationship: Relationship,
    pub evidence: Vec<String>,
    /// Hops from the query node, starting at 1.
    pub depth: usize,
    pub metadata: Metadata,
}

/// Nodes with a path *to* `key` of at most `max_depth` edges, strongest
/// discovering edge first.
#[must_use]
pub fn find_causes(graph: &Graph, key: &NodeKey, max_depth: usize) -> Vec<CausalLink> {
    walk(graph, key, max_depth, Direction::Incoming)
}

/// Nodes reachable *from* `key` in at most `max_depth` edges, strongest
/// discovering edge first.
#[must_use]
pub fn find_effects(graph: &Graph, key: &NodeKey, max_depth: usize) -> Vec<CausalLink> {
    walk(graph, key, max_depth, Direction::Outgoing)
}

struct Frame {
    depth: usize,
    neighbours: Vec<(EdgeIndex, NodeIndex)>,
    next: usize,
}

fn walk(graph: &Graph, key: &NodeKey, max_depth: usize, direction: Direction) -> Vec<CausalLink> {
    let Some(start) = graph.node_index(key) else {
        return Vec::new();
    };
    if max_depth == 0 {
        return Vec::new();
    }

    let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
    let mut found: Vec<CausalLink> = Vec::new();
    let mut stack = vec![Frame {
        depth: 0,
        neighbours: adjacent(graph, start, direction),
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(&(edge_idx, other)) = frame.neighbours.get(frame.next) else {
            stack.pop();
            continue;
        };
        frame.next += 1;
        let depth = frame.depth + 1;

        if !visited.insert(other) {
            continue;
        }
        let (Some(node), Some(edge)) = (graph.node(other), graph.inner().edge_weight(edge_idx)) else {
            continue;
        };
        found.push(CausalLink {
            event: node.key.clone(),
            timestamp: node.timestamp,
            strength: edge.strength.get(),
            relationship: edge.relationship,
            evidence: edge.evidence.clone(),
            depth,
            metadata: node.metadata.clone(),
        });

        if depth < max_depth {
            stack.push(Frame {
                depth,
                neighbours: adjacent(graph, other, direction),
                next: 0,
            });
        }
    }

    found.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    found
}
