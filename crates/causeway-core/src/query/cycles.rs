//! Feedback loop detection.
//!
//! Depth-first search from every not-yet-visited node in index order, with an
//! explicit on-stack set. An edge back to a node still on the stack closes a
//! loop; the witness is the stack slice from that node plus the closing edge.
//! One witness is produced per back edge, so this is not an enumeration of
//! every simple cycle. Witnesses with an identical edge list are reported
//! once.

#![allow(clippy::module_name_repetitions)]

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use serde::Serialize;

use super::adjacent;
use crate::graph::{EdgeIndex, Graph, NodeIndex};
use crate::model::NodeKey;

/// A directed cycle in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackLoop {
    /// Nodes in traversal order, starting at the node the back edge returns to.
    pub nodes: Vec<NodeKey>,
    /// Edges in order, ending with the closing back edge.
    pub edges: Vec<(NodeKey, NodeKey)>,
    pub min_strength: f64,
    pub mean_strength: f64,
}

struct Frame {
    node: NodeIndex,
    neighbours: Vec<(EdgeIndex, NodeIndex)>,
    next: usize,
}

/// All feedback loops found by one DFS pass over the graph.
#[must_use]
pub fn detect_cycles(graph: &Graph) -> Vec<FeedbackLoop> {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    // Node → position on the current DFS path.
    let mut on_stack: HashMap<NodeIndex, usize> = HashMap::new();
    let mut path: Vec<NodeIndex> = Vec::new();
    let mut seen: HashSet<Vec<(NodeIndex, NodeIndex)>> = HashSet::new();
    let mut loops: Vec<FeedbackLoop> = Vec::new();

    for root in graph.inner().node_indices() {
        if !visited.insert(root) {
            continue;
        }
        on_stack.insert(root, path.len());
        path.push(root);
        let mut stack = vec![Frame {
            node: root,
            neighbours: adjacent(graph, root, Direction::Outgoing),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let current = frame.node;
            let Some(&(_, next)) = frame.neighbours.get(frame.next) else {
                stack.pop();
                path.pop();
                on_stack.remove(&current);
                continue;
            };
            frame.next += 1;

            if let Some(&pos) = on_stack.get(&next) {
                let members = &path[pos..];
                let mut edges: Vec<(NodeIndex, NodeIndex)> = members.windows(2).map(|w| (w[0], w[1])).collect();
                edges.push((current, next));
                if seen.insert(edges.clone()) {
                    loops.push(witness(graph, members, &edges));
                }
            } else if visited.insert(next) {
                on_stack.insert(next, path.len());
                path.push(next);
                stack.push(Frame {
                    node: next,
                    neighbours: adjacent(graph, next, Direction::Outgoing),
                    next: 0,
                });
            }
        }
    }

    loops
}

#[allow(clippy::cast_precision_loss)]
fn witness(graph: &Graph, members: &[NodeIndex], edges: &[(NodeIndex, NodeIndex)]) -> FeedbackLoop {
    let strengths: Vec<f64> = edges
        .iter()
        .filter_map(|&(a, b)| graph.edge(a, b))
        .map(|edge| edge.strength.get())
        .collect();
    let min_strength = strengths.iter().copied().fold(f64::INFINITY, f64::min);
    let mean_strength = if strengths.is_empty() {
        0.0
    } else {
        strengths.iter().sum::<f64>() / strengths.len() as f64
    };

    FeedbackLoop {
        nodes: members.iter().map(|&idx| graph[idx].key.clone()).collect(),
        edges: edges
            .iter()
            .map(|&(a, b)| (graph[a].key.clone(), graph[b].key.clone()))
            .collect(),
        min_strength: if strengths.is_empty() { 0.0 } else { min_strength },
        mean_strength,
    }
}
