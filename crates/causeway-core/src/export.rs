//! Serializable node/edge view of a built graph, for visualization tools.
//!
//! # Statistics
//!
//! - **total_nodes** / **total_edges**: table sizes.
//! - **avg_edge_strength**: mean edge strength rounded to 3 decimals, `0.0`
//!   for an edgeless graph.
//! - **edges_by_relationship**: edge count per relationship name.
//! - **isolated_nodes**: nodes with neither incoming nor outgoing edges.
//!
//! Nodes are ordered by `(timestamp, key)` and edges by their `(source,
//! target)` ids, so the same graph always exports to the same JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::graph::{Graph, Relationship, UnavailableSource};
use crate::model::{EventKind, Metadata};
use crate::query::{influence_at, round_to};

// ---------------------------------------------------------------------------
// Export types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportNode {
    /// `<kind>:<event_id>`.
    pub id: String,
    pub event_id: String,
    pub kind: EventKind,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
    pub influence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportEdge {
    pub source: String,
    pub target: String,
    pub strength: f64,
    pub relationship: Relationship,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub avg_edge_strength: f64,
    pub edges_by_relationship: BTreeMap<String, usize>,
    pub isolated_nodes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
    pub stats: ExportStats,
    /// Record streams that could not be read; non-empty means the graph is
    /// partial.
    pub unavailable_sources: Vec<UnavailableSource>,
    /// See [`Graph::content_hash`].
    pub content_hash: String,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Snapshot `graph` with per-node influence.
#[must_use]
pub fn export_graph(graph: &Graph) -> GraphExport {
    let nodes: Vec<ExportNode> = graph
        .chronological()
        .into_iter()
        .map(|idx| {
            let node = &graph[idx];
            ExportNode {
                id: node.key.to_string(),
                event_id: node.key.event_id.clone(),
                kind: node.kind(),
                actor: node.actor.clone(),
                timestamp: node.timestamp,
                metadata: node.metadata.clone(),
                influence: influence_at(graph, idx),
            }
        })
        .collect();

    let mut edges: Vec<ExportEdge> = graph
        .edges()
        .map(|(from, to, edge)| ExportEdge {
            source: from.key.to_string(),
            target: to.key.to_string(),
            strength: edge.strength.get(),
            relationship: edge.relationship,
            evidence: edge.evidence.clone(),
        })
        .collect();
    edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

    GraphExport {
        stats: stats(graph, &edges),
        nodes,
        edges,
        unavailable_sources: graph.unavailable_sources().to_vec(),
        content_hash: graph.content_hash(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn stats(graph: &Graph, edges: &[ExportEdge]) -> ExportStats {
    let avg_edge_strength = if edges.is_empty() {
        0.0
    } else {
        round_to(
            edges.iter().map(|e| e.strength).sum::<f64>() / edges.len() as f64,
            3,
        )
    };

    let mut edges_by_relationship: BTreeMap<String, usize> = BTreeMap::new();
    for edge in edges {
        *edges_by_relationship
            .entry(edge.relationship.as_str().to_string())
            .or_insert(0) += 1;
    }

    let isolated_nodes = graph
        .nodes()
        .filter(|&(idx, _)| graph.out_degree(idx) == 0 && graph.in_degree(idx) == 0)
        .count();

    ExportStats {
        total_nodes: graph.node_count(),
        total_edges: graph.edge_count(),
        avg_edge_strength,
        edges_by_relationship,
        isolated_nodes,
    }
}
