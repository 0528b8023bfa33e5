//! Causal graph store.
//!
//! # Overview
//!
//! A [`Graph`] is a petgraph [`DiGraph`] whose node weights are [`Node`]s and
//! whose edge weights are [`Edge`]s, plus an interning map from [`NodeKey`]
//! to [`NodeIndex`]. petgraph keeps the forward and reverse adjacency lists in
//! step with the edge table, so every edge sits in exactly one outgoing and
//! one incoming list at all times.
//!
//! ## Identity rules
//!
//! - Inserting a node whose key already exists overwrites its attributes
//!   (last write wins); the node count is unchanged.
//! - At most one edge exists per ordered `(source, target)` pair.
//!   [`Graph::insert_edge`] overwrites; [`Graph::insert_edge_if_absent`]
//!   keeps the existing edge. Inference stages pick one or the other, which
//!   is what makes stage order a precedence order.
//!
//! ## Stability
//!
//! Nodes are never removed. Pruning removes edges only, so a [`NodeIndex`]
//! obtained from a graph stays valid for the life of that graph.
//!
//! ## Cache Invalidation
//!
//! [`Graph::content_hash`] is a BLAKE3 hash of the sorted edge set. A caller
//! that caches built graphs can compare it against a stored value.

#![allow(clippy::module_name_repetitions)]

pub mod edge;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Index;

use chrono::{DateTime, Utc};
use petgraph::Direction;
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::debug;

pub use edge::{Edge, Relationship, Strength};
pub use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::error::RecordError;
use crate::model::{EventKind, Metadata, NodeKey, validate_metadata};
use crate::source::SourceKind;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One timestamped event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub key: NodeKey,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub metadata: Metadata,
}

impl Node {
    /// A node with empty metadata.
    #[must_use]
    pub fn new(key: NodeKey, timestamp: DateTime<Utc>, actor: impl Into<String>) -> Self {
        Self {
            key,
            timestamp,
            actor: actor.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach metadata, type-checking the keys known for this node's kind.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Metadata`] if a known key has the wrong type.
    pub fn with_metadata(mut self, metadata: Metadata) -> Result<Self, RecordError> {
        validate_metadata(self.key.kind, &metadata)?;
        self.metadata = metadata;
        Ok(self)
    }

    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.key.kind
    }
}

/// A record stream that could not be read while building this graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableSource {
    pub source: SourceKind,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Directed, weighted causal graph built for a single request.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    graph: DiGraph<Node, Edge>,
    node_map: HashMap<NodeKey, NodeIndex>,
    unavailable: Vec<UnavailableSource>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the underlying petgraph graph for read-only algorithms.
    #[must_use]
    pub const fn inner(&self) -> &DiGraph<Node, Edge> {
        &self.graph
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Look up the `NodeIndex` for a key.
    #[must_use]
    pub fn node_index(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.node_map.get(key).copied()
    }

    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    #[must_use]
    pub fn node_by_key(&self, key: &NodeKey) -> Option<&Node> {
        self.node_index(key).and_then(|idx| self.node(idx))
    }

    #[must_use]
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.node_map.contains_key(key)
    }

    /// All nodes with their indices, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// All edges as `(source, target, weight)`.
    pub fn edges(&self) -> impl Iterator<Item = (&Node, &Node, &Edge)> {
        self.graph.edge_references().map(move |edge| {
            (
                &self.graph[edge.source()],
                &self.graph[edge.target()],
                edge.weight(),
            )
        })
    }

    /// The edge for an ordered pair, if any.
    #[must_use]
    pub fn edge(&self, from: NodeIndex, to: NodeIndex) -> Option<&Edge> {
        self.graph
            .find_edge(from, to)
            .and_then(|e| self.graph.edge_weight(e))
    }

    #[must_use]
    pub fn edge_by_keys(&self, from: &NodeKey, to: &NodeKey) -> Option<&Edge> {
        self.edge(self.node_index(from)?, self.node_index(to)?)
    }

    #[must_use]
    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.graph.contains_edge(from, to)
    }

    #[must_use]
    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    #[must_use]
    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Node indices sorted by `(timestamp, key)`.
    #[must_use]
    pub fn chronological(&self) -> Vec<NodeIndex> {
        let mut order: Vec<NodeIndex> = self.graph.node_indices().collect();
        order.sort_by(|&a, &b| {
            let (na, nb) = (&self.graph[a], &self.graph[b]);
            na.timestamp
                .cmp(&nb.timestamp)
                .then_with(|| na.key.cmp(&nb.key))
        });
        order
    }

    /// Insert a node, or overwrite the attributes of the node with the same
    /// key. Returns the node's index either way.
    pub fn insert_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&node.key) {
            debug!(key = %node.key, "overwriting node with existing key");
            self.graph[idx] = node;
            return idx;
        }
        let key = node.key.clone();
        let idx = self.graph.add_node(node);
        self.node_map.insert(key, idx);
        idx
    }

    /// Insert `from → to`, replacing any existing edge for that pair.
    ///
    /// Returns the replaced edge.
    pub fn insert_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: Edge) -> Option<Edge> {
        match self.graph.find_edge(from, to) {
            Some(existing) => Some(std::mem::replace(&mut self.graph[existing], edge)),
            None => {
                self.graph.add_edge(from, to, edge);
                None
            }
        }
    }

    /// Insert `from → to` only if the pair has no edge yet.
    ///
    /// Returns `true` if the edge was inserted.
    pub fn insert_edge_if_absent(&mut self, from: NodeIndex, to: NodeIndex, edge: Edge) -> bool {
        if self.graph.contains_edge(from, to) {
            return false;
        }
        self.graph.add_edge(from, to, edge);
        true
    }

    /// Remove every edge with `strength < threshold`.
    ///
    /// Both adjacency directions are updated together. Returns the number of
    /// removed edges. Nothing compares below a NaN threshold, so NaN removes
    /// nothing.
    pub fn prune_weak_edges(&mut self, threshold: f64) -> usize {
        let before = self.graph.edge_count();
        self.graph.retain_edges(|g, e| {
            g.edge_weight(e)
                .is_some_and(|edge| edge.strength.get().partial_cmp(&threshold) != Some(Ordering::Less))
        });
        let removed = before - self.graph.edge_count();
        debug!(threshold, removed, remaining = self.graph.edge_count(), "pruned weak edges");
        removed
    }

    /// Record that `source` could not be read for this graph.
    pub fn mark_unavailable(&mut self, source: SourceKind, reason: impl Into<String>) {
        self.unavailable.push(UnavailableSource {
            source,
            reason: reason.into(),
        });
    }

    #[must_use]
    pub fn unavailable_sources(&self) -> &[UnavailableSource] {
        &self.unavailable
    }

    /// True when at least one record stream was missing during the build.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        !self.unavailable.is_empty()
    }

    /// Verify the key map, node table and adjacency lists agree.
    ///
    /// Checks that every interned key points at a node carrying that key,
    /// that no ordered pair has two edges, and that every edge is visible
    /// from both its source's outgoing list and its target's incoming list.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.node_map.len() != self.graph.node_count() {
            return false;
        }
        let keys_ok = self
            .node_map
            .iter()
            .all(|(key, &idx)| self.graph.node_weight(idx).is_some_and(|n| &n.key == key));
        if !keys_ok {
            return false;
        }

        let mut outgoing = 0;
        let mut incoming = 0;
        for idx in self.graph.node_indices() {
            let mut targets: Vec<NodeIndex> = self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| e.target())
                .collect();
            outgoing += targets.len();
            targets.sort_unstable();
            if targets.windows(2).any(|w| w[0] == w[1]) {
                return false;
            }
            incoming += self.graph.edges_directed(idx, Direction::Incoming).count();
        }
        outgoing == self.graph.edge_count() && incoming == self.graph.edge_count()
    }

    /// BLAKE3 hash of the sorted edge set, for cache invalidation.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut edges: Vec<(String, String, u64, Relationship)> = self
            .edges()
            .map(|(from, to, edge)| {
                (
                    from.key.to_string(),
                    to.key.to_string(),
                    edge.strength.get().to_bits(),
                    edge.relationship,
                )
            })
            .collect();
        edges.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        for (from, to, strength, relationship) in &edges {
            hasher.update(from.as_bytes());
            hasher.update(b"\x00");
            hasher.update(to.as_bytes());
            hasher.update(b"\x00");
            hasher.update(&strength.to_le_bytes());
            hasher.update(relationship.as_str().as_bytes());
            hasher.update(b"\x00");
        }
        format!("blake3:{}", hasher.finalize())
    }
}

impl Index<NodeIndex> for Graph {
    type Output = Node;

    fn index(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid ts")
    }

    fn node(id: &str, kind: EventKind, secs: i64) -> Node {
        Node::new(NodeKey::new(id, kind), ts(secs), "agent-1")
    }

    fn edge(strength: f64, relationship: Relationship) -> Edge {
        Edge::new(
            Strength::new(strength).expect("valid strength"),
            relationship,
            Vec::new(),
        )
    }

    #[test]
    fn empty_graph() {
        let g = Graph::new();
        assert!(g.is_empty());
        assert_eq!(g.edge_count(), 0);
        assert!(g.is_consistent());
        assert!(!g.is_incomplete());
    }

    #[test]
    fn reinserting_key_overwrites_without_growing() {
        let mut g = Graph::new();
        let first = g.insert_node(node("m1", EventKind::Message(Role::User), 0));
        let mut replacement = node("m1", EventKind::Message(Role::User), 5);
        replacement.actor = "agent-2".to_string();
        let second = g.insert_node(replacement);

        assert_eq!(first, second);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g[first].actor, "agent-2");
        assert_eq!(g[first].timestamp, ts(5));
        assert!(g.is_consistent());
    }

    #[test]
    fn same_id_different_kind_are_two_nodes() {
        let mut g = Graph::new();
        g.insert_node(node("T1", EventKind::TaskCreated, 0));
        g.insert_node(node("T1", EventKind::TaskCompleted, 60));
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn insert_edge_overwrites_pair() {
        let mut g = Graph::new();
        let a = g.insert_node(node("a", EventKind::Message(Role::User), 0));
        let b = g.insert_node(node("b", EventKind::TaskCreated, 1));

        assert!(g.insert_edge(a, b, edge(0.4, Relationship::Influences)).is_none());
        let replaced = g.insert_edge(a, b, edge(0.9, Relationship::Triggers));

        assert_eq!(replaced.map(|e| e.relationship), Some(Relationship::Influences));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge(a, b).map(|e| e.relationship), Some(Relationship::Triggers));
        assert!(g.is_consistent());
    }

    #[test]
    fn insert_if_absent_keeps_existing() {
        let mut g = Graph::new();
        let a = g.insert_node(node("a", EventKind::Message(Role::User), 0));
        let b = g.insert_node(node("b", EventKind::TaskCreated, 1));

        assert!(g.insert_edge_if_absent(a, b, edge(0.9, Relationship::Triggers)));
        assert!(!g.insert_edge_if_absent(a, b, edge(0.2, Relationship::Correlates)));
        assert_eq!(g.edge(a, b).map(|e| e.strength.get()), Some(0.9));
    }

    #[test]
    fn reverse_pair_is_a_distinct_edge() {
        let mut g = Graph::new();
        let a = g.insert_node(node("a", EventKind::TaskCreated, 0));
        let b = g.insert_node(node("b", EventKind::TaskCreated, 1));
        g.insert_edge(a, b, edge(0.5, Relationship::Correlates));
        g.insert_edge(b, a, edge(0.5, Relationship::Correlates));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn prune_removes_strictly_weaker_edges() {
        let mut g = Graph::new();
        let a = g.insert_node(node("a", EventKind::TaskCreated, 0));
        let b = g.insert_node(node("b", EventKind::TaskCreated, 1));
        let c = g.insert_node(node("c", EventKind::TaskCreated, 2));
        g.insert_edge(a, b, edge(0.3, Relationship::Correlates));
        g.insert_edge(b, c, edge(0.5, Relationship::Correlates));
        g.insert_edge(a, c, edge(0.9, Relationship::Correlates));

        assert_eq!(g.prune_weak_edges(0.5), 1);
        assert!(!g.has_edge(a, b));
        assert!(g.has_edge(b, c), "edge exactly at threshold survives");
        assert!(g.has_edge(a, c));
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.out_degree(a), 1);
        assert_eq!(g.in_degree(b), 0);
        assert!(g.is_consistent());
    }

    #[test]
    fn prune_with_nan_threshold_keeps_every_edge() {
        let mut g = Graph::new();
        let a = g.insert_node(node("a", EventKind::TaskCreated, 0));
        let b = g.insert_node(node("b", EventKind::TaskCreated, 1));
        g.insert_edge(a, b, edge(0.3, Relationship::Correlates));

        assert_eq!(g.prune_weak_edges(f64::NAN), 0);
        assert!(g.has_edge(a, b));
        assert!(g.is_consistent());
    }

    #[test]
    fn node_indices_survive_pruning() {
        let mut g = Graph::new();
        let a = g.insert_node(node("a", EventKind::TaskCreated, 0));
        let b = g.insert_node(node("b", EventKind::TaskCreated, 1));
        g.insert_edge(a, b, edge(0.1, Relationship::Correlates));
        g.prune_weak_edges(0.5);
        assert_eq!(g.node_index(&NodeKey::new("b", EventKind::TaskCreated)), Some(b));
        assert_eq!(g[b].key.event_id, "b");
    }

    #[test]
    fn chronological_orders_by_timestamp_then_key() {
        let mut g = Graph::new();
        let late = g.insert_node(node("z", EventKind::TaskCreated, 10));
        let tie_b = g.insert_node(node("b", EventKind::TaskCreated, 0));
        let tie_a = g.insert_node(node("a", EventKind::TaskCreated, 0));
        assert_eq!(g.chronological(), vec![tie_a, tie_b, late]);
    }

    #[test]
    fn with_metadata_validates_known_keys() {
        let n = node("m1", EventKind::Message(Role::User), 0);
        let mut bad = Metadata::new();
        bad.insert("content".to_string(), json!(7));
        assert!(n.clone().with_metadata(bad).is_err());

        let mut good = Metadata::new();
        good.insert("content".to_string(), json!("hello"));
        let n = n.with_metadata(good).expect("valid metadata");
        assert_eq!(n.metadata["content"], json!("hello"));
    }

    #[test]
    fn unavailable_sources_flag_incomplete() {
        let mut g = Graph::new();
        g.mark_unavailable(SourceKind::Tasks, "connection refused");
        assert!(g.is_incomplete());
        assert_eq!(g.unavailable_sources()[0].source, SourceKind::Tasks);
    }

    #[test]
    fn content_hash_tracks_edges() {
        let mut g = Graph::new();
        let a = g.insert_node(node("a", EventKind::TaskCreated, 0));
        let b = g.insert_node(node("b", EventKind::TaskCreated, 1));
        let empty = g.content_hash();
        assert!(empty.starts_with("blake3:"));

        g.insert_edge(a, b, edge(0.5, Relationship::Correlates));
        let one = g.content_hash();
        assert_ne!(empty, one);

        g.insert_edge(a, b, edge(0.6, Relationship::Correlates));
        assert_ne!(one, g.content_hash(), "strength change must change the hash");
    }
}
