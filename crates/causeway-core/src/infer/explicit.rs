//! Explicit links: logged trigger records and task lifecycles.

use std::collections::HashMap;

use tracing::{debug, instrument};

use super::{Stage, checked_strength};
use crate::error::GraphError;
use crate::graph::{Edge, Graph, NodeIndex, Relationship, Strength};
use crate::model::{EventKind, NodeKey, TriggerLink};

/// Result of [`link_triggers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub linked: usize,
    pub unresolved: usize,
}

/// Maps record ids to nodes.
///
/// An id alone is ambiguous (a task id names both its created and completed
/// node), so a bare id resolves to the earliest node carrying it, with ties
/// broken by kind name.
struct IdResolver<'g> {
    graph: &'g Graph,
    earliest: HashMap<&'g str, NodeIndex>,
}

impl<'g> IdResolver<'g> {
    fn new(graph: &'g Graph) -> Self {
        let mut earliest: HashMap<&'g str, NodeIndex> = HashMap::new();
        for (idx, node) in graph.nodes() {
            earliest
                .entry(node.key.event_id.as_str())
                .and_modify(|current| {
                    let held = &graph[*current];
                    let newer = (node.timestamp, node.kind().as_str());
                    if newer < (held.timestamp, held.kind().as_str()) {
                        *current = idx;
                    }
                })
                .or_insert(idx);
        }
        Self { graph, earliest }
    }

    fn by_id(&self, id: &str) -> Option<NodeIndex> {
        self.earliest.get(id).copied()
    }

    /// Exact `(id, kind)` when the kind parses and exists, else [`Self::by_id`].
    fn by_id_and_kind(&self, id: &str, kind: &str) -> Option<NodeIndex> {
        kind.parse::<EventKind>()
            .ok()
            .and_then(|kind| self.graph.node_index(&NodeKey::new(id, kind)))
            .or_else(|| self.by_id(id))
    }
}

/// Insert one `triggers` edge per resolvable trigger link, overwriting any
/// edge already on that pair.
///
/// # Errors
///
/// Returns [`GraphError::StrengthOutOfRange`] if a link's confidence is not
/// in `[0, 1]`.
#[instrument(skip_all, fields(links = links.len()))]
pub fn link_triggers(graph: &mut Graph, links: &[TriggerLink]) -> Result<TriggerOutcome, GraphError> {
    let mut resolved: Vec<(NodeIndex, NodeIndex, &TriggerLink)> = Vec::with_capacity(links.len());
    let mut outcome = TriggerOutcome::default();
    {
        let resolver = IdResolver::new(graph);
        for link in links {
            let trigger = resolver.by_id(&link.trigger_id);
            let response = resolver.by_id_and_kind(&link.response_id, &link.event_kind);
            match (trigger, response) {
                (Some(from), Some(to)) => resolved.push((from, to, link)),
                _ => {
                    debug!(
                        trigger = %link.trigger_id,
                        response = %link.response_id,
                        trigger_found = trigger.is_some(),
                        response_found = response.is_some(),
                        "trigger link does not resolve to graph nodes"
                    );
                    outcome.unresolved += 1;
                }
            }
        }
    }

    for (from, to, link) in resolved {
        let strength = checked_strength(Stage::Explicit, link.confidence, &graph[from].key, &graph[to].key)?;
        let evidence = vec![format!(
            "logged {} trigger (confidence {:.2})",
            link.event_kind, link.confidence
        )];
        graph.insert_edge(from, to, Edge::new(strength, Relationship::Triggers, evidence));
        outcome.linked += 1;
    }

    debug!(linked = outcome.linked, unresolved = outcome.unresolved, "explicit stage complete");
    Ok(outcome)
}

/// Link every task's created node to its completed node with a certain
/// `causes` edge. Returns the number of edges written.
#[instrument(skip_all)]
pub fn link_task_lifecycles(graph: &mut Graph) -> usize {
    let pairs: Vec<(NodeIndex, NodeIndex, i64)> = graph
        .nodes()
        .filter(|(_, node)| node.kind() == EventKind::TaskCompleted)
        .filter_map(|(completed, node)| {
            let created = graph.node_index(&NodeKey::new(&node.key.event_id, EventKind::TaskCreated))?;
            let elapsed = (node.timestamp - graph[created].timestamp).num_seconds();
            Some((created, completed, elapsed))
        })
        .collect();

    for &(created, completed, elapsed) in &pairs {
        let evidence = vec![format!("task completed {elapsed}s after creation")];
        graph.insert_edge(created, completed, Edge::new(Strength::CERTAIN, Relationship::Causes, evidence));
    }

    debug!(linked = pairs.len(), "structural stage complete");
    pairs.len()
}
