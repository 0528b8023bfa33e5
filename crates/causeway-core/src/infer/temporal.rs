//! Temporal proximity: a user message shortly before a task creation by the
//! same actor probably prompted it.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{Stage, checked_strength};
use crate::config::TemporalConfig;
use crate::error::GraphError;
use crate::graph::{Edge, Graph, NodeIndex, Relationship};
use crate::model::EventKind;

/// Strength for a task created `elapsed_secs` after a user message:
/// `exp(-decay_rate * elapsed)`, bounded to `[min_strength, max_strength]`.
///
/// Non-increasing in `elapsed_secs`.
#[must_use]
pub fn temporal_strength(elapsed_secs: f64, config: &TemporalConfig) -> f64 {
    let raw = (-config.decay_rate * elapsed_secs.max(0.0)).exp();
    raw.max(config.min_strength).min(config.max_strength)
}

#[allow(clippy::cast_precision_loss)]
fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Link user messages to the task creations that follow them within the
/// window. Existing pairs are left alone. Returns the number of edges added.
///
/// # Errors
///
/// Returns [`GraphError::StrengthOutOfRange`] if the configured bounds
/// produce a strength outside `[0, 1]`.
#[instrument(skip_all, fields(window_secs = config.window_secs))]
pub fn infer(graph: &mut Graph, config: &TemporalConfig) -> Result<usize, GraphError> {
    let order = graph.chronological();
    #[allow(clippy::cast_precision_loss)]
    let window = config.window_secs as f64;

    let mut candidates: Vec<(NodeIndex, NodeIndex, f64)> = Vec::new();
    for (pos, &msg) in order.iter().enumerate() {
        let source = &graph[msg];
        if !source.kind().is_user_message() {
            continue;
        }
        for &later in &order[pos + 1..] {
            let target = &graph[later];
            let elapsed = elapsed_secs(source.timestamp, target.timestamp);
            if elapsed > window {
                break;
            }
            if target.actor == source.actor && target.kind() == EventKind::TaskCreated {
                candidates.push((msg, later, elapsed));
            }
        }
    }

    let mut linked = 0;
    for (from, to, elapsed) in candidates {
        if graph.has_edge(from, to) {
            continue;
        }
        let strength = checked_strength(
            Stage::Temporal,
            temporal_strength(elapsed, config),
            &graph[from].key,
            &graph[to].key,
        )?;
        let evidence = vec![format!("user message preceded task creation by {elapsed:.0}s")];
        graph.insert_edge_if_absent(from, to, Edge::new(strength, Relationship::Influences, evidence));
        linked += 1;
    }

    debug!(linked, "temporal stage complete");
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Strength};
    use crate::model::{NodeKey, Role};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid ts")
    }

    fn add(g: &mut Graph, id: &str, kind: EventKind, actor: &str, secs: i64) -> NodeIndex {
        g.insert_node(Node::new(NodeKey::new(id, kind), ts(secs), actor))
    }

    #[test]
    fn strength_decays_and_is_bounded() {
        let config = TemporalConfig::default();
        assert!((temporal_strength(0.0, &config) - 0.9).abs() < 1e-12);
        assert!((temporal_strength(300.0, &config) - (-0.3f64).exp()).abs() < 1e-12);
        assert!((temporal_strength(1e6, &config) - 0.1).abs() < 1e-12);
        assert!(temporal_strength(100.0, &config) >= temporal_strength(200.0, &config));
    }

    #[test]
    fn links_message_to_task_within_window() {
        let mut g = Graph::new();
        let m1 = add(&mut g, "M1", EventKind::Message(Role::User), "a", 0);
        let t1 = add(&mut g, "T1", EventKind::TaskCreated, "a", 300);

        assert_eq!(infer(&mut g, &TemporalConfig::default()).expect("valid"), 1);
        let edge = g.edge(m1, t1).expect("edge");
        assert_eq!(edge.relationship, Relationship::Influences);
        assert!((edge.strength.get() - 0.740_818).abs() < 1e-3);
        assert_eq!(edge.evidence[0], "user message preceded task creation by 300s");
    }

    #[test]
    fn window_is_inclusive_and_stops_scan() {
        let mut g = Graph::new();
        let m1 = add(&mut g, "M1", EventKind::Message(Role::User), "a", 0);
        let edge_of_window = add(&mut g, "T1", EventKind::TaskCreated, "a", 600);
        let beyond = add(&mut g, "T2", EventKind::TaskCreated, "a", 601);

        infer(&mut g, &TemporalConfig::default()).expect("valid");
        assert!(g.has_edge(m1, edge_of_window));
        assert!(!g.has_edge(m1, beyond));
    }

    #[test]
    fn other_actors_and_kinds_are_ignored() {
        let mut g = Graph::new();
        add(&mut g, "M1", EventKind::Message(Role::User), "a", 0);
        add(&mut g, "T1", EventKind::TaskCreated, "b", 10);
        add(&mut g, "R1", EventKind::Message(Role::Assistant), "a", 20);
        add(&mut g, "A1", EventKind::Message(Role::Assistant), "a", 30);

        assert_eq!(infer(&mut g, &TemporalConfig::default()).expect("valid"), 0);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn assistant_messages_do_not_start_scans() {
        let mut g = Graph::new();
        add(&mut g, "R1", EventKind::Message(Role::Assistant), "a", 0);
        add(&mut g, "T1", EventKind::TaskCreated, "a", 10);
        assert_eq!(infer(&mut g, &TemporalConfig::default()).expect("valid"), 0);
    }

    #[test]
    fn existing_edge_is_kept() {
        let mut g = Graph::new();
        let m1 = add(&mut g, "M1", EventKind::Message(Role::User), "a", 0);
        let t1 = add(&mut g, "T1", EventKind::TaskCreated, "a", 60);
        let explicit = Edge::new(
            Strength::new(0.95).expect("valid"),
            Relationship::Triggers,
            Vec::new(),
        );
        g.insert_edge(m1, t1, explicit.clone());

        assert_eq!(infer(&mut g, &TemporalConfig::default()).expect("valid"), 0);
        assert_eq!(g.edge(m1, t1), Some(&explicit));
    }

    #[test]
    fn invalid_bounds_abort() {
        let mut g = Graph::new();
        add(&mut g, "M1", EventKind::Message(Role::User), "a", 0);
        add(&mut g, "T1", EventKind::TaskCreated, "a", 60);
        let config = TemporalConfig {
            min_strength: 1.2,
            max_strength: 1.5,
            ..TemporalConfig::default()
        };
        assert!(infer(&mut g, &config).is_err());
    }
}
