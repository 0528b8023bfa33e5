//! End-to-end build and query scenarios over in-memory sources.

use causeway_core::config::CausalConfig;
use causeway_core::engine::{BuildRequest, CausalEngine};
use causeway_core::error::{EngineError, GraphError};
use causeway_core::export::export_graph;
use causeway_core::graph::{Edge, Graph, Node, Relationship, Strength};
use causeway_core::infer::Stage;
use causeway_core::model::{ChatTurn, EventKind, NodeKey, Role, TaskRecord, TimeWindow, TriggerLink};
use causeway_core::query::{calculate_influence, detect_cycles, find_causes, find_effects, find_path};
use causeway_core::source::{MemorySource, SourceKind};
use chrono::{DateTime, TimeZone, Utc};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid ts")
}

fn day() -> BuildRequest {
    BuildRequest::new(TimeWindow::new(ts(-10), ts(86_400)).expect("window"))
}

fn turn(id: &str, role: &str, secs: i64) -> ChatTurn {
    ChatTurn {
        id: id.to_string(),
        actor: "agent-7".to_string(),
        role: role.to_string(),
        content: format!("turn {id}"),
        created_at: ts(secs),
    }
}

fn task(id: &str, created: i64, completed: Option<i64>) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        actor: "agent-7".to_string(),
        title: format!("task {id}"),
        description: None,
        status: (if completed.is_some() { "completed" } else { "pending" }).to_string(),
        priority: Some("high".to_string()),
        auto_generated: true,
        created_at: ts(created),
        completed_at: completed.map(ts),
    }
}

fn trigger(from: &str, to: &str, kind: &str, confidence: f64) -> TriggerLink {
    TriggerLink {
        trigger_id: from.to_string(),
        response_id: to.to_string(),
        event_kind: kind.to_string(),
        confidence,
        created_at: ts(30),
    }
}

fn user(id: &str) -> NodeKey {
    NodeKey::new(id, EventKind::Message(Role::User))
}

fn assistant(id: &str) -> NodeKey {
    NodeKey::new(id, EventKind::Message(Role::Assistant))
}

fn created(id: &str) -> NodeKey {
    NodeKey::new(id, EventKind::TaskCreated)
}

fn completed(id: &str) -> NodeKey {
    NodeKey::new(id, EventKind::TaskCompleted)
}

fn hand_built(edges: &[(&str, &str, f64)]) -> Graph {
    let mut g = Graph::new();
    for &(from, to, strength) in edges {
        let a = g.insert_node(Node::new(created(from), ts(0), "agent-7"));
        let b = g.insert_node(Node::new(created(to), ts(0), "agent-7"));
        g.insert_edge(
            a,
            b,
            Edge::new(Strength::new(strength).expect("valid"), Relationship::Correlates, Vec::new()),
        );
    }
    g
}

#[test]
fn explicit_trigger_and_temporal_influence() {
    let source = MemorySource::new()
        .with_chat_turn(turn("M1", "user", 0))
        .with_chat_turn(turn("R1", "assistant", 30))
        .with_task(task("T1", 300, None))
        .with_trigger_link(trigger("M1", "R1", "message_assistant", 0.9));

    let report = CausalEngine::default().build(&source, &day()).expect("build");
    let g = &report.graph;

    let explicit = g.edge_by_keys(&user("M1"), &assistant("R1")).expect("M1 → R1");
    assert_eq!(explicit.relationship, Relationship::Triggers);
    assert!((explicit.strength.get() - 0.9).abs() < f64::EPSILON);

    let temporal = g.edge_by_keys(&user("M1"), &created("T1")).expect("M1 → T1");
    assert_eq!(temporal.relationship, Relationship::Influences);
    assert!((temporal.strength.get() - 0.741).abs() < 1e-3);

    assert_eq!(report.inference.explicit_links, 1);
    assert_eq!(report.inference.temporal_links, 1);
    assert!(!g.is_incomplete());
}

#[test]
fn task_lifecycle_is_a_certain_cause() {
    let source = MemorySource::new().with_task(task("T1", 0, Some(3600)));
    let report = CausalEngine::default().build(&source, &day()).expect("build");

    let edge = report
        .graph
        .edge_by_keys(&created("T1"), &completed("T1"))
        .expect("created → completed");
    assert_eq!(edge.relationship, Relationship::Causes);
    assert_eq!(edge.strength, Strength::CERTAIN);
    assert!(detect_cycles(&report.graph).is_empty());
    assert_eq!(report.inference.structural_links, 1);

    let causes = find_causes(&report.graph, &completed("T1"), 3);
    assert_eq!(causes.len(), 1);
    assert_eq!(causes[0].event, created("T1"));
    assert_eq!(causes[0].depth, 1);
}

#[test]
fn three_cycle_detected_once() {
    let g = hand_built(&[("A", "B", 0.8), ("B", "C", 0.6), ("C", "A", 0.4)]);
    let loops = detect_cycles(&g);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].nodes.len(), 3);
    assert_eq!(loops[0].edges.len(), 3);
    assert!((loops[0].min_strength - 0.4).abs() < 1e-9);
}

#[test]
fn pruning_removes_only_weaker_edges() {
    let mut g = hand_built(&[("A", "B", 0.3), ("A", "C", 0.6), ("A", "D", 0.9)]);
    assert_eq!(g.prune_weak_edges(0.5), 1);
    assert_eq!(g.edge_count(), 2);
    assert!(g.edge_by_keys(&created("A"), &created("B")).is_none());
    assert!(g.is_consistent());
    assert_eq!(find_effects(&g, &created("A"), 3).len(), 2);
    assert!(find_causes(&g, &created("B"), 3).is_empty());
}

#[test]
fn node_without_incoming_edges_has_no_causes() {
    let source = MemorySource::new()
        .with_chat_turn(turn("M1", "user", 0))
        .with_task(task("T1", 60, None));
    let report = CausalEngine::default().build(&source, &day()).expect("build");

    assert!(find_causes(&report.graph, &user("M1"), 3).is_empty());
    assert!(find_causes(&report.graph, &user("nope"), 3).is_empty());
    assert!(calculate_influence(&report.graph, &user("M1")) > 0.0);
}

#[test]
fn path_follows_edge_direction() {
    let source = MemorySource::new()
        .with_chat_turn(turn("M1", "user", 0))
        .with_task(task("T1", 60, Some(120)));
    // Keep pattern mining from adding a direct M1 → completed shortcut.
    let mut config = CausalConfig::default();
    config.pattern.materialize_rate = 1.0;
    let report = CausalEngine::new(config)
        .expect("valid config")
        .build(&source, &day())
        .expect("build");
    let g = &report.graph;

    let path = find_path(g, &user("M1"), &completed("T1")).expect("reachable");
    let hops: Vec<Relationship> = path.iter().map(|h| h.relationship).collect();
    assert_eq!(hops, [Relationship::Influences, Relationship::Causes]);
    assert!(find_path(g, &completed("T1"), &user("M1")).is_none());
    assert_eq!(find_path(g, &user("M1"), &user("M1")), Some(Vec::new()));
}

#[test]
fn unavailable_stream_yields_flagged_partial_graph() {
    let source = MemorySource::new()
        .with_chat_turn(turn("M1", "user", 0))
        .with_task(task("T1", 60, None))
        .with_trigger_link(trigger("M1", "T1", "task_created", 0.9))
        .failing(SourceKind::TriggerLinks, "link table missing");

    let report = CausalEngine::default().build(&source, &day()).expect("build");
    assert!(report.graph.is_incomplete());
    assert_eq!(report.graph.node_count(), 2);
    assert_eq!(report.inference.explicit_links, 0);

    let export = export_graph(&report.graph);
    assert_eq!(export.unavailable_sources.len(), 1);
    assert_eq!(export.unavailable_sources[0].source, SourceKind::TriggerLinks);
}

#[test]
fn out_of_range_confidence_aborts_build() {
    let source = MemorySource::new()
        .with_chat_turn(turn("M1", "user", 0))
        .with_chat_turn(turn("R1", "assistant", 5))
        .with_trigger_link(trigger("M1", "R1", "message_assistant", 1.01));

    let err = CausalEngine::default().build(&source, &day()).expect_err("must fail");
    assert!(matches!(err, EngineError::Graph(GraphError::StrengthOutOfRange { .. })));
}

#[test]
fn explicit_link_beats_inferred_edge_on_same_pair() {
    let source = MemorySource::new()
        .with_chat_turn(turn("M1", "user", 0))
        .with_task(task("T1", 10, None))
        .with_trigger_link(trigger("M1", "T1", "task_created", 0.35));
    let report = CausalEngine::default().build(&source, &day()).expect("build");

    let edge = report
        .graph
        .edge_by_keys(&user("M1"), &created("T1"))
        .expect("edge");
    assert_eq!(edge.relationship, Relationship::Triggers);
    assert!((edge.strength.get() - 0.35).abs() < f64::EPSILON);
    assert_eq!(report.inference.temporal_links, 0);
}

#[test]
fn steady_workload_keeps_edge_strengths_in_unit_interval() {
    // Each round is message, reply, task created, task completed, so every
    // kind appears at most once in any four-event lookahead.
    let mut source = MemorySource::new();
    for i in 0..20 {
        source = source
            .with_chat_turn(turn(&format!("M{i}"), "user", i * 90))
            .with_chat_turn(turn(&format!("R{i}"), "assistant", i * 90 + 5))
            .with_task(task(&format!("T{i}"), i * 90 + 40, Some(i * 90 + 60)));
    }
    let report = CausalEngine::default().build(&source, &day()).expect("build");

    assert!(report.graph.edge_count() > 0);
    assert!(
        report
            .graph
            .edges()
            .all(|(_, _, e)| (0.0..=1.0).contains(&e.strength.get()))
    );
    assert!(report.inference.candidates.iter().all(|c| c.rate <= 1.0));
    assert!(report.inference.pattern_links > 0);
    assert!(report.graph.is_consistent());
}

#[test]
fn burst_of_one_kind_fails_the_pattern_stage() {
    // Four replies in a row: 3 + 2 + 1 + 0 follow-ups over 4 replies.
    let source = MemorySource::new()
        .with_chat_turn(turn("R1", "assistant", 0))
        .with_chat_turn(turn("R2", "assistant", 10))
        .with_chat_turn(turn("R3", "assistant", 20))
        .with_chat_turn(turn("R4", "assistant", 30));

    let err = CausalEngine::default().build(&source, &day()).expect_err("rate 1.5");
    assert!(matches!(
        err,
        EngineError::Graph(GraphError::StrengthOutOfRange { stage: Stage::Pattern, .. })
    ));
}
