use causeway_core::graph::{Edge, Graph, Node, Relationship, Strength};
use causeway_core::model::{ChatTurn, EventKind, NodeKey, TaskRecord};
use causeway_core::source::MemorySource;
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

pub const BASE_SECS: i64 = 1_700_000_000;

pub fn ts(offset: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_SECS + offset, 0).single().expect("valid ts")
}

pub fn arb_strength() -> impl Strategy<Value = f64> + Clone {
    0.0f64..=1.0
}

pub fn arb_relationship() -> impl Strategy<Value = Relationship> + Clone {
    prop_oneof![
        Just(Relationship::Triggers),
        Just(Relationship::Causes),
        Just(Relationship::Influences),
        Just(Relationship::Correlates),
    ]
}

/// Edge list over `0..nodes`, self loops and duplicates allowed (duplicates
/// overwrite).
pub fn arb_edges(nodes: usize) -> impl Strategy<Value = Vec<(usize, usize, f64, Relationship)>> {
    prop::collection::vec((0..nodes, 0..nodes, arb_strength(), arb_relationship()), 0..nodes * 3)
}

pub fn graph_from(nodes: usize, edges: &[(usize, usize, f64, Relationship)]) -> Graph {
    let mut g = Graph::new();
    let idx: Vec<_> = (0..nodes)
        .map(|i| {
            let offset = i64::try_from(i).expect("small");
            g.insert_node(Node::new(
                NodeKey::new(format!("n{i:03}"), EventKind::TaskCreated),
                ts(offset),
                "agent",
            ))
        })
        .collect();
    for &(from, to, strength, relationship) in edges {
        g.insert_edge(
            idx[from],
            idx[to],
            Edge::new(Strength::new(strength).expect("in range"), relationship, Vec::new()),
        );
    }
    g
}

#[derive(Debug, Clone)]
pub enum Record {
    Turn { role: &'static str, actor: u8, offset: i64 },
    Task { actor: u8, offset: i64, duration: Option<i64> },
}

pub fn arb_record() -> impl Strategy<Value = Record> {
    prop_oneof![
        (
            prop_oneof![Just("user"), Just("assistant"), Just("system"), Just("tool")],
            0u8..3,
            0i64..7200,
        )
            .prop_map(|(role, actor, offset)| Record::Turn { role, actor, offset }),
        (0u8..3, 0i64..7200, prop::option::of(1i64..3600))
            .prop_map(|(actor, offset, duration)| Record::Task { actor, offset, duration }),
    ]
}

pub fn source_from(records: &[Record]) -> MemorySource {
    records
        .iter()
        .enumerate()
        .fold(MemorySource::new(), |source, (i, record)| match *record {
            Record::Turn { role, actor, offset } => source.with_chat_turn(ChatTurn {
                id: format!("m{i}"),
                actor: format!("agent-{actor}"),
                role: role.to_string(),
                content: String::new(),
                created_at: ts(offset),
            }),
            Record::Task { actor, offset, duration } => source.with_task(TaskRecord {
                id: format!("t{i}"),
                actor: format!("agent-{actor}"),
                title: format!("task {i}"),
                description: None,
                status: "pending".to_string(),
                priority: None,
                auto_generated: false,
                created_at: ts(offset),
                completed_at: duration.map(|d| ts(offset + d)),
            }),
        })
}
