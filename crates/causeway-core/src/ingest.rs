//! Event ingestion: record streams → graph nodes.
//!
//! # Overview
//!
//! The three streams are fetched concurrently on scoped threads and joined
//! before any node is written. Each stream fails independently: a failed
//! fetch is logged, recorded on the graph via [`Graph::mark_unavailable`],
//! and the build continues with whatever the other streams returned.
//!
//! ## Node mapping
//!
//! - chat turn → `message_<role>` node keyed by the turn id
//! - task → `task_created` node at `created_at`, plus a `task_completed`
//!   node at `completed_at` when the task has one (same id, distinct kind)
//!
//! Trigger links do not become nodes. They are returned to the caller for
//! the explicit link builder.

use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::engine::BuildRequest;
use crate::error::{RecordError, SourceError};
use crate::graph::{Graph, Node};
use crate::model::{ChatTurn, EventKind, Metadata, NodeKey, Role, TaskRecord, TriggerLink};
use crate::source::{RecordSource, SourceKind};

/// Counters describing one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Chat turns fetched.
    pub chat_turns: usize,
    /// Tasks fetched.
    pub tasks: usize,
    /// Trigger links fetched.
    pub trigger_links: usize,
    /// Node writes performed (including identity overwrites).
    pub nodes_inserted: usize,
    /// Records skipped because they failed validation.
    pub rejected_records: usize,
}

/// Output of [`ingest`]: the report and the trigger links for the explicit
/// link builder.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub report: IngestReport,
    pub trigger_links: Vec<TriggerLink>,
}

/// Fetch all three streams for `request` and write their nodes into `graph`.
#[instrument(
    skip(source, graph),
    fields(start = %request.window.start(), end = %request.window.end(), actor = ?request.actor)
)]
pub fn ingest<S>(source: &S, request: &BuildRequest, graph: &mut Graph) -> Ingested
where
    S: RecordSource + ?Sized,
{
    let window = &request.window;
    let actor = request.actor.as_deref();

    let (turns, tasks, links) = thread::scope(|scope| {
        let turns = scope.spawn(|| source.chat_turns(window, actor));
        let tasks = scope.spawn(|| source.tasks(window, actor));
        let links = scope.spawn(|| source.trigger_links(window));
        (
            settle(SourceKind::ChatTurns, turns.join()),
            settle(SourceKind::Tasks, tasks.join()),
            settle(SourceKind::TriggerLinks, links.join()),
        )
    });

    let turns = accept(graph, SourceKind::ChatTurns, turns);
    let tasks = accept(graph, SourceKind::Tasks, tasks);
    let trigger_links = accept(graph, SourceKind::TriggerLinks, links);

    let mut report = IngestReport {
        chat_turns: turns.len(),
        tasks: tasks.len(),
        trigger_links: trigger_links.len(),
        ..IngestReport::default()
    };

    for turn in &turns {
        match message_node(turn) {
            Ok(node) => {
                graph.insert_node(node);
                report.nodes_inserted += 1;
            }
            Err(error) => reject(&mut report, SourceKind::ChatTurns, &turn.id, &error),
        }
    }

    for task in &tasks {
        match task_nodes(task) {
            Ok(nodes) => {
                for node in nodes {
                    graph.insert_node(node);
                    report.nodes_inserted += 1;
                }
            }
            Err(error) => reject(&mut report, SourceKind::Tasks, &task.id, &error),
        }
    }

    debug!(
        nodes = graph.node_count(),
        written = report.nodes_inserted,
        rejected = report.rejected_records,
        incomplete = graph.is_incomplete(),
        "ingestion complete"
    );

    Ingested {
        report,
        trigger_links,
    }
}

/// Collapse a panicked fetch thread into a source error for that stream.
fn settle<T>(
    kind: SourceKind,
    joined: thread::Result<Result<Vec<T>, SourceError>>,
) -> Result<Vec<T>, SourceError> {
    joined.unwrap_or_else(|_| {
        Err(SourceError::Unavailable {
            source_kind: kind,
            reason: "fetch thread panicked".to_string(),
        })
    })
}

fn accept<T>(graph: &mut Graph, kind: SourceKind, fetched: Result<Vec<T>, SourceError>) -> Vec<T> {
    match fetched {
        Ok(records) => records,
        Err(error) => {
            warn!(
                source = %kind,
                code = %error.code(),
                error = %error,
                "record source unavailable, continuing with partial data"
            );
            graph.mark_unavailable(kind, error.to_string());
            Vec::new()
        }
    }
}

fn reject(report: &mut IngestReport, kind: SourceKind, id: &str, error: &RecordError) {
    warn!(source = %kind, id, code = %error.code(), error = %error, "rejected record");
    report.rejected_records += 1;
}

fn entry(key: &str, value: Value) -> (String, Value) {
    (key.to_string(), value)
}

/// Map a chat turn to its `message_<role>` node.
///
/// # Errors
///
/// Returns [`RecordError`] if the role is unknown.
pub fn message_node(turn: &ChatTurn) -> Result<Node, RecordError> {
    let role: Role = turn.role.parse()?;
    let metadata: Metadata = [
        entry("content", json!(turn.content)),
        entry("role", json!(role.as_str())),
    ]
    .into_iter()
    .collect();

    Node::new(
        NodeKey::new(&turn.id, EventKind::Message(role)),
        turn.created_at,
        &turn.actor,
    )
    .with_metadata(metadata)
}

/// Map a task to its `task_created` node and, if completed, its
/// `task_completed` node.
///
/// # Errors
///
/// Returns [`RecordError`] if the generated metadata fails validation.
pub fn task_nodes(task: &TaskRecord) -> Result<Vec<Node>, RecordError> {
    let created_meta: Metadata = [
        entry("title", json!(task.title)),
        entry("description", json!(task.description)),
        entry("status", json!(task.status)),
        entry("priority", json!(task.priority)),
        entry("auto_generated", json!(task.auto_generated)),
    ]
    .into_iter()
    .collect();

    let created = Node::new(
        NodeKey::new(&task.id, EventKind::TaskCreated),
        task.created_at,
        &task.actor,
    )
    .with_metadata(created_meta)?;

    let Some(completed_at) = task.completed_at else {
        return Ok(vec![created]);
    };

    let completed_meta: Metadata = [
        entry("title", json!(task.title)),
        entry("status", json!(task.status)),
        entry("duration_secs", json!(duration_secs(task.created_at, completed_at))),
    ]
    .into_iter()
    .collect();

    let completed = Node::new(
        NodeKey::new(&task.id, EventKind::TaskCompleted),
        completed_at,
        &task.actor,
    )
    .with_metadata(completed_meta)?;

    Ok(vec![created, completed])
}

fn duration_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds()
}
