//! Record sources feeding the ingestor.
//!
//! A [`RecordSource`] exposes the three input streams as independent fetches
//! over a [`TimeWindow`]. The ingestor calls them concurrently, so sources
//! must be `Sync`; each fetch stands alone and one failing fetch says nothing
//! about the other two.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemorySource`]: in-process vectors, with optional per-stream failure
//!   injection. Used by tests and by callers that already hold the records.
//! - [`sqlite::SqliteSource`]: reads the three record tables from a SQLite
//!   database.

pub mod sqlite;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::model::{ChatTurn, RecordBundle, TaskRecord, TimeWindow, TriggerLink};

pub use sqlite::SqliteSource;

/// The three input streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ChatTurns,
    Tasks,
    TriggerLinks,
}

impl SourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatTurns => "chat_turns",
            Self::Tasks => "tasks",
            Self::TriggerLinks => "trigger_links",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to the three record streams.
///
/// Each method returns the records whose `created_at` falls in `window`,
/// ordered by `created_at`. `actor` restricts chat turns and tasks to one
/// owner; trigger links carry no actor and are never filtered by it.
pub trait RecordSource: Sync {
    /// # Errors
    ///
    /// Returns [`SourceError`] if the stream cannot be read.
    fn chat_turns(&self, window: &TimeWindow, actor: Option<&str>) -> Result<Vec<ChatTurn>, SourceError>;

    /// # Errors
    ///
    /// Returns [`SourceError`] if the stream cannot be read.
    fn tasks(&self, window: &TimeWindow, actor: Option<&str>) -> Result<Vec<TaskRecord>, SourceError>;

    /// # Errors
    ///
    /// Returns [`SourceError`] if the stream cannot be read.
    fn trigger_links(&self, window: &TimeWindow) -> Result<Vec<TriggerLink>, SourceError>;
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// In-memory [`RecordSource`].
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: RecordBundle,
    failures: HashMap<SourceKind, String>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_chat_turn(mut self, turn: ChatTurn) -> Self {
        self.records.chat_turns.push(turn);
        self
    }

    #[must_use]
    pub fn with_task(mut self, task: TaskRecord) -> Self {
        self.records.tasks.push(task);
        self
    }

    #[must_use]
    pub fn with_trigger_link(mut self, link: TriggerLink) -> Self {
        self.records.trigger_links.push(link);
        self
    }

    /// Make every fetch of `kind` fail with `reason`.
    #[must_use]
    pub fn failing(mut self, kind: SourceKind, reason: impl Into<String>) -> Self {
        self.failures.insert(kind, reason.into());
        self
    }

    fn check(&self, kind: SourceKind) -> Result<(), SourceError> {
        match self.failures.get(&kind) {
            Some(reason) => Err(SourceError::Unavailable {
                source_kind: kind,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl From<RecordBundle> for MemorySource {
    fn from(records: RecordBundle) -> Self {
        Self {
            records,
            failures: HashMap::new(),
        }
    }
}

fn owned_by(record_actor: &str, actor: Option<&str>) -> bool {
    actor.is_none_or(|wanted| wanted == record_actor)
}

impl RecordSource for MemorySource {
    fn chat_turns(&self, window: &TimeWindow, actor: Option<&str>) -> Result<Vec<ChatTurn>, SourceError> {
        self.check(SourceKind::ChatTurns)?;
        let mut turns: Vec<ChatTurn> = self
            .records
            .chat_turns
            .iter()
            .filter(|t| window.contains(t.created_at) && owned_by(&t.actor, actor))
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.created_at);
        Ok(turns)
    }

    fn tasks(&self, window: &TimeWindow, actor: Option<&str>) -> Result<Vec<TaskRecord>, SourceError> {
        self.check(SourceKind::Tasks)?;
        let mut tasks: Vec<TaskRecord> = self
            .records
            .tasks
            .iter()
            .filter(|t| window.contains(t.created_at) && owned_by(&t.actor, actor))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    fn trigger_links(&self, window: &TimeWindow) -> Result<Vec<TriggerLink>, SourceError> {
        self.check(SourceKind::TriggerLinks)?;
        let mut links: Vec<TriggerLink> = self
            .records
            .trigger_links
            .iter()
            .filter(|l| window.contains(l.created_at))
            .cloned()
            .collect();
        links.sort_by_key(|l| l.created_at);
        Ok(links)
    }
}
