//! Raw input records and the time window they are fetched over.
//!
//! These mirror the shapes produced by the storage layers upstream of the
//! engine. They are deliberately loose (roles and link kinds are plain
//! strings); validation happens once, at ingestion.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Half-open interval `[start, end)` over record creation times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWindow`] unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EngineError> {
        if start >= end {
            return Err(EngineError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The window of length `span` ending at `end`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWindow`] if `span` is not positive.
    pub fn trailing(span: Duration, end: DateTime<Utc>) -> Result<Self, EngineError> {
        Self::new(end - span, end)
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// One user/assistant/system turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: String,
    pub actor: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A task with its lifecycle timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub actor: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub auto_generated: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// An explicitly logged "this caused that" pair.
///
/// `confidence` is expected in `[0, 1]`; the upstream logger normalizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerLink {
    pub trigger_id: String,
    pub response_id: String,
    pub event_kind: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// All three record streams in one serializable bundle, used for imports and
/// in-memory sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordBundle {
    pub chat_turns: Vec<ChatTurn>,
    pub tasks: Vec<TaskRecord>,
    pub trigger_links: Vec<TriggerLink>,
}
