//! SQLite-backed record source.
//!
//! # Schema
//!
//! Three tables, one per stream. Timestamps are UTC microseconds since the
//! epoch (`*_at_us` columns) so window filters are plain integer range scans.
//!
//! ```sql
//! chat_turns    (id, actor, role, content, created_at_us)
//! tasks         (id, actor, title, description, status, priority,
//!                auto_generated, created_at_us, completed_at_us)
//! trigger_links (id, trigger_id, response_id, event_kind, confidence,
//!                created_at_us)
//! ```
//!
//! # Connections
//!
//! [`SqliteSource`] holds only the database path. Every fetch opens its own
//! read-only connection, so the ingestor can run the three fetches on
//! separate threads without sharing a `Connection`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row, params, types::Type};
use tracing::instrument;

use crate::error::SourceError;
use crate::model::{ChatTurn, RecordBundle, TaskRecord, TimeWindow, TriggerLink};
use crate::source::RecordSource;

/// Busy timeout used for record DB connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

const MIGRATION_V1_SQL: &str = "
CREATE TABLE IF NOT EXISTS chat_turns (
    id            TEXT PRIMARY KEY,
    actor         TEXT NOT NULL,
    role          TEXT NOT NULL,
    content       TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_turns_created ON chat_turns (created_at_us);
CREATE INDEX IF NOT EXISTS idx_chat_turns_actor ON chat_turns (actor, created_at_us);

CREATE TABLE IF NOT EXISTS tasks (
    id              TEXT PRIMARY KEY,
    actor           TEXT NOT NULL,
    title           TEXT NOT NULL,
    description     TEXT,
    status          TEXT NOT NULL,
    priority        TEXT,
    auto_generated  INTEGER NOT NULL DEFAULT 0,
    created_at_us   INTEGER NOT NULL,
    completed_at_us INTEGER
);
CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks (created_at_us);
CREATE INDEX IF NOT EXISTS idx_tasks_actor ON tasks (actor, created_at_us);

CREATE TABLE IF NOT EXISTS trigger_links (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    trigger_id    TEXT NOT NULL,
    response_id   TEXT NOT NULL,
    event_kind    TEXT NOT NULL,
    confidence    REAL NOT NULL,
    created_at_us INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trigger_links_created ON trigger_links (created_at_us);
";

const MIGRATIONS: &[(u32, &str)] = &[(1, MIGRATION_V1_SQL)];

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

/// Read `PRAGMA user_version` and convert it to a Rust `u32`.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the version value cannot be
/// represented as `u32`.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Apply all pending migrations in ascending order.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.commit()?;
        current = *version;
    }

    Ok(current)
}

/// Open (or create) a writable record database and migrate it to the latest
/// schema.
///
/// # Errors
///
/// Returns an error if opening, configuring or migrating the database fails.
pub fn open_records_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create record db directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open record database {}", path.display()))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
        .context("configure busy timeout")?;
    migrate(&mut conn).context("apply record db migrations")?;
    Ok(conn)
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Insert or replace one chat turn.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_chat_turn(conn: &Connection, turn: &ChatTurn) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO chat_turns (id, actor, role, content, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            turn.id,
            turn.actor,
            turn.role,
            turn.content,
            turn.created_at.timestamp_micros()
        ],
    )?;
    Ok(())
}

/// Insert or replace one task.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_task(conn: &Connection, task: &TaskRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO tasks
            (id, actor, title, description, status, priority, auto_generated,
             created_at_us, completed_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            task.id,
            task.actor,
            task.title,
            task.description,
            task.status,
            task.priority,
            task.auto_generated,
            task.created_at.timestamp_micros(),
            task.completed_at.map(|ts| ts.timestamp_micros()),
        ],
    )?;
    Ok(())
}

/// Append one trigger link.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_trigger_link(conn: &Connection, link: &TriggerLink) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO trigger_links (trigger_id, response_id, event_kind, confidence, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            link.trigger_id,
            link.response_id,
            link.event_kind,
            link.confidence,
            link.created_at.timestamp_micros()
        ],
    )?;
    Ok(())
}

/// Write every record of `bundle` in one transaction.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns an error if any insert fails; nothing is committed in that case.
pub fn import_bundle(conn: &mut Connection, bundle: &RecordBundle) -> Result<usize> {
    let tx = conn.transaction().context("begin import transaction")?;
    for turn in &bundle.chat_turns {
        insert_chat_turn(&tx, turn).with_context(|| format!("insert chat turn {}", turn.id))?;
    }
    for task in &bundle.tasks {
        insert_task(&tx, task).with_context(|| format!("insert task {}", task.id))?;
    }
    for link in &bundle.trigger_links {
        insert_trigger_link(&tx, link).with_context(|| {
            format!("insert trigger link {} -> {}", link.trigger_id, link.response_id)
        })?;
    }
    tx.commit().context("commit import")?;
    Ok(bundle.chat_turns.len() + bundle.tasks.len() + bundle.trigger_links.len())
}

// ---------------------------------------------------------------------------
// SqliteSource
// ---------------------------------------------------------------------------

/// [`RecordSource`] reading from a record database on disk.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, SourceError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

fn timestamp(micros: i64) -> Result<DateTime<Utc>, SourceError> {
    DateTime::<Utc>::from_timestamp_micros(micros).ok_or(SourceError::Timestamp {
        value: micros,
        reason: "out of range for a UTC timestamp",
    })
}

/// Row shapes before timestamp conversion; conversion errors are ours, not
/// SQLite's, so they are mapped outside the row closure.
struct RawTurn(ChatTurn, i64);
struct RawTask(TaskRecord, i64, Option<i64>);
struct RawLink(TriggerLink, i64);

fn raw_turn(row: &Row<'_>) -> rusqlite::Result<RawTurn> {
    Ok(RawTurn(
        ChatTurn {
            id: row.get(0)?,
            actor: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            created_at: DateTime::default(),
        },
        row.get(4)?,
    ))
}

fn raw_task(row: &Row<'_>) -> rusqlite::Result<RawTask> {
    Ok(RawTask(
        TaskRecord {
            id: row.get(0)?,
            actor: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            status: row.get(4)?,
            priority: row.get(5)?,
            auto_generated: row.get(6)?,
            created_at: DateTime::default(),
            completed_at: None,
        },
        row.get(7)?,
        row.get(8)?,
    ))
}

fn raw_link(row: &Row<'_>) -> rusqlite::Result<RawLink> {
    Ok(RawLink(
        TriggerLink {
            trigger_id: row.get(0)?,
            response_id: row.get(1)?,
            event_kind: row.get(2)?,
            confidence: row.get(3)?,
            created_at: DateTime::default(),
        },
        row.get(4)?,
    ))
}

impl RecordSource for SqliteSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn chat_turns(&self, window: &TimeWindow, actor: Option<&str>) -> Result<Vec<ChatTurn>, SourceError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, actor, role, content, created_at_us
             FROM chat_turns
             WHERE created_at_us >= ?1 AND created_at_us < ?2
               AND (?3 IS NULL OR actor = ?3)
             ORDER BY created_at_us, id",
        )?;
        let rows = stmt
            .query_map(
                params![window.start().timestamp_micros(), window.end().timestamp_micros(), actor],
                raw_turn,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|RawTurn(mut turn, created)| {
                turn.created_at = timestamp(created)?;
                Ok(turn)
            })
            .collect()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn tasks(&self, window: &TimeWindow, actor: Option<&str>) -> Result<Vec<TaskRecord>, SourceError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, actor, title, description, status, priority, auto_generated,
                    created_at_us, completed_at_us
             FROM tasks
             WHERE created_at_us >= ?1 AND created_at_us < ?2
               AND (?3 IS NULL OR actor = ?3)
             ORDER BY created_at_us, id",
        )?;
        let rows = stmt
            .query_map(
                params![window.start().timestamp_micros(), window.end().timestamp_micros(), actor],
                raw_task,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|RawTask(mut task, created, completed)| {
                task.created_at = timestamp(created)?;
                task.completed_at = completed.map(timestamp).transpose()?;
                Ok(task)
            })
            .collect()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn trigger_links(&self, window: &TimeWindow) -> Result<Vec<TriggerLink>, SourceError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT trigger_id, response_id, event_kind, confidence, created_at_us
             FROM trigger_links
             WHERE created_at_us >= ?1 AND created_at_us < ?2
             ORDER BY created_at_us, id",
        )?;
        let rows = stmt
            .query_map(
                params![window.start().timestamp_micros(), window.end().timestamp_micros()],
                raw_link,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|RawLink(mut link, created)| {
                link.created_at = timestamp(created)?;
                Ok(link)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
