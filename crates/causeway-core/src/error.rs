//! Error types shared across the engine.
//!
//! Three failure classes exist and are handled very differently:
//!
//! - [`SourceError`]: one record stream could not be read. The ingestor logs
//!   it, flags the graph as incomplete and carries on with the other streams.
//! - [`GraphError`]: an inference stage tried to write an edge whose strength
//!   lies outside `[0, 1]`. This aborts the build.
//! - Not-found: never an error. Queries against unknown nodes return empty
//!   results.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::infer::Stage;
use crate::model::EventKind;
use crate::source::SourceKind;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    SourceUnavailable,
    InvalidTimestamp,
    StrengthOutOfRange,
    InvalidWindow,
    InvalidConfig,
    UnknownEventKind,
    InvalidMetadata,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::SourceUnavailable => "E1001",
            Self::InvalidTimestamp => "E1002",
            Self::StrengthOutOfRange => "E2001",
            Self::InvalidWindow => "E3001",
            Self::InvalidConfig => "E3002",
            Self::UnknownEventKind => "E4001",
            Self::InvalidMetadata => "E4002",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::SourceUnavailable => Some("Check the record database path and schema (`cw init`)."),
            Self::InvalidTimestamp => Some("Timestamps are stored as UTC microseconds since the epoch."),
            Self::StrengthOutOfRange => {
                Some("An inference stage produced a bad strength. Report a bug with logs.")
            }
            Self::InvalidWindow => Some("Pass a --since that is strictly before --until."),
            Self::InvalidConfig => Some("Fix the value in .causeway/config.toml and retry."),
            Self::UnknownEventKind => {
                Some("Use message_user, message_assistant, message_system, message_tool, task_created or task_completed.")
            }
            Self::InvalidMetadata => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A record stream could not be read.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The stream reported itself unavailable.
    #[error("{source_kind} unavailable: {reason}")]
    Unavailable {
        source_kind: SourceKind,
        reason: String,
    },

    /// The backing SQLite database failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored timestamp could not be represented.
    #[error("invalid timestamp {value}: {reason}")]
    Timestamp { value: i64, reason: &'static str },
}

impl SourceError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable { .. } | Self::Sqlite(_) => ErrorCode::SourceUnavailable,
            Self::Timestamp { .. } => ErrorCode::InvalidTimestamp,
        }
    }
}

/// A strength value outside `[0.0, 1.0]` (or not finite).
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("strength {0} is outside [0.0, 1.0]")]
pub struct StrengthError(pub f64);

/// Graph invariant violations. These indicate a defect in an inference stage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("{stage} inference wrote an invalid edge {from} -> {to}: {error}")]
    StrengthOutOfRange {
        stage: Stage,
        from: String,
        to: String,
        #[source]
        error: StrengthError,
    },
}

impl GraphError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::StrengthOutOfRange { .. } => ErrorCode::StrengthOutOfRange,
        }
    }
}

/// An event kind or role string that does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {value:?}")]
pub struct ParseKindError {
    pub what: &'static str,
    pub value: String,
}

/// A known metadata key carries a value of the wrong JSON type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("metadata key `{key}` on {kind} must be {expected}")]
pub struct MetadataError {
    pub kind: EventKind,
    pub key: String,
    pub expected: &'static str,
}

/// Why a single input record was rejected at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Kind(#[from] ParseKindError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl RecordError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Kind(_) => ErrorCode::UnknownEventKind,
            Self::Metadata(_) => ErrorCode::InvalidMetadata,
        }
    }
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid config value for `{field}`: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

/// Build-level failures.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid time window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl EngineError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidWindow { .. } => ErrorCode::InvalidWindow,
            Self::Config(_) => ErrorCode::InvalidConfig,
            Self::Graph(inner) => inner.code(),
        }
    }
}
