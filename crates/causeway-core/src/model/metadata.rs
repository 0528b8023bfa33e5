//! Per-kind node metadata.
//!
//! Metadata stays an open string-keyed JSON map because its shape differs per
//! [`EventKind`]. Known keys are type-checked here, at the ingestion
//! boundary, so downstream code can read them without re-validating. Unknown
//! keys pass through untouched.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::MetadataError;
use crate::model::EventKind;

/// Node metadata map. Ordered so exports are stable.
pub type Metadata = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy)]
enum Expected {
    String,
    OptionalString,
    Bool,
    Number,
}

impl Expected {
    const fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::OptionalString => "a string or null",
            Self::Bool => "a boolean",
            Self::Number => "a number",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::OptionalString => value.is_string() || value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::Number => value.is_number(),
        }
    }
}

const fn known_keys(kind: EventKind) -> &'static [(&'static str, Expected)] {
    match kind {
        EventKind::Message(_) => &[("content", Expected::String), ("role", Expected::String)],
        EventKind::TaskCreated => &[
            ("title", Expected::String),
            ("description", Expected::OptionalString),
            ("status", Expected::String),
            ("priority", Expected::OptionalString),
            ("auto_generated", Expected::Bool),
        ],
        EventKind::TaskCompleted => &[
            ("title", Expected::String),
            ("status", Expected::String),
            ("duration_secs", Expected::Number),
        ],
    }
}

/// Check every known key present in `metadata` against the type expected
/// for `kind`.
///
/// # Errors
///
/// Returns the first [`MetadataError`] found.
pub fn validate_metadata(kind: EventKind, metadata: &Metadata) -> Result<(), MetadataError> {
    for (key, expected) in known_keys(kind) {
        let Some(value) = metadata.get(*key) else {
            continue;
        };
        if !expected.accepts(value) {
            return Err(MetadataError {
                kind,
                key: (*key).to_string(),
                expected: expected.describe(),
            });
        }
    }
    Ok(())
}
