//! Event kinds and node identity.
//!
//! Every node in the causal graph is identified by a [`NodeKey`]: the
//! originating record's id paired with its [`EventKind`]. A task therefore
//! contributes two distinct nodes (`task_created` and `task_completed`) that
//! share one `event_id`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseKindError;

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    /// Tool or function output fed back into the conversation.
    Tool,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            "tool" => Ok(Self::Tool),
            _ => Err(ParseKindError {
                what: "role",
                value: s.to_string(),
            }),
        }
    }
}

/// The closed set of event kinds a node can carry.
///
/// Serialized as its canonical string (`message_user`, `task_created`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventKind {
    Message(Role),
    TaskCreated,
    TaskCompleted,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message(Role::User) => "message_user",
            Self::Message(Role::Assistant) => "message_assistant",
            Self::Message(Role::System) => "message_system",
            Self::Message(Role::Tool) => "message_tool",
            Self::TaskCreated => "task_created",
            Self::TaskCompleted => "task_completed",
        }
    }

    /// True for `message_user`, the only kind the temporal inferrer scans from.
    #[must_use]
    pub const fn is_user_message(self) -> bool {
        matches!(self, Self::Message(Role::User))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(role) = trimmed.strip_prefix("message_") {
            return role
                .parse::<Role>()
                .map(Self::Message)
                .map_err(|_| ParseKindError {
                    what: "event kind",
                    value: s.to_string(),
                });
        }
        match trimmed {
            "task_created" => Ok(Self::TaskCreated),
            "task_completed" => Ok(Self::TaskCompleted),
            _ => Err(ParseKindError {
                what: "event kind",
                value: s.to_string(),
            }),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for EventKind {
    type Error = ParseKindError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Identity of a node: `(event_id, kind)`.
///
/// Equality, ordering and hashing use both fields and nothing else. The
/// textual form is `<kind>:<event_id>`, e.g. `task_created:T1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub event_id: String,
    pub kind: EventKind,
}

impl NodeKey {
    #[must_use]
    pub fn new(event_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            event_id: event_id.into(),
            kind,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.event_id)
    }
}

impl FromStr for NodeKey {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((kind, event_id)) = s.split_once(':') else {
            return Err(ParseKindError {
                what: "node key (expected <kind>:<event_id>)",
                value: s.to_string(),
            });
        };
        if event_id.is_empty() {
            return Err(ParseKindError {
                what: "node key (empty event id)",
                value: s.to_string(),
            });
        }
        Ok(Self::new(event_id, kind.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_canonical_string() {
        for kind in [
            EventKind::Message(Role::User),
            EventKind::Message(Role::Assistant),
            EventKind::Message(Role::System),
            EventKind::Message(Role::Tool),
            EventKind::TaskCreated,
            EventKind::TaskCompleted,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("message_robot".parse::<EventKind>().is_err());
        assert!("task_started".parse::<EventKind>().is_err());
        assert!("".parse::<EventKind>().is_err());
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!("Assistant".parse::<Role>(), Ok(Role::Assistant));
        assert_eq!(" TOOL ".parse::<Role>(), Ok(Role::Tool));
        assert!("robot".parse::<Role>().is_err());
    }

    #[test]
    fn node_key_display_and_parse() {
        let key = NodeKey::new("T1", EventKind::TaskCreated);
        assert_eq!(key.to_string(), "task_created:T1");
        assert_eq!("task_created:T1".parse::<NodeKey>(), Ok(key));
    }

    #[test]
    fn node_key_keeps_colons_in_event_id() {
        let key: NodeKey = "message_user:chat:42".parse().expect("parse key");
        assert_eq!(key.event_id, "chat:42");
        assert_eq!(key.kind, EventKind::Message(Role::User));
    }

    #[test]
    fn node_key_rejects_missing_parts() {
        assert!("task_created".parse::<NodeKey>().is_err());
        assert!("task_created:".parse::<NodeKey>().is_err());
    }

    #[test]
    fn same_id_different_kind_are_distinct_keys() {
        let created = NodeKey::new("T1", EventKind::TaskCreated);
        let completed = NodeKey::new("T1", EventKind::TaskCompleted);
        assert_ne!(created, completed);
    }

    #[test]
    fn kind_serializes_as_string() {
        let json = serde_json::to_string(&EventKind::Message(Role::User)).expect("serialize");
        assert_eq!(json, "\"message_user\"");
        let back: EventKind = serde_json::from_str("\"task_completed\"").expect("deserialize");
        assert_eq!(back, EventKind::TaskCompleted);
    }
}
