//! Record and identity types.

pub mod kind;
pub mod metadata;
pub mod record;

pub use kind::{EventKind, NodeKey, Role};
pub use metadata::{Metadata, validate_metadata};
pub use record::{ChatTurn, RecordBundle, TaskRecord, TimeWindow, TriggerLink};
