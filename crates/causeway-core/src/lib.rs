#![forbid(unsafe_code)]
//! causeway-core library: builds a weighted causal graph from an agent's chat
//! turns, tasks and logged trigger links, and answers questions about it.
//!
//! ```text
//! RecordSource ──ingest──▶ Graph ──infer──▶ Graph ──▶ query / export
//! ```
//!
//! Each [`engine::CausalEngine::build`] call produces a private [`graph::Graph`]
//! for one time window; nothing is shared between builds.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums in the library ([`error`]); `anyhow::Result`
//!   at the configuration and storage-admin edges.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod infer;
pub mod ingest;
pub mod model;
pub mod query;
pub mod source;

pub use config::CausalConfig;
pub use engine::{BuildReport, BuildRequest, CausalEngine};
pub use error::{EngineError, ErrorCode, GraphError, SourceError};
pub use graph::{Edge, Graph, Node, Relationship, Strength};
pub use model::{EventKind, NodeKey, Role, TimeWindow};
