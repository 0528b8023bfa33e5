//! Command handlers. Each `run_*` builds what it needs from a [`Context`]
//! and renders through [`crate::output`].

pub mod build;
pub mod cycles;
pub mod export;
pub mod import;
pub mod init;
pub mod query;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use causeway_core::engine::{BuildReport, BuildRequest, CausalEngine};
use causeway_core::source::SqliteSource;
use causeway_core::{CausalConfig, NodeKey};
use tracing::warn;

use crate::output::CliError;

/// Everything a graph-building command needs, resolved from global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub db: PathBuf,
    pub config: CausalConfig,
    pub request: BuildRequest,
    pub output: crate::output::OutputMode,
}

impl Context {
    /// Build the causal graph for this context's request.
    ///
    /// # Errors
    ///
    /// Returns an error if the record database is missing, or the engine
    /// rejects the configuration or aborts the build.
    pub fn build(&self) -> anyhow::Result<BuildReport> {
        ensure_database(&self.db)?;

        let engine = CausalEngine::new(self.config.clone())?;
        let report = engine
            .build(&SqliteSource::new(&self.db), &self.request)
            .context("failed to build causal graph")?;

        for missing in report.graph.unavailable_sources() {
            warn!(source = %missing.source, reason = %missing.reason, "graph is incomplete");
        }
        Ok(report)
    }
}

/// Fail with a hint when `db` does not exist yet.
///
/// A missing database would otherwise build an empty graph with every stream
/// flagged unavailable.
pub fn ensure_database(db: &Path) -> anyhow::Result<()> {
    if db.exists() {
        return Ok(());
    }
    Err(CliError::with_details(
        format!("record database not found: {}", db.display()),
        "Run `cw init` and `cw import <bundle.json>` first.",
        "missing_database",
    )
    .into())
}

/// Parse a `<kind>:<event_id>` node key argument.
///
/// # Errors
///
/// Returns an error naming the expected form if `raw` does not parse.
pub fn parse_key(raw: &str) -> anyhow::Result<NodeKey> {
    raw.parse::<NodeKey>()
        .with_context(|| format!("invalid node key '{raw}' (expected <kind>:<event_id>, e.g. task_created:T1)"))
}
