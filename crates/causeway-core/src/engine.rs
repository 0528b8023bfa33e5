//! Build orchestration: ingest, then infer, for one request.

use serde::Serialize;
use tracing::{info, instrument};

use crate::config::CausalConfig;
use crate::error::EngineError;
use crate::graph::Graph;
use crate::infer::{self, InferenceReport};
use crate::ingest::{self, IngestReport};
use crate::model::TimeWindow;
use crate::source::RecordSource;

/// What to build: a time window and an optional single actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRequest {
    pub window: TimeWindow,
    pub actor: Option<String>,
}

impl BuildRequest {
    #[must_use]
    pub const fn new(window: TimeWindow) -> Self {
        Self { window, actor: None }
    }

    /// Restrict chat turns and tasks to `actor`.
    #[must_use]
    pub fn for_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// A built graph plus how it was built.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub graph: Graph,
    pub ingest: IngestReport,
    pub inference: InferenceReport,
}

/// Builds causal graphs with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct CausalEngine {
    config: CausalConfig,
}

impl CausalEngine {
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the configuration is invalid.
    pub fn new(config: CausalConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &CausalConfig {
        &self.config
    }

    /// Ingest the request's records from `source` and run every inference
    /// stage over them.
    ///
    /// An unreadable stream does not fail the build; the returned graph is
    /// flagged incomplete instead (see [`Graph::is_incomplete`]).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Graph`] if an inference stage computes an
    /// out-of-range strength. No partial graph is returned in that case.
    #[instrument(
        skip(self, source, request),
        fields(start = %request.window.start(), end = %request.window.end(), actor = ?request.actor)
    )]
    pub fn build<S>(&self, source: &S, request: &BuildRequest) -> Result<BuildReport, EngineError>
    where
        S: RecordSource + ?Sized,
    {
        let mut graph = Graph::new();
        let ingested = ingest::ingest(source, request, &mut graph);
        let inference = infer::run(&mut graph, &ingested.trigger_links, &self.config)?;

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            explicit = inference.explicit_links,
            structural = inference.structural_links,
            temporal = inference.temporal_links,
            pattern = inference.pattern_links,
            unresolved = inference.unresolved_links,
            candidates = inference.candidates.len(),
            incomplete = graph.is_incomplete(),
            "causal graph built"
        );

        Ok(BuildReport {
            graph,
            ingest: ingested.report,
            inference,
        })
    }
}
