use std::io::{self, Write};

use causeway_core::engine::BuildReport;
use causeway_core::graph::UnavailableSource;
use causeway_core::infer::PatternCandidate;
use causeway_core::ingest::IngestReport;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::output::{pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct BuildArgs {}

#[derive(Debug, Serialize)]
pub struct BuildOutput {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub nodes: usize,
    pub edges: usize,
    pub explicit_links: usize,
    pub structural_links: usize,
    pub temporal_links: usize,
    pub pattern_links: usize,
    pub unresolved_links: usize,
    pub ingest: IngestReport,
    pub candidates: Vec<PatternCandidate>,
    pub unavailable_sources: Vec<UnavailableSource>,
    pub content_hash: String,
}

impl BuildOutput {
    fn from_report(ctx: &Context, report: BuildReport) -> Self {
        let window = ctx.request.window;
        Self {
            start: window.start(),
            end: window.end(),
            actor: ctx.request.actor.clone(),
            nodes: report.graph.node_count(),
            edges: report.graph.edge_count(),
            explicit_links: report.inference.explicit_links,
            structural_links: report.inference.structural_links,
            temporal_links: report.inference.temporal_links,
            pattern_links: report.inference.pattern_links,
            unresolved_links: report.inference.unresolved_links,
            content_hash: report.graph.content_hash(),
            unavailable_sources: report.graph.unavailable_sources().to_vec(),
            ingest: report.ingest,
            candidates: report.inference.candidates,
        }
    }
}

/// Execute `cw build`: build the graph and summarize how it was inferred.
///
/// # Errors
///
/// See [`Context::build`].
pub fn run_build(_args: &BuildArgs, ctx: &Context) -> anyhow::Result<()> {
    let report = ctx.build()?;
    let payload = BuildOutput::from_report(ctx, report);
    render_mode(ctx.output, &payload, render_build_text, render_build_pretty)
}

fn render_build_text(payload: &BuildOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "nodes={} edges={} explicit={} structural={} temporal={} pattern={} unresolved={}",
        payload.nodes,
        payload.edges,
        payload.explicit_links,
        payload.structural_links,
        payload.temporal_links,
        payload.pattern_links,
        payload.unresolved_links
    )?;
    for c in &payload.candidates {
        writeln!(
            w,
            "candidate {} {} -> {} rate={:.2} ({}/{}){}",
            c.actor,
            c.antecedent,
            c.consequent,
            c.rate,
            c.occurrences,
            c.opportunities,
            if c.materialized { " materialized" } else { "" }
        )?;
    }
    for missing in &payload.unavailable_sources {
        writeln!(w, "unavailable {} {}", missing.source, missing.reason)?;
    }
    Ok(())
}

fn render_build_pretty(payload: &BuildOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Causal graph")?;
    pretty_kv(w, "window", format!("{} .. {}", payload.start.to_rfc3339(), payload.end.to_rfc3339()))?;
    if let Some(ref actor) = payload.actor {
        pretty_kv(w, "actor", actor)?;
    }
    pretty_kv(w, "nodes", payload.nodes.to_string())?;
    pretty_kv(w, "edges", payload.edges.to_string())?;
    pretty_kv(w, "explicit", payload.explicit_links.to_string())?;
    pretty_kv(w, "structural", payload.structural_links.to_string())?;
    pretty_kv(w, "temporal", payload.temporal_links.to_string())?;
    pretty_kv(w, "pattern", payload.pattern_links.to_string())?;
    pretty_kv(w, "unresolved", payload.unresolved_links.to_string())?;
    pretty_kv(w, "rejected", payload.ingest.rejected_records.to_string())?;

    if !payload.candidates.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Pattern candidates")?;
        writeln!(w, "{:<16} {:<20} {:<20} {:>6}  SEEN", "ACTOR", "ANTECEDENT", "CONSEQUENT", "RATE")?;
        for c in &payload.candidates {
            writeln!(
                w,
                "{:<16} {:<20} {:<20} {:>6.2}  {}/{}{}",
                c.actor,
                c.antecedent.as_str(),
                c.consequent.as_str(),
                c.rate,
                c.occurrences,
                c.opportunities,
                if c.materialized { "  *" } else { "" }
            )?;
        }
    }

    if !payload.unavailable_sources.is_empty() {
        writeln!(w)?;
        pretty_rule(w)?;
        writeln!(w, "Graph is INCOMPLETE; these streams could not be read:")?;
        for missing in &payload.unavailable_sources {
            writeln!(w, "  {}: {}", missing.source, missing.reason)?;
        }
    }
    Ok(())
}
