use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use causeway_core::export::{GraphExport, export_graph};
use clap::Args;
use serde::Serialize;
use tracing::info;

use super::Context;
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_mode};

/// Parse a pruning threshold, which must lie in `[0, 1]`.
fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is outside [0, 1]"))
    }
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Drop edges weaker than this before exporting.
    #[arg(long, value_parser = parse_threshold)]
    pub prune: Option<f64>,

    /// Write the JSON export here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ExportWritten {
    pub path: PathBuf,
    pub nodes: usize,
    pub edges: usize,
    pub content_hash: String,
}

/// Execute `cw export`.
///
/// The export document is always JSON. With `--output` it goes to the file
/// and a short summary is rendered in the active output mode.
///
/// # Errors
///
/// Returns an error if the graph cannot be built or the file cannot be
/// written.
pub fn run_export(args: &ExportArgs, ctx: &Context) -> anyhow::Result<()> {
    let mut graph = ctx.build()?.graph;
    if let Some(threshold) = args.prune {
        let removed = graph.prune_weak_edges(threshold);
        info!(threshold, removed, "pruned weak edges before export");
    }
    let export = export_graph(&graph);

    let Some(ref path) = args.output else {
        return render(OutputMode::Json, &export, |_, _| Ok(()));
    };

    write_export(&export, path)?;
    let written = ExportWritten {
        path: path.clone(),
        nodes: export.stats.total_nodes,
        edges: export.stats.total_edges,
        content_hash: export.content_hash,
    };
    render(ctx.output, &written, |w, out| {
        writeln!(out, "Wrote {} nodes and {} edges to {}", w.nodes, w.edges, w.path.display())
    })
}

fn write_export(export: &GraphExport, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(path, json + "\n").with_context(|| format!("failed to write {}", path.display()))
}

// ---------------------------------------------------------------------------
// prune
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Edges with strength strictly below this are removed.
    #[arg(value_parser = parse_threshold)]
    pub threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct PruneOutput {
    pub threshold: f64,
    pub removed: usize,
    pub remaining: usize,
    pub content_hash: String,
}

/// Execute `cw prune <threshold>`: report what pruning would leave.
///
/// Graphs are rebuilt per request, so this previews pruning rather than
/// persisting it.
///
/// # Errors
///
/// See [`Context::build`].
pub fn run_prune(args: &PruneArgs, ctx: &Context) -> anyhow::Result<()> {
    let mut graph = ctx.build()?.graph;
    let removed = graph.prune_weak_edges(args.threshold);
    let payload = PruneOutput {
        threshold: args.threshold,
        removed,
        remaining: graph.edge_count(),
        content_hash: graph.content_hash(),
    };
    render_mode(ctx.output, &payload, render_prune_text, render_prune_pretty)
}

fn render_prune_text(payload: &PruneOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "threshold={} removed={} remaining={}",
        payload.threshold, payload.removed, payload.remaining
    )
}

fn render_prune_pretty(payload: &PruneOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Pruning edges below {}", payload.threshold))?;
    pretty_kv(w, "removed", payload.removed.to_string())?;
    pretty_kv(w, "remaining", payload.remaining.to_string())?;
    pretty_kv(w, "hash", &payload.content_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_core::graph::{Edge, Graph, Node, Relationship, Strength};
    use causeway_core::{EventKind, NodeKey};
    use chrono::{TimeZone, Utc};

    #[test]
    fn threshold_must_be_in_unit_interval() {
        assert_eq!(parse_threshold("0.5"), Ok(0.5));
        assert_eq!(parse_threshold("0"), Ok(0.0));
        assert_eq!(parse_threshold("1"), Ok(1.0));
        assert!(parse_threshold("1.5").is_err());
        assert!(parse_threshold("-0.1").is_err());
        assert!(parse_threshold("strong").is_err());
        assert!(parse_threshold("NaN").is_err());
    }

    #[test]
    fn prune_text_render() {
        let payload = PruneOutput {
            threshold: 0.5,
            removed: 1,
            remaining: 2,
            content_hash: "blake3:00".to_string(),
        };
        let mut buf = Vec::new();
        render_prune_text(&payload, &mut buf).expect("render");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "threshold=0.5 removed=1 remaining=2\n");
    }

    #[test]
    fn export_file_is_valid_json() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).single().expect("ts");
        let mut g = Graph::new();
        let a = g.insert_node(Node::new(NodeKey::new("T1", EventKind::TaskCreated), ts, "agent-1"));
        let b = g.insert_node(Node::new(NodeKey::new("T1", EventKind::TaskCompleted), ts, "agent-1"));
        g.insert_edge(a, b, Edge::new(Strength::CERTAIN, Relationship::Causes, Vec::new()));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out/graph.json");
        write_export(&export_graph(&g), &path).expect("write");

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(json["stats"]["total_edges"], 1);
        assert_eq!(json["edges"][0]["relationship"], "causes");
    }
}
