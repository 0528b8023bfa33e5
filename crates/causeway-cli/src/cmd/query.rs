use std::io::{self, Write};

use causeway_core::NodeKey;
use causeway_core::query::{
    CausalLink, InfluenceEntry, PathHop, find_causes, find_effects, find_path, most_influential_events,
};
use clap::Args;
use serde::Serialize;

use super::{Context, parse_key};
use crate::output::{pretty_kv, pretty_section, render_mode};

// ---------------------------------------------------------------------------
// causes / effects
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct TraverseArgs {
    /// Node key as `<kind>:<event_id>`, e.g. `task_created:T1`.
    pub key: String,

    /// Maximum hops to follow (defaults to `query.max_depth`).
    #[arg(long)]
    pub depth: Option<usize>,
}

/// Which way [`run_traverse`] walks edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraverseDirection {
    Causes,
    Effects,
}

impl TraverseDirection {
    const fn noun(self) -> &'static str {
        match self {
            Self::Causes => "causes",
            Self::Effects => "effects",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TraverseOutput {
    pub event: NodeKey,
    pub direction: TraverseDirection,
    pub max_depth: usize,
    /// False when the event is not in the graph for this window.
    pub found: bool,
    pub links: Vec<CausalLink>,
}

/// Execute `cw causes <key>` or `cw effects <key>`.
///
/// # Errors
///
/// Returns an error if the key does not parse or the graph cannot be built.
pub fn run_traverse(args: &TraverseArgs, direction: TraverseDirection, ctx: &Context) -> anyhow::Result<()> {
    let key = parse_key(&args.key)?;
    let max_depth = args.depth.unwrap_or(ctx.config.query.max_depth);
    let graph = ctx.build()?.graph;

    let links = match direction {
        TraverseDirection::Causes => find_causes(&graph, &key, max_depth),
        TraverseDirection::Effects => find_effects(&graph, &key, max_depth),
    };
    let payload = TraverseOutput {
        found: graph.contains(&key),
        event: key,
        direction,
        max_depth,
        links,
    };
    render_mode(ctx.output, &payload, render_traverse_text, render_traverse_pretty)
}

fn render_traverse_text(payload: &TraverseOutput, w: &mut dyn Write) -> io::Result<()> {
    for link in &payload.links {
        writeln!(
            w,
            "{}  {:.3}  {}  depth={}",
            link.event, link.strength, link.relationship, link.depth
        )?;
    }
    Ok(())
}

fn render_traverse_pretty(payload: &TraverseOutput, w: &mut dyn Write) -> io::Result<()> {
    if !payload.found {
        return writeln!(w, "{} is not in the graph for this window.", payload.event);
    }
    if payload.links.is_empty() {
        return writeln!(
            w,
            "No {} found for {} within {} hops.",
            payload.direction.noun(),
            payload.event,
            payload.max_depth
        );
    }

    pretty_section(
        w,
        &format!("{} of {} ({})", capitalize(payload.direction.noun()), payload.event, payload.links.len()),
    )?;
    for link in &payload.links {
        writeln!(
            w,
            "{:>5.3}  {:<10} d{}  {}  {}",
            link.strength,
            link.relationship.as_str(),
            link.depth,
            link.event,
            link.timestamp.to_rfc3339()
        )?;
        for line in &link.evidence {
            writeln!(w, "                       {line}")?;
        }
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// path
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Starting node key.
    pub from: String,
    /// Target node key.
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct PathOutput {
    pub from: NodeKey,
    pub to: NodeKey,
    /// `None` when `to` is unreachable from `from`.
    pub hops: Option<Vec<PathHop>>,
}

/// Execute `cw path <from> <to>`.
///
/// # Errors
///
/// Returns an error if either key does not parse or the graph cannot be
/// built. An unreachable target is not an error.
pub fn run_path(args: &PathArgs, ctx: &Context) -> anyhow::Result<()> {
    let from = parse_key(&args.from)?;
    let to = parse_key(&args.to)?;
    let graph = ctx.build()?.graph;

    let payload = PathOutput {
        hops: find_path(&graph, &from, &to),
        from,
        to,
    };
    render_mode(ctx.output, &payload, render_path_text, render_path_pretty)
}

fn render_path_text(payload: &PathOutput, w: &mut dyn Write) -> io::Result<()> {
    match payload.hops {
        None => writeln!(w, "unreachable"),
        Some(ref hops) => {
            for hop in hops {
                writeln!(w, "{} -> {}  {:.3}  {}", hop.from, hop.to, hop.strength, hop.relationship)?;
            }
            Ok(())
        }
    }
}

fn render_path_pretty(payload: &PathOutput, w: &mut dyn Write) -> io::Result<()> {
    let Some(ref hops) = payload.hops else {
        return writeln!(w, "No causal path from {} to {}.", payload.from, payload.to);
    };
    if hops.is_empty() {
        return writeln!(w, "{} is its own endpoint; the path is empty.", payload.from);
    }

    pretty_section(w, &format!("Path ({} hops)", hops.len()))?;
    writeln!(w, "{}", payload.from)?;
    for hop in hops {
        writeln!(w, "  └─ {} {:.3} ─> {}", hop.relationship, hop.strength, hop.to)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// influential
// ---------------------------------------------------------------------------

#[derive(Args, Debug, Default)]
pub struct InfluentialArgs {
    /// How many events to list (defaults to `query.influential_limit`).
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct InfluentialOutput {
    pub limit: usize,
    pub events: Vec<InfluenceEntry>,
}

/// Execute `cw influential`.
///
/// # Errors
///
/// See [`Context::build`].
pub fn run_influential(args: &InfluentialArgs, ctx: &Context) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or(ctx.config.query.influential_limit);
    let graph = ctx.build()?.graph;
    let payload = InfluentialOutput {
        limit,
        events: most_influential_events(&graph, limit),
    };
    render_mode(ctx.output, &payload, render_influential_text, render_influential_pretty)
}

fn render_influential_text(payload: &InfluentialOutput, w: &mut dyn Write) -> io::Result<()> {
    for entry in &payload.events {
        writeln!(w, "{}  {:.2}  {}  out={}", entry.event, entry.influence, entry.actor, entry.out_degree)?;
    }
    Ok(())
}

fn render_influential_pretty(payload: &InfluentialOutput, w: &mut dyn Write) -> io::Result<()> {
    if payload.events.is_empty() {
        return writeln!(w, "No event has downstream influence in this window.");
    }
    pretty_section(w, &format!("Most influential events (top {})", payload.limit))?;
    for (rank, entry) in payload.events.iter().enumerate() {
        writeln!(w, "{:>3}. {:>6.2}  {}", rank + 1, entry.influence, entry.event)?;
        pretty_kv(w, "     actor", &entry.actor)?;
        pretty_kv(w, "     at", entry.timestamp.to_rfc3339())?;
    }
    Ok(())
}
