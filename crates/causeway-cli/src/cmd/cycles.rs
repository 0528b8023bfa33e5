use std::io::{self, Write};

use causeway_core::query::{FeedbackLoop, detect_cycles};
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct CyclesArgs {}

#[derive(Debug, Serialize)]
pub struct CyclesOutput {
    pub count: usize,
    pub cycles: Vec<FeedbackLoop>,
}

/// Execute `cw cycles`: report feedback loops in the causal graph.
///
/// # Errors
///
/// See [`Context::build`].
pub fn run_cycles(_args: &CyclesArgs, ctx: &Context) -> anyhow::Result<()> {
    let graph = ctx.build()?.graph;
    let cycles = detect_cycles(&graph);
    let payload = CyclesOutput {
        count: cycles.len(),
        cycles,
    };
    render_mode(ctx.output, &payload, render_cycles_text, render_cycles_human)
}

fn render_cycles_text(payload: &CyclesOutput, w: &mut dyn Write) -> io::Result<()> {
    for cycle in &payload.cycles {
        let path: Vec<String> = cycle.nodes.iter().map(ToString::to_string).collect();
        writeln!(w, "{}  min={:.3}", path.join(" -> "), cycle.min_strength)?;
    }
    Ok(())
}

fn render_cycles_human(payload: &CyclesOutput, w: &mut dyn Write) -> io::Result<()> {
    if payload.cycles.is_empty() {
        return writeln!(w, "No feedback loops found.");
    }

    pretty_section(w, &format!("Feedback loops ({})", payload.count))?;
    for (i, cycle) in payload.cycles.iter().enumerate() {
        let mut path: Vec<String> = cycle.nodes.iter().map(ToString::to_string).collect();
        if let Some(first) = cycle.nodes.first() {
            path.push(first.to_string());
        }
        writeln!(
            w,
            "{:>3}. {}  (min {:.3}, mean {:.3})",
            i + 1,
            path.join(" → "),
            cycle.min_strength,
            cycle.mean_strength
        )?;
    }
    Ok(())
}
