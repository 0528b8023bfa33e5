use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use causeway_core::model::RecordBundle;
use causeway_core::source::sqlite::{import_bundle, open_records_db};
use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON bundle with `chat_turns`, `tasks` and `trigger_links` arrays.
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ImportOutput {
    pub file: PathBuf,
    pub chat_turns: usize,
    pub tasks: usize,
    pub trigger_links: usize,
    /// Rows written; re-importing the same ids replaces them.
    pub imported: usize,
}

/// Execute `cw import <bundle.json>`.
///
/// # Errors
///
/// Returns an error if the bundle cannot be read or parsed, or the database
/// write fails. Nothing is written when the bundle fails to parse.
pub fn run_import(args: &ImportArgs, db: &Path, output: OutputMode) -> anyhow::Result<()> {
    let bundle = read_bundle(&args.file)?;
    let mut conn = open_records_db(db)?;
    let imported = import_bundle(&mut conn, &bundle)?;

    let payload = ImportOutput {
        file: args.file.clone(),
        chat_turns: bundle.chat_turns.len(),
        tasks: bundle.tasks.len(),
        trigger_links: bundle.trigger_links.len(),
        imported,
    };
    render(output, &payload, render_import_human)
}

fn read_bundle(path: &Path) -> anyhow::Result<RecordBundle> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse record bundle {}", path.display()))
}

fn render_import_human(payload: &ImportOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "Imported {} records from {} ({} chat turns, {} tasks, {} trigger links)",
        payload.imported,
        payload.file.display(),
        payload.chat_turns,
        payload.tasks,
        payload.trigger_links
    )
}
