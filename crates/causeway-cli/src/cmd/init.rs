use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use causeway_core::source::sqlite::{current_schema_version, open_records_db};
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Also write a default `.causeway/config.toml` (kept if it already exists).
    #[arg(long)]
    pub with_config: bool,
}

const CONFIG_TOML: &str = "[temporal]\n\
    window_secs = 600\n\
    decay_rate = 0.001\n\
    min_strength = 0.1\n\
    max_strength = 0.9\n\
    \n\
    [pattern]\n\
    lookahead = 4\n\
    candidate_rate = 0.3\n\
    materialize_rate = 0.6\n\
    \n\
    [query]\n\
    max_depth = 3\n\
    influential_limit = 10\n";

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub database: PathBuf,
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PathBuf>,
}

/// Execute `cw init`: create (or migrate) the record database and optionally
/// write the default config.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated, or the
/// config file cannot be written.
pub fn run_init(args: &InitArgs, db: &Path, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let conn = open_records_db(db)?;
    let schema_version = current_schema_version(&conn).context("failed to read schema version")?;
    drop(conn);

    let config = if args.with_config {
        let path = project_root.join(".causeway/config.toml");
        if path.exists() {
            info!(path = %path.display(), "config already exists, leaving it untouched");
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, CONFIG_TOML)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        Some(path)
    } else {
        None
    };

    let payload = InitOutput {
        database: db.to_path_buf(),
        schema_version,
        config,
    };
    render_mode(output, &payload, render_init_text, render_init_pretty)
}

fn render_init_text(payload: &InitOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "database={} schema_version={}",
        payload.database.display(),
        payload.schema_version
    )?;
    if let Some(ref config) = payload.config {
        writeln!(w, "config={}", config.display())?;
    }
    Ok(())
}

fn render_init_pretty(payload: &InitOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Initialized record database")?;
    pretty_kv(w, "database", payload.database.display().to_string())?;
    pretty_kv(w, "schema", payload.schema_version.to_string())?;
    if let Some(ref config) = payload.config {
        pretty_kv(w, "config", config.display().to_string())?;
    }
    Ok(())
}
