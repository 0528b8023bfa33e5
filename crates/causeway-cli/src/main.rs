use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use causeway_core::config::{discover_config, load_config};
use causeway_core::engine::BuildRequest;
use causeway_core::{EngineError, TimeWindow};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmd;
mod output;

use cmd::Context;
use output::{CliError, OutputMode, render_error, resolve_output_mode};

/// Default look-back when `--since` is omitted.
const DEFAULT_SPAN_HOURS: i64 = 24;

#[derive(Parser)]
#[command(
    name = "cw",
    version,
    about = "Build and query causal graphs over agent chat and task history",
    long_about = "Build and query causal graphs over agent chat and task history.\n\n\
        Every query rebuilds the graph from the record database for the selected\n\
        time window: explicit trigger links first, then task lifecycles, temporal\n\
        proximity and recurring kind patterns.",
    after_help = "QUICK START:\n  cw init\n  cw import history.json\n  cw build\n  cw causes task_created:T1"
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Alias for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Record database path.
    #[arg(long, global = true, default_value = ".causeway/records.db")]
    db: PathBuf,

    /// Config file (defaults to `.causeway/config.toml` when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Window start, RFC 3339 (default: 24 hours before `--until`).
    #[arg(long, global = true)]
    since: Option<DateTime<Utc>>,

    /// Window end, RFC 3339, exclusive (default: now).
    #[arg(long, global = true)]
    until: Option<DateTime<Utc>>,

    /// Only chat turns and tasks from this actor.
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Create or migrate the record database",
        after_help = "EXAMPLES:\n    cw init\n    cw init --with-config\n    cw init --db /tmp/records.db"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Import chat turns, tasks and trigger links from a JSON bundle",
        long_about = "Import records from a JSON bundle with optional `chat_turns`, `tasks`\n\
            and `trigger_links` arrays. Records with an existing id are replaced.",
        after_help = "EXAMPLES:\n    cw import history.json"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Graph",
        about = "Build the graph and summarize inference",
        after_help = "EXAMPLES:\n    cw build\n    cw build --since 2024-05-01T00:00:00Z --actor agent-1\n    cw build --json"
    )]
    Build(cmd::build::BuildArgs),

    #[command(
        next_help_heading = "Query",
        about = "List upstream causes of an event",
        after_help = "EXAMPLES:\n    cw causes task_created:T1\n    cw causes task_completed:T1 --depth 5"
    )]
    Causes(cmd::query::TraverseArgs),

    #[command(
        next_help_heading = "Query",
        about = "List downstream effects of an event",
        after_help = "EXAMPLES:\n    cw effects message_user:M1"
    )]
    Effects(cmd::query::TraverseArgs),

    #[command(
        next_help_heading = "Query",
        about = "Shortest causal path between two events",
        after_help = "EXAMPLES:\n    cw path message_user:M1 task_completed:T1"
    )]
    Path(cmd::query::PathArgs),

    #[command(
        next_help_heading = "Query",
        about = "Detect feedback loops",
        after_help = "EXAMPLES:\n    cw cycles\n    cw cycles --json"
    )]
    Cycles(cmd::cycles::CyclesArgs),

    #[command(
        next_help_heading = "Query",
        about = "Rank events by downstream influence",
        after_help = "EXAMPLES:\n    cw influential\n    cw influential --limit 25"
    )]
    Influential(cmd::query::InfluentialArgs),

    #[command(
        next_help_heading = "Graph",
        about = "Export the graph as JSON",
        after_help = "EXAMPLES:\n    cw export > graph.json\n    cw export --prune 0.3 --output graph.json"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Graph",
        about = "Preview removing edges weaker than a threshold",
        after_help = "EXAMPLES:\n    cw prune 0.25"
    )]
    Prune(cmd::export::PruneArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CAUSEWAY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "causeway=debug,cw=debug,info"
        } else {
            "causeway=info,cw=info,warn"
        })
    });

    let format = env::var("CAUSEWAY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output; logs go to stderr.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
        }
    }
}

/// Resolve the time window from `--since` / `--until`.
fn window(since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Result<TimeWindow, EngineError> {
    let end = until.unwrap_or_else(Utc::now);
    match since {
        Some(start) => TimeWindow::new(start, end),
        None => TimeWindow::trailing(Duration::hours(DEFAULT_SPAN_HOURS), end),
    }
}

fn context(cli: &Cli, output: OutputMode, project_root: &Path) -> anyhow::Result<Context> {
    let config = match cli.config {
        Some(ref path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            load_config(path)?
        }
        None => discover_config(project_root)?,
    };
    let mut request = BuildRequest::new(window(cli.since, cli.until)?);
    if let Some(ref actor) = cli.actor {
        request = request.for_actor(actor.clone());
    }
    Ok(Context {
        db: cli.db.clone(),
        config,
        request,
        output,
    })
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir().context("failed to resolve current directory")?;

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, &cli.db, output, &project_root),
        Commands::Import(ref args) => cmd::import::run_import(args, &cli.db, output),
        Commands::Build(ref args) => cmd::build::run_build(args, &context(cli, output, &project_root)?),
        Commands::Causes(ref args) => cmd::query::run_traverse(
            args,
            cmd::query::TraverseDirection::Causes,
            &context(cli, output, &project_root)?,
        ),
        Commands::Effects(ref args) => cmd::query::run_traverse(
            args,
            cmd::query::TraverseDirection::Effects,
            &context(cli, output, &project_root)?,
        ),
        Commands::Path(ref args) => cmd::query::run_path(args, &context(cli, output, &project_root)?),
        Commands::Cycles(ref args) => cmd::cycles::run_cycles(args, &context(cli, output, &project_root)?),
        Commands::Influential(ref args) => {
            cmd::query::run_influential(args, &context(cli, output, &project_root)?)
        }
        Commands::Export(ref args) => cmd::export::run_export(args, &context(cli, output, &project_root)?),
        Commands::Prune(ref args) => cmd::export::run_prune(args, &context(cli, output, &project_root)?),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = resolve_output_mode(cli.format, cli.json);

    if let Err(err) = run(&cli, output) {
        render_error(output, &to_cli_error(err))?;
        std::process::exit(1);
    }
    Ok(())
}

/// Keep structured details when the failure carries them.
fn to_cli_error(err: anyhow::Error) -> CliError {
    match err.downcast::<CliError>() {
        Ok(cli_error) => cli_error,
        Err(err) => err.downcast_ref::<EngineError>().map_or_else(
            || CliError {
                message: format!("{err:#}"),
                suggestion: None,
                error_code: None,
            },
            CliError::from,
        ),
    }
}
