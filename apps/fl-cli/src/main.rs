//! # fl-cli
//!
//! Command-line interface for the feedback loop engine.
//!
//! - `fl run <session>` — draft, review and finalize one session report
//! - `fl combine <sessions...>` — combine persisted session reports
//! - `fl project <sessions...>` — every session, then the combination
//! - `fl runs list/show` — inspect saved run snapshots
//! - `fl policy show/check` — inspect the permission table

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fl_orchestrator::ProjectConfig;
use tracing_subscriber::EnvFilter;

/// Feedback loop: multi-role report drafting with bounded review cycles.
#[derive(Parser)]
#[command(name = "fl", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce the report for one session from its transcript.
    Run {
        /// Session id (selects the transcript and names the report).
        session: String,
        #[command(flatten)]
        options: commands::run::RunOptions,
    },
    /// Combine previously written session reports into one report.
    Combine {
        /// Sessions whose reports to combine, in order.
        #[arg(required = true)]
        sessions: Vec<String>,
        #[command(flatten)]
        options: commands::run::RunOptions,
    },
    /// Run every session, then combine their reports.
    Project {
        /// Session ids, in order.
        #[arg(required = true)]
        sessions: Vec<String>,
        /// Run the session reports concurrently.
        #[arg(long)]
        parallel: bool,
        #[command(flatten)]
        options: commands::run::RunOptions,
    },
    /// Inspect saved run snapshots.
    Runs {
        #[command(subcommand)]
        command: commands::runs::RunsCommands,
    },
    /// Inspect the permission table.
    Policy {
        #[command(subcommand)]
        command: commands::policy::PolicyCommands,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; reports and tables go to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("fl=info".parse()?)
                .add_directive("fl_orchestrator=info".parse()?)
                .add_directive("fl_adapters=info".parse()?)
                .add_directive("fl_context=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = ProjectConfig::load_or_default(&project_root);

    match &cli.command {
        Commands::Run { session, options } => commands::run::execute_run(&config, session, options),
        Commands::Combine { sessions, options } => {
            commands::run::execute_combine(&config, sessions, options)
        }
        Commands::Project {
            sessions,
            parallel,
            options,
        } => commands::run::execute_project(&config, sessions, *parallel, options),
        Commands::Runs { command } => commands::runs::execute(command, &config),
        Commands::Policy { command } => commands::policy::execute(command, &config),
    }
}
