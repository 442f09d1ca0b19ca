// runs.rs — Runs subcommands: list, show.

use clap::Subcommand;
use fl_context::{Context, RunStore};
use fl_orchestrator::ProjectConfig;

#[derive(Subcommand)]
pub enum RunsCommands {
    /// List saved runs, newest first.
    List {
        /// Filter by stage (e.g., "terminated", "create").
        #[arg(long)]
        stage: Option<String>,
    },
    /// Show one run's snapshot.
    Show {
        /// Run ID.
        id: String,
        /// Print the raw JSON snapshot.
        #[arg(long)]
        json: bool,
    },
}

pub fn execute(cmd: &RunsCommands, config: &ProjectConfig) -> anyhow::Result<()> {
    let store = RunStore::new(config.runs_dir())?;

    match cmd {
        RunsCommands::List { stage } => list_runs(&store, stage.as_deref()),
        RunsCommands::Show { id, json } => show_run(&store, id, *json),
    }
}

fn list_runs(store: &RunStore, stage: Option<&str>) -> anyhow::Result<()> {
    let runs = match stage {
        Some(stage) => store.list_by_stage(stage)?,
        None => store.list()?,
    };

    if runs.is_empty() {
        println!("No runs found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<12} {:<10} {:<11} {:<6} {:<7} {:<8}",
        "ID", "SESSION", "KIND", "STAGE", "ITER", "ROUNDS", "STATUS"
    );
    println!("{}", "-".repeat(98));

    for ctx in &runs {
        println!(
            "{:<38} {:<12} {:<10} {:<11} {:<6} {:<7} {:<8}",
            ctx.run_id,
            truncate(&ctx.session_id, 12),
            format!("{:?}", ctx.kind).to_lowercase(),
            ctx.stage.to_string(),
            format!("{}/{}", ctx.iteration_count, ctx.max_iterations),
            ctx.round_count,
            status(ctx),
        );
    }
    println!("\n{} run(s) total.", runs.len());

    Ok(())
}

fn show_run(store: &RunStore, id: &str, json: bool) -> anyhow::Result<()> {
    let run_id = uuid::Uuid::parse_str(id)?;
    let ctx = store.load(run_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ctx)?);
        return Ok(());
    }

    println!("Run:        {}", ctx.run_id);
    println!("Session:    {}", ctx.session_id);
    println!("Kind:       {:?}", ctx.kind);
    println!("Stage:      {}", ctx.stage);
    println!("Status:     {}", status(&ctx));
    println!(
        "Iterations: {}/{}",
        ctx.iteration_count, ctx.max_iterations
    );
    println!("Remaining:  {}", ctx.iterations_remaining());
    println!("Rounds:     {}/{}", ctx.round_count, ctx.max_rounds);
    if let Some(feedback) = &ctx.feedback {
        println!(
            "Feedback:   {} item(s), highest severity {}",
            feedback.items.len(),
            feedback
                .highest_severity()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    println!("Created:    {}", ctx.created_at.to_rfc3339());
    println!("Updated:    {}", ctx.updated_at.to_rfc3339());
    if let Some(report) = &ctx.final_artifact {
        println!("Report:     {}", report.title);
        println!("Converged:  {}", report.converged);
        println!("Digest:     {}", report.digest);
    }
    if ctx.has_error {
        println!(
            "Error:      [{}] {}",
            ctx.error_stage.as_deref().unwrap_or("-"),
            ctx.error_message.as_deref().unwrap_or("-")
        );
    }
    if !ctx.history.is_empty() {
        println!("History:");
        for t in &ctx.history {
            println!(
                "  {}  {} -> {} (iteration {})",
                t.at.format("%H:%M:%S"),
                t.from,
                t.to,
                t.iteration
            );
        }
    }

    Ok(())
}

fn status(ctx: &Context) -> &'static str {
    if ctx.is_terminated() {
        "done"
    } else if ctx.has_error {
        "failed"
    } else if ctx.round_count >= ctx.max_rounds {
        "out of rounds"
    } else {
        "open"
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}
