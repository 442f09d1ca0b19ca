// run.rs — Run subcommands: run, combine, project.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use fl_context::RunKind;
use fl_orchestrator::{
    run_combining, run_project, run_session, ContentGenerator, PassthroughGenerator,
    ProjectConfig, RunOutcome, ScriptedGenerator,
};

/// Budget and generator options shared by every run command.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Maximum review/revise passes (overrides .fl/loop.toml).
    #[arg(long)]
    pub max_iterations: Option<u32>,
    /// Maximum orchestrator turns (overrides .fl/loop.toml).
    #[arg(long)]
    pub max_rounds: Option<u32>,
    /// JSON script of per-role payloads to replay instead of generating.
    #[arg(long)]
    pub script: Option<PathBuf>,
    /// Review passes the built-in generator asks for before converging.
    #[arg(long, default_value_t = 1)]
    pub review_passes: u32,
}

impl RunOptions {
    /// The project config with budget overrides applied.
    fn config(&self, config: &ProjectConfig) -> ProjectConfig {
        let mut config = config.clone();
        if let Some(n) = self.max_iterations {
            config.budgets.max_iterations = n;
        }
        if let Some(n) = self.max_rounds {
            config.budgets.max_rounds = n;
        }
        config
    }

    /// A generator source: every run gets its own copy of the script.
    fn generators(&self) -> anyhow::Result<impl Fn(RunKind) -> Box<dyn ContentGenerator> + Sync> {
        let script = match &self.script {
            Some(path) => Some(ScriptedGenerator::load(path)?),
            None => None,
        };
        let review_passes = self.review_passes;
        Ok(move |_kind: RunKind| -> Box<dyn ContentGenerator> {
            match &script {
                Some(script) => Box::new(script.clone()),
                None => Box::new(PassthroughGenerator::new(review_passes)),
            }
        })
    }
}

pub fn execute_run(config: &ProjectConfig, session: &str, options: &RunOptions) -> anyhow::Result<()> {
    let config = options.config(config);
    let generators = options.generators()?;
    let outcome = run_session(&config, session, generators(RunKind::Session).as_mut())?;
    print_outcome(session, &outcome);
    finish(&[(session, &outcome)])
}

pub fn execute_combine(
    config: &ProjectConfig,
    sessions: &[String],
    options: &RunOptions,
) -> anyhow::Result<()> {
    let config = options.config(config);
    let generators = options.generators()?;
    let outcome = run_combining(&config, sessions, generators(RunKind::Combining).as_mut())?;
    let id = config.runs.combined_session_id.as_str();
    print_outcome(id, &outcome);
    finish(&[(id, &outcome)])
}

pub fn execute_project(
    config: &ProjectConfig,
    sessions: &[String],
    parallel: bool,
    options: &RunOptions,
) -> anyhow::Result<()> {
    let config = options.config(config);
    let generators = options.generators()?;
    let report = run_project(&config, sessions, parallel, &generators)?;

    let mut all: Vec<(&str, &RunOutcome)> = report
        .sessions
        .iter()
        .map(|(id, outcome)| (id.as_str(), outcome))
        .collect();
    for (id, outcome) in &all {
        print_outcome(id, outcome);
    }
    match &report.combined {
        Some(outcome) => {
            let id = config.runs.combined_session_id.as_str();
            print_outcome(id, outcome);
            all.push((id, outcome));
        }
        None => println!("Combined report skipped: not every session completed."),
    }
    finish(&all)
}

fn print_outcome(session: &str, outcome: &RunOutcome) {
    let ctx = outcome.context();
    println!("Session {}: {}", session, outcome.status());
    println!("  Run:        {}", ctx.run_id);
    println!("  Stage:      {}", ctx.stage);
    println!(
        "  Iterations: {}/{}",
        ctx.iteration_count, ctx.max_iterations
    );
    println!("  Rounds:     {}/{}", ctx.round_count, ctx.max_rounds);
    if let Some(report) = outcome.report() {
        println!("  Title:      {}", report.title);
        println!("  Converged:  {}", report.converged);
        println!("  Digest:     {}", report.digest);
    }
    if let RunOutcome::Failed { error, .. } = outcome {
        println!("  Error:      {}", error);
    }
    println!();
}

fn finish(outcomes: &[(&str, &RunOutcome)]) -> anyhow::Result<()> {
    let unfinished: Vec<&str> = outcomes
        .iter()
        .filter(|(_, outcome)| !outcome.is_completed())
        .map(|(id, _)| *id)
        .collect();
    if !unfinished.is_empty() {
        bail!("runs did not complete: {}", unfinished.join(", "));
    }
    Ok(())
}
