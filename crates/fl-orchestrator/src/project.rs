// project.rs — Running a whole project: every session, then the combination.
//
// Session runs are independent. In parallel mode each one runs on its own
// scoped thread with its own registry, adapters, generator and Context;
// nothing is shared between them except the read-only ProjectConfig. The
// combining run starts only after every session run has completed, and
// reads the reports those runs persisted.

use fl_context::{EventDispatcher, LogSink, RunKind, RunStore};

use crate::config::ProjectConfig;
use crate::error::LoopError;
use crate::generator::ContentGenerator;
use crate::orchestrator::{Orchestrator, RunOutcome, RunRequest};
use crate::registry::ActionRegistry;

/// Builds a fresh generator for each run.
pub type GeneratorFactory<'a> = dyn Fn(RunKind) -> Box<dyn ContentGenerator> + Sync + 'a;

/// Outcomes of a project run.
#[derive(Debug)]
pub struct ProjectReport {
    /// Per-session outcomes, in the order the sessions were given.
    pub sessions: Vec<(String, RunOutcome)>,
    /// The combining run; `None` when a session run did not complete.
    pub combined: Option<RunOutcome>,
}

impl ProjectReport {
    pub fn is_completed(&self) -> bool {
        self.combined.as_ref().is_some_and(RunOutcome::is_completed)
    }
}

/// An orchestrator wired to the project's filesystem layout, event log and run store.
pub fn build_orchestrator(config: &ProjectConfig, kind: RunKind) -> Result<Orchestrator, LoopError> {
    let registry = ActionRegistry::new(config.permission_table()?);
    let adapters = config.layout.adapters(&config.root, kind);

    let mut dispatcher = EventDispatcher::new();
    dispatcher.add_sink(Box::new(LogSink::new(config.events_log())));
    let store = RunStore::new(config.runs_dir()).map_err(LoopError::Context)?;

    Ok(Orchestrator::new(registry, adapters)
        .with_dispatcher(dispatcher)
        .with_run_store(store))
}

/// Run one session over its transcript.
pub fn run_session(
    config: &ProjectConfig,
    session_id: &str,
    generator: &mut dyn ContentGenerator,
) -> Result<RunOutcome, LoopError> {
    let mut orchestrator = build_orchestrator(config, RunKind::Session)?;
    let request = RunRequest::session(session_id, config.session_seed(session_id));
    orchestrator.run(&request, &config.budgets, generator)
}

/// Combine the persisted reports of `sessions` into one report.
pub fn run_combining(
    config: &ProjectConfig,
    sessions: &[String],
    generator: &mut dyn ContentGenerator,
) -> Result<RunOutcome, LoopError> {
    let mut orchestrator = build_orchestrator(config, RunKind::Combining)?;
    let request = RunRequest::combining(
        config.runs.combined_session_id.clone(),
        sessions.to_vec(),
        config.runs.combining_seed.clone(),
    );
    orchestrator.run(&request, &config.budgets, generator)
}

/// Run every session, then the combining run.
///
/// A contract violation in any run is returned as an error. A session run
/// that fails or runs out of rounds skips the combining run.
pub fn run_project(
    config: &ProjectConfig,
    sessions: &[String],
    parallel: bool,
    generators: &GeneratorFactory<'_>,
) -> Result<ProjectReport, LoopError> {
    tracing::info!(sessions = sessions.len(), parallel, "project run started");

    let outcomes = if parallel {
        run_parallel(config, sessions, generators)?
    } else {
        let mut outcomes = Vec::with_capacity(sessions.len());
        for session_id in sessions {
            let mut generator = generators(RunKind::Session);
            let outcome = run_session(config, session_id, generator.as_mut())?;
            outcomes.push((session_id.clone(), outcome));
        }
        outcomes
    };

    let unfinished: Vec<&str> = outcomes
        .iter()
        .filter(|(_, outcome)| !outcome.is_completed())
        .map(|(session_id, _)| session_id.as_str())
        .collect();
    if !unfinished.is_empty() {
        tracing::error!(?unfinished, "session runs did not complete; skipping combination");
        return Ok(ProjectReport {
            sessions: outcomes,
            combined: None,
        });
    }

    let mut generator = generators(RunKind::Combining);
    let combined = run_combining(config, sessions, generator.as_mut())?;
    tracing::info!(status = combined.status(), "project run finished");
    Ok(ProjectReport {
        sessions: outcomes,
        combined: Some(combined),
    })
}

fn run_parallel(
    config: &ProjectConfig,
    sessions: &[String],
    generators: &GeneratorFactory<'_>,
) -> Result<Vec<(String, RunOutcome)>, LoopError> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = sessions
            .iter()
            .map(|session_id| {
                let handle = scope.spawn(move || {
                    let mut generator = generators(RunKind::Session);
                    run_session(config, session_id, generator.as_mut())
                });
                (session_id, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (session_id, handle) in handles {
            let outcome = handle
                .join()
                .map_err(|_| LoopError::WorkerPanicked(session_id.clone()))??;
            outcomes.push((session_id.clone(), outcome));
        }
        Ok(outcomes)
    })
}
