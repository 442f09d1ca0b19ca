// orchestrator.rs — The turn loop for one run.
//
// Each round:
//   1. count the round against the budget (exhausted → Incomplete)
//   2. pick the single role eligible for the current stage
//   3. let that role's agent produce one ActionCall through its Toolkit
//   4. pass the call to the ActionRegistry
//
// The loop ends when the finalizer's call terminates the run (Completed),
// when an adapter/validation/generation error is recorded (Failed), or when
// a contract violation aborts it (Err). One orchestrator drives one run at a
// time; concurrent runs each get their own orchestrator.

use std::collections::HashMap;

use fl_adapters::AdapterSet;
use fl_context::{
    Context, ContextError, ContextTemplate, EventDispatcher, FinalReport, RunEvent, RunKind,
    RunStore, StageController,
};
use fl_policy::Role;

use crate::agent::{standard_agents, RoleAgent, Toolkit};
use crate::error::LoopError;
use crate::generator::ContentGenerator;
use crate::registry::ActionRegistry;

/// What a run reads as its primary input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunInput {
    /// The transcript of the run's own session.
    Transcript,
    /// Reports previously persisted for these sessions, in order.
    PriorArtifacts { sessions: Vec<String> },
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Session the run reports on; also the key its report is written under.
    pub session_id: String,
    /// Seed instruction handed to the entry role.
    pub seed: String,
    pub input: RunInput,
}

impl RunRequest {
    /// A per-session run over that session's transcript.
    pub fn session(session_id: impl Into<String>, seed: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            seed: seed.into(),
            input: RunInput::Transcript,
        }
    }

    /// A combining run over the reports of `sessions`.
    pub fn combining(
        session_id: impl Into<String>,
        sessions: Vec<String>,
        seed: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            seed: seed.into(),
            input: RunInput::PriorArtifacts { sessions },
        }
    }

    pub fn kind(&self) -> RunKind {
        match self.input {
            RunInput::Transcript => RunKind::Session,
            RunInput::PriorArtifacts { .. } => RunKind::Combining,
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The report was persisted and sealed.
    Completed { report: FinalReport, context: Context },
    /// The round budget ran out; no report is final.
    Incomplete { context: Context },
    /// An error was recorded into the context and the run stopped.
    Failed { context: Context, error: LoopError },
}

impl RunOutcome {
    pub fn context(&self) -> &Context {
        match self {
            RunOutcome::Completed { context, .. }
            | RunOutcome::Incomplete { context }
            | RunOutcome::Failed { context, .. } => context,
        }
    }

    pub fn into_context(self) -> Context {
        match self {
            RunOutcome::Completed { context, .. }
            | RunOutcome::Incomplete { context }
            | RunOutcome::Failed { context, .. } => context,
        }
    }

    pub fn report(&self) -> Option<&FinalReport> {
        match self {
            RunOutcome::Completed { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            RunOutcome::Completed { .. } => "completed",
            RunOutcome::Incomplete { .. } => "incomplete",
            RunOutcome::Failed { .. } => "failed",
        }
    }
}

/// Drives runs turn by turn.
pub struct Orchestrator {
    registry: ActionRegistry,
    adapters: AdapterSet,
    agents: HashMap<Role, Box<dyn RoleAgent>>,
    dispatcher: EventDispatcher,
    store: Option<RunStore>,
}

impl Orchestrator {
    /// An orchestrator with the standard agent for every role.
    pub fn new(registry: ActionRegistry, adapters: AdapterSet) -> Self {
        let agents = standard_agents()
            .into_iter()
            .map(|agent| (agent.role(), agent))
            .collect();
        Self {
            registry,
            adapters,
            agents,
            dispatcher: EventDispatcher::new(),
            store: None,
        }
    }

    /// Replace the agent for the agent's role.
    pub fn with_agent(mut self, agent: Box<dyn RoleAgent>) -> Self {
        self.agents.insert(agent.role(), agent);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Save the final context snapshot of every run to `store`.
    pub fn with_run_store(mut self, store: RunStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Execute one run from a fresh context built from `template`.
    pub fn run(
        &mut self,
        request: &RunRequest,
        template: &ContextTemplate,
        generator: &mut dyn ContentGenerator,
    ) -> Result<RunOutcome, LoopError> {
        let ctx = Context::from_template(template, request.session_id.clone(), request.kind())?;
        let run_id = ctx.run_id;
        let span = tracing::info_span!(
            "run",
            %run_id,
            session_id = %request.session_id,
            kind = ?request.kind()
        );
        let _entered = span.enter();

        tracing::info!(
            max_iterations = ctx.max_iterations,
            max_rounds = ctx.max_rounds,
            "run started"
        );
        self.dispatcher.dispatch(&RunEvent::run_started(
            run_id,
            &request.session_id,
            request.kind(),
        ));

        let mut controller = StageController::new(ctx);
        loop {
            let round = match controller.begin_round() {
                Ok(round) => round,
                Err(ContextError::RoundBudgetExhausted { max_rounds, .. }) => {
                    tracing::warn!(max_rounds, stage = %controller.stage(), "round budget exhausted");
                    let context = controller.into_context();
                    self.finish(
                        &context,
                        "incomplete",
                        Some(format!("round budget of {} exhausted", max_rounds)),
                    );
                    return Ok(RunOutcome::Incomplete { context });
                }
                Err(e) => return Err(e.into()),
            };

            let stage = controller.stage();
            let role = Role::for_stage(stage)
                .ok_or_else(|| LoopError::Config(format!("no role acts in stage '{}'", stage)))?;
            let agent = self
                .agents
                .get_mut(&role)
                .ok_or_else(|| LoopError::Config(format!("no agent for role '{}'", role)))?;

            let turn = {
                let mut toolkit = Toolkit::new(
                    role,
                    controller.context(),
                    self.registry.table(),
                    &self.adapters,
                    request,
                    generator,
                );
                agent.take_turn(&mut toolkit)
            };
            let call = match turn {
                Ok(call) => call,
                Err(e) => return self.fail(controller, e),
            };

            let action = call.name();
            tracing::info!(round, %role, %action, %stage, "turn");
            self.dispatcher.dispatch(&RunEvent::action_invoked(
                run_id,
                role.as_str(),
                action.as_str(),
                round,
            ));

            let outcome = match self.registry.invoke(
                role,
                call,
                &mut controller,
                self.adapters.sink.as_ref(),
            ) {
                Ok(outcome) => outcome,
                Err(e) => return self.fail(controller, e),
            };
            tracing::debug!(%action, "{}", outcome.message);

            let to_stage = controller.stage();
            if to_stage != outcome.from_stage {
                self.dispatcher.dispatch(&RunEvent::stage_changed(
                    run_id,
                    outcome.from_stage,
                    to_stage,
                    controller.context().iteration_count,
                ));
            }

            if let Some(report) = outcome.report {
                if let Some(location) = &outcome.persisted_to {
                    self.dispatcher.dispatch(&RunEvent::report_persisted(
                        run_id,
                        location,
                        &report.digest,
                    ));
                }
                let context = controller.into_context();
                tracing::info!(
                    rounds = context.round_count,
                    iterations = context.iteration_count,
                    converged = report.converged,
                    "run completed"
                );
                self.finish(&context, "completed", None);
                return Ok(RunOutcome::Completed { report, context });
            }
        }
    }

    /// Record a recoverable error and stop, or abort on anything else.
    fn fail(
        &mut self,
        mut controller: StageController,
        error: LoopError,
    ) -> Result<RunOutcome, LoopError> {
        let Some(error_stage) = error.error_stage() else {
            tracing::error!(%error, stage = %controller.stage(), "run aborted");
            let context = controller.into_context();
            self.finish(&context, "aborted", Some(error.to_string()));
            return Err(error);
        };

        if !controller.context().has_error {
            controller.record_error(error_stage, error.to_string())?;
        }
        tracing::error!(%error, error_stage, stage = %controller.stage(), "run failed");
        let context = controller.into_context();
        self.finish(&context, "failed", Some(error.to_string()));
        Ok(RunOutcome::Failed { context, error })
    }

    fn finish(&self, context: &Context, status: &str, detail: Option<String>) {
        self.dispatcher
            .dispatch(&RunEvent::run_halted(context.run_id, status, detail));
        if let Some(store) = &self.store {
            if let Err(e) = store.save(context) {
                tracing::warn!(run_id = %context.run_id, "failed to save run snapshot: {}", e);
            }
        }
    }
}
