// agent.rs — Role agents and the toolkit they act through.
//
// An agent takes exactly one turn per round: it reads what its role is
// allowed to read, asks the content generator for a payload, and hands back
// a single ActionCall. It never touches the Context or the controller; the
// orchestrator passes the call to the ActionRegistry.
//
// Reads go through the Toolkit, which checks the permission table for the
// read action (read_transcript, read_prior_reports, read_instructions)
// before it touches an adapter.

use fl_adapters::AdapterSet;
use fl_context::Context;
use fl_policy::{ActionName, PermissionTable, Role};

use crate::error::LoopError;
use crate::generator::{ContentGenerator, GenerationRequest, PriorReport, SourceMaterial};
use crate::orchestrator::{RunInput, RunRequest};
use crate::payload::{ActionCall, StartRunArgs};
use crate::registry::authorize;

/// The read-only view and capabilities an agent gets for one turn.
pub struct Toolkit<'a> {
    role: Role,
    context: &'a Context,
    table: &'a PermissionTable,
    adapters: &'a AdapterSet,
    request: &'a RunRequest,
    generator: &'a mut dyn ContentGenerator,
}

impl<'a> Toolkit<'a> {
    pub fn new(
        role: Role,
        context: &'a Context,
        table: &'a PermissionTable,
        adapters: &'a AdapterSet,
        request: &'a RunRequest,
        generator: &'a mut dyn ContentGenerator,
    ) -> Self {
        Self {
            role,
            context,
            table,
            adapters,
            request,
            generator,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    pub fn seed(&self) -> &str {
        &self.request.seed
    }

    pub fn read_transcript(&self) -> Result<String, LoopError> {
        let action = ActionName::ReadTranscript;
        self.permit(action)?;
        self.adapters
            .transcripts
            .read_transcript(&self.request.session_id)
            .map_err(|source| LoopError::Adapter { action, source })
    }

    /// Read every prior report named by a combining run, in request order.
    pub fn read_prior_reports(&self) -> Result<Vec<PriorReport>, LoopError> {
        let action = ActionName::ReadPriorReports;
        self.permit(action)?;
        let sessions: &[String] = match &self.request.input {
            RunInput::PriorArtifacts { sessions } => sessions.as_slice(),
            RunInput::Transcript => &[],
        };
        sessions
            .iter()
            .map(|session_id| {
                self.adapters
                    .prior_reports
                    .read_report(session_id)
                    .map(|content| PriorReport {
                        session_id: session_id.clone(),
                        content,
                    })
                    .map_err(|source| LoopError::Adapter { action, source })
            })
            .collect()
    }

    pub fn read_instructions(&self) -> Result<String, LoopError> {
        let action = ActionName::ReadInstructions;
        self.permit(action)?;
        self.adapters
            .instructions
            .read_instructions()
            .map_err(|source| LoopError::Adapter { action, source })
    }

    /// The run's primary input (transcript or prior reports) plus instructions.
    pub fn gather_sources(&self) -> Result<SourceMaterial, LoopError> {
        let mut sources = SourceMaterial::default();
        match &self.request.input {
            RunInput::Transcript => sources.transcript = Some(self.read_transcript()?),
            RunInput::PriorArtifacts { .. } => sources.prior_reports = self.read_prior_reports()?,
        }
        sources.instructions = Some(self.read_instructions()?);
        Ok(sources)
    }

    /// Ask the generator for the payload of `action` and parse it.
    pub fn generate(
        &mut self,
        action: ActionName,
        sources: SourceMaterial,
    ) -> Result<ActionCall, LoopError> {
        let ctx = self.context;
        let request = GenerationRequest {
            role: self.role,
            action,
            stage: ctx.stage,
            iteration: ctx.iteration_count,
            max_iterations: ctx.max_iterations,
            session_id: ctx.session_id.clone(),
            seed: self.request.seed.clone(),
            sources,
            draft: ctx.draft.clone(),
            feedback: ctx.feedback.clone(),
        };
        let payload = self
            .generator
            .generate(&request)
            .map_err(|source| LoopError::Generation { action, source })?;
        ActionCall::from_payload(action, payload)
            .map_err(|source| LoopError::Validation { action, source })
    }

    fn permit(&self, action: ActionName) -> Result<(), LoopError> {
        authorize(self.table, self.role, action, self.context.stage)
    }
}

/// A participant that produces one action call per turn.
pub trait RoleAgent: Send {
    fn role(&self) -> Role;

    fn take_turn(&mut self, toolkit: &mut Toolkit<'_>) -> Result<ActionCall, LoopError>;
}

/// Starts the run with the seed instruction.
#[derive(Debug, Default)]
pub struct EntryAgent;

impl RoleAgent for EntryAgent {
    fn role(&self) -> Role {
        Role::Entry
    }

    fn take_turn(&mut self, toolkit: &mut Toolkit<'_>) -> Result<ActionCall, LoopError> {
        Ok(ActionCall::StartRun(StartRunArgs {
            seed: toolkit.seed().to_string(),
        }))
    }
}

/// Writes the first draft from the source material.
#[derive(Debug, Default)]
pub struct DraftingAgent;

impl RoleAgent for DraftingAgent {
    fn role(&self) -> Role {
        Role::Drafter
    }

    fn take_turn(&mut self, toolkit: &mut Toolkit<'_>) -> Result<ActionCall, LoopError> {
        let sources = toolkit.gather_sources()?;
        toolkit.generate(ActionName::SubmitDraft, sources)
    }
}

/// Reviews the current draft against the source material.
#[derive(Debug, Default)]
pub struct ReviewAgent;

impl RoleAgent for ReviewAgent {
    fn role(&self) -> Role {
        Role::Reviewer
    }

    fn take_turn(&mut self, toolkit: &mut Toolkit<'_>) -> Result<ActionCall, LoopError> {
        let sources = toolkit.gather_sources()?;
        toolkit.generate(ActionName::SubmitFeedback, sources)
    }
}

/// Applies the latest feedback to the draft.
#[derive(Debug, Default)]
pub struct RevisionAgent;

impl RoleAgent for RevisionAgent {
    fn role(&self) -> Role {
        Role::Revisor
    }

    fn take_turn(&mut self, toolkit: &mut Toolkit<'_>) -> Result<ActionCall, LoopError> {
        let sources = SourceMaterial {
            instructions: Some(toolkit.read_instructions()?),
            ..SourceMaterial::default()
        };
        toolkit.generate(ActionName::SubmitRevision, sources)
    }
}

/// Polishes the draft and persists the final report.
#[derive(Debug, Default)]
pub struct FinalizeAgent;

impl RoleAgent for FinalizeAgent {
    fn role(&self) -> Role {
        Role::Finalizer
    }

    fn take_turn(&mut self, toolkit: &mut Toolkit<'_>) -> Result<ActionCall, LoopError> {
        let sources = SourceMaterial {
            instructions: Some(toolkit.read_instructions()?),
            ..SourceMaterial::default()
        };
        toolkit.generate(ActionName::FinalizeReport, sources)
    }
}

/// One agent per role.
pub fn standard_agents() -> Vec<Box<dyn RoleAgent>> {
    vec![
        Box::new(EntryAgent),
        Box::new(DraftingAgent),
        Box::new(ReviewAgent),
        Box::new(RevisionAgent),
        Box::new(FinalizeAgent),
    ]
}
