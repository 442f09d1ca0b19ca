//! # fl-orchestrator
//!
//! Turn scheduler for the feedback loop engine.
//!
//! An [`Orchestrator`] drives one run at a time: each round it picks the
//! single role eligible for the current stage, lets that role's
//! [`RoleAgent`] produce one [`ActionCall`], and passes the call to the
//! [`ActionRegistry`], which checks the stage guard and the permission table
//! before it touches the Context.
//!
//! ```text
//! begin_round ─→ Role::for_stage ─→ agent.take_turn(toolkit) ─→ registry.invoke
//!      │                                  │                           │
//!  Incomplete                    adapter / generation         state / permission
//!  (rounds out)                  error → Failed               error → Err (abort)
//! ```
//!
//! Content comes from a [`ContentGenerator`]. The engine treats it as
//! opaque and validates whatever JSON it returns at the action boundary.
//!
//! [`run_project`] runs every session of a project (optionally in parallel)
//! and then combines their reports.

pub mod agent;
pub mod config;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod payload;
pub mod project;
pub mod registry;

pub use agent::{
    standard_agents, DraftingAgent, EntryAgent, FinalizeAgent, ReviewAgent, RevisionAgent,
    RoleAgent, Toolkit,
};
pub use config::{ProjectConfig, RunSettings, CONFIG_FILE};
pub use error::{GenerationError, LoopError};
pub use generator::{
    ContentGenerator, GenerationRequest, PassthroughGenerator, PriorReport, ScriptedGenerator,
    SourceMaterial,
};
pub use orchestrator::{Orchestrator, RunInput, RunOutcome, RunRequest};
pub use payload::{ActionCall, StartRunArgs};
pub use project::{
    build_orchestrator, run_combining, run_project, run_session, GeneratorFactory, ProjectReport,
};
pub use registry::{ActionOutcome, ActionRegistry};
