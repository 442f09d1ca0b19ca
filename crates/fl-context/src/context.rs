// context.rs — Context: the single owned state value of one run.
//
// A Context is always built fresh from a ContextTemplate. Two runs never share
// a Context, so per-session runs and the combining run can execute side by
// side without leaking state into each other.
//
// Context fields are public for reading and serialization. Mutation goes
// through StageController, which bumps `version` on every successful change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::{FeedbackCollection, FinalReport, ReportDraft, RevisedReport};
use crate::error::ContextError;
use crate::stage::Stage;

/// Default cap on review/revise cycles.
pub const DEFAULT_MAX_ITERATIONS: u32 = 2;

/// Default cap on orchestrator turns.
pub const DEFAULT_MAX_ROUNDS: u32 = 50;

/// What the Create stage drafts from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// One session's raw transcript.
    Session,
    /// The persisted artifacts of earlier session runs.
    Combining,
}

/// Budgets every fresh Context starts with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextTemplate {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl Default for ContextTemplate {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

impl ContextTemplate {
    pub fn new(max_iterations: u32, max_rounds: u32) -> Self {
        Self {
            max_iterations,
            max_rounds,
        }
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        if self.max_iterations < 1 {
            return Err(ContextError::InvalidTemplate(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_rounds < 1 {
            return Err(ContextError::InvalidTemplate(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One edge taken through the stage graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
    /// `iteration_count` after the transition.
    pub iteration: u32,
    pub at: DateTime<Utc>,
}

/// The state of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Context {
    pub run_id: Uuid,

    /// Session the run reads from and persists under.
    pub session_id: String,

    pub kind: RunKind,

    /// Incremented on every successful mutation.
    pub version: u64,

    pub stage: Stage,

    /// Current review/revise cycle, starting at 1 once the run is started.
    /// Never exceeds `max_iterations`.
    pub iteration_count: u32,
    pub max_iterations: u32,

    /// Last reviewer verdict. Forced to false at finalization.
    pub iteration_needed: bool,

    /// Orchestrator turns taken so far.
    pub round_count: u32,
    pub max_rounds: u32,

    /// Current draft: set at Create, replaced at every Revise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<ReportDraft>,

    /// Feedback awaiting revision. Cleared once the revision is submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackCollection>,

    /// Most recent revision, kept for its `changes_made` trail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised: Option<RevisedReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_artifact: Option<FinalReport>,

    /// The iteration budget overrode a reviewer request for another pass.
    pub budget_forced: bool,

    pub has_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Every stage transition, oldest first.
    #[serde(default)]
    pub history: Vec<StageTransition>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Context {
    /// Build a fresh context for a new run.
    pub fn from_template(
        template: &ContextTemplate,
        session_id: impl Into<String>,
        kind: RunKind,
    ) -> Result<Self, ContextError> {
        template.validate()?;
        let now = Utc::now();
        Ok(Self {
            run_id: Uuid::new_v4(),
            session_id: session_id.into(),
            kind,
            version: 0,
            stage: Stage::Idle,
            iteration_count: 0,
            max_iterations: template.max_iterations,
            iteration_needed: true,
            round_count: 0,
            max_rounds: template.max_rounds,
            draft: None,
            feedback: None,
            revised: None,
            final_artifact: None,
            budget_forced: false,
            has_error: false,
            error_stage: None,
            error_message: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_terminated(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Review/revise cycles left after the current one.
    pub fn iterations_remaining(&self) -> u32 {
        self.max_iterations.saturating_sub(self.iteration_count)
    }

    /// Number of times the run has entered `stage`.
    pub fn times_entered(&self, stage: Stage) -> usize {
        self.history.iter().filter(|t| t.to == stage).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_idle() {
        let ctx = Context::from_template(&ContextTemplate::default(), "1", RunKind::Session)
            .unwrap();
        assert_eq!(ctx.stage, Stage::Idle);
        assert_eq!(ctx.iteration_count, 0);
        assert_eq!(ctx.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(ctx.max_rounds, DEFAULT_MAX_ROUNDS);
        assert_eq!(ctx.version, 0);
        assert!(ctx.draft.is_none());
        assert!(!ctx.has_error);
    }

    #[test]
    fn each_context_gets_its_own_run_id() {
        let template = ContextTemplate::default();
        let a = Context::from_template(&template, "1", RunKind::Session).unwrap();
        let b = Context::from_template(&template, "1", RunKind::Session).unwrap();
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn iterations_remaining_counts_down_to_zero() {
        let mut ctx = Context::from_template(&ContextTemplate::new(3, 10), "1", RunKind::Session)
            .unwrap();
        assert_eq!(ctx.iterations_remaining(), 3);
        ctx.iteration_count = 1;
        assert_eq!(ctx.iterations_remaining(), 2);
        ctx.iteration_count = 3;
        assert_eq!(ctx.iterations_remaining(), 0);
        ctx.iteration_count = 4;
        assert_eq!(ctx.iterations_remaining(), 0);
    }

    #[test]
    fn zero_iteration_budget_is_rejected() {
        let result = Context::from_template(&ContextTemplate::new(0, 10), "1", RunKind::Session);
        assert!(matches!(result, Err(ContextError::InvalidTemplate(_))));
    }

    #[test]
    fn zero_round_budget_is_rejected() {
        let result = Context::from_template(&ContextTemplate::new(2, 0), "1", RunKind::Session);
        assert!(matches!(result, Err(ContextError::InvalidTemplate(_))));
    }

    #[test]
    fn optional_fields_omitted_from_json() {
        let ctx = Context::from_template(&ContextTemplate::default(), "1", RunKind::Combining)
            .unwrap();
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(!json.contains("final_artifact"));
        assert!(!json.contains("error_message"));
        assert!(json.contains("\"kind\":\"combining\""));
    }

    #[test]
    fn template_fields_default_when_missing() {
        let template: ContextTemplate = serde_json::from_str(r#"{"max_iterations": 5}"#).unwrap();
        assert_eq!(template.max_iterations, 5);
        assert_eq!(template.max_rounds, DEFAULT_MAX_ROUNDS);
    }
}
