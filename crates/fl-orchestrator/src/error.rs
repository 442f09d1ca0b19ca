// error.rs — Error types for the orchestrator.
//
// Two families:
// - Contract violations (State, ActionNotPermitted): a bug in a role or in
//   the wiring. The run aborts immediately; nothing is recorded or retried.
// - Recordable failures (Adapter, Validation, Generation): written into the
//   Context (has_error / error_stage / error_message) and surfaced to the
//   caller as a failed run.

use fl_adapters::AdapterError;
use fl_context::{ContextError, Stage, ValidationError};
use fl_policy::{ActionName, PolicyError, Role};
use thiserror::Error;

/// Errors that can occur while driving a run.
#[derive(Debug, Error)]
pub enum LoopError {
    /// A transition was attempted from the wrong stage, after termination,
    /// or while an error was latched.
    #[error("state error: {0}")]
    State(#[source] ContextError),

    /// A role invoked an action outside its grants.
    #[error("action '{action}' not permitted for role '{role}' during '{stage}': {reason}")]
    ActionNotPermitted {
        role: Role,
        action: ActionName,
        stage: Stage,
        reason: String,
    },

    /// An action payload failed schema validation.
    #[error("invalid payload for '{action}': {source}")]
    Validation {
        action: ActionName,
        source: ValidationError,
    },

    /// An I/O adapter failed.
    #[error("adapter error in '{action}': {source}")]
    Adapter {
        action: ActionName,
        source: AdapterError,
    },

    /// The content generator could not produce a payload.
    #[error("content generation failed for '{action}': {source}")]
    Generation {
        action: ActionName,
        source: GenerationError,
    },

    /// Context construction or persistence failed.
    #[error("context error: {0}")]
    Context(#[source] ContextError),

    /// The permission table could not be built or loaded.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Project configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A parallel session worker panicked.
    #[error("session worker for '{0}' panicked")]
    WorkerPanicked(String),
}

impl LoopError {
    /// True for errors that abort a run without being recorded into it.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            LoopError::State(_) | LoopError::ActionNotPermitted { .. }
        )
    }

    /// The `error_stage` label recorded into the Context, for recordable errors.
    pub fn error_stage(&self) -> Option<&'static str> {
        match self {
            LoopError::Validation { action, .. }
            | LoopError::Adapter { action, .. }
            | LoopError::Generation { action, .. } => Some(action.as_str()),
            _ => None,
        }
    }
}

impl From<ContextError> for LoopError {
    fn from(e: ContextError) -> Self {
        match e {
            e if e.is_state_error() => LoopError::State(e),
            e => LoopError::Context(e),
        }
    }
}

/// Failure of the opaque content-generation capability.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A scripted generator has no response left for this role.
    #[error("no scripted response left for role '{0}'")]
    Exhausted(Role),

    /// The request lacked something the generator needs.
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("{0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_context::{Context, ContextTemplate, RunKind};

    fn run_id() -> Context {
        Context::from_template(&ContextTemplate::default(), "1", RunKind::Session).unwrap()
    }

    #[test]
    fn state_errors_map_to_contract_violations() {
        let ctx = run_id();
        let err: LoopError = ContextError::InvalidStage {
            run_id: ctx.run_id,
            expected: Stage::Revise,
            actual: Stage::Create,
        }
        .into();
        assert!(err.is_contract_violation());
        assert!(err.error_stage().is_none());
    }

    #[test]
    fn round_budget_is_not_a_contract_violation() {
        let ctx = run_id();
        let err: LoopError = ContextError::RoundBudgetExhausted {
            run_id: ctx.run_id,
            max_rounds: 5,
        }
        .into();
        assert!(matches!(
            err,
            LoopError::Context(ContextError::RoundBudgetExhausted { max_rounds: 5, .. })
        ));
        assert!(!err.is_contract_violation());
    }

    #[test]
    fn adapter_errors_name_their_action() {
        let err = LoopError::Adapter {
            action: ActionName::ReadTranscript,
            source: AdapterError::not_found("transcript", "x"),
        };
        assert_eq!(err.error_stage(), Some("read_transcript"));
        assert!(!err.is_contract_violation());
    }
}
