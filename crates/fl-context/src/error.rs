// error.rs — Error types for the run context and stage controller.

use thiserror::Error;
use uuid::Uuid;

use crate::stage::Stage;

/// Errors that can occur while mutating or persisting a run context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize context data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The requested run was not found in the store.
    #[error("run not found: {0}")]
    NotFound(Uuid),

    /// A transition was attempted from the wrong stage.
    #[error("invalid stage for run {run_id}: expected {expected}, found {actual}")]
    InvalidStage {
        run_id: Uuid,
        expected: Stage,
        actual: Stage,
    },

    /// The run has already produced its final artifact.
    #[error("run {run_id} is terminated: '{operation}' needs a live stage, found terminated")]
    Terminated { run_id: Uuid, operation: String },

    /// A transition was attempted while an adapter or validation error is recorded.
    #[error(
        "run {run_id} has a recorded error from '{error_stage}': expected {expected}, found {actual}"
    )]
    ErrorLatched {
        run_id: Uuid,
        error_stage: String,
        expected: Stage,
        actual: Stage,
    },

    /// Every round in the run's budget has been taken.
    #[error("round budget exhausted for run {run_id} after {max_rounds} rounds")]
    RoundBudgetExhausted { run_id: Uuid, max_rounds: u32 },

    /// The template a context is built from is unusable.
    #[error("invalid context template: {0}")]
    InvalidTemplate(String),
}

impl ContextError {
    /// True for the transition-guard failures (wrong stage, terminated, error latched).
    ///
    /// These are contract violations: the orchestrator aborts on them instead
    /// of recording them into the context.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            ContextError::InvalidStage { .. }
                | ContextError::Terminated { .. }
                | ContextError::ErrorLatched { .. }
        )
    }
}

/// A payload failed schema validation at the action boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid field '{field}': {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
