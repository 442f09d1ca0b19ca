// registry.rs — ActionRegistry: the only path from a role to a transition.
//
// Every mutating call goes through `invoke()`, in this order:
//
// 1. State guard: the controller must accept a transition out of the call's
//    source stage (not terminated, no latched error, right stage).
// 2. Permission: the table must grant the action to the invoking role in
//    the current stage (default deny).
// 3. Content validation: a failure is recorded into the Context.
// 4. Transition (for finalize_report: write the report first, then seal).
//
// Steps 1 and 2 are contract violations and leave the Context untouched.

use fl_adapters::ReportSink;
use fl_context::{Context, FinalReport, RevisionOutcome, Stage, StageController};
use fl_policy::{ActionName, PermissionDecision, PermissionRequest, PermissionTable, Role};

use crate::error::LoopError;
use crate::payload::ActionCall;

/// Result of a successful action call.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: ActionName,
    /// Human-readable status line.
    pub message: String,
    /// Stage before the call.
    pub from_stage: Stage,
    /// Where the final report was written, for `finalize_report`.
    pub persisted_to: Option<String>,
    /// The sealed report, once the run has terminated.
    pub report: Option<FinalReport>,
    /// Snapshot of the Context after the transition.
    pub context: Context,
}

/// Maps action calls to stage-controller transitions behind the permission table.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    table: PermissionTable,
}

impl ActionRegistry {
    pub fn new(table: PermissionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    /// Check a (role, action) pair against the table in `stage`.
    pub fn authorize(&self, role: Role, action: ActionName, stage: Stage) -> Result<(), LoopError> {
        authorize(&self.table, role, action, stage)
    }

    /// Run one action call for `role` against the controller.
    pub fn invoke(
        &self,
        role: Role,
        call: ActionCall,
        controller: &mut StageController,
        sink: &dyn ReportSink,
    ) -> Result<ActionOutcome, LoopError> {
        let action = call.name();
        let from_stage = controller.stage();

        controller.expect_stage(call.source_stage())?;
        self.authorize(role, action, from_stage)?;

        if let Err(source) = call.validate() {
            controller.record_error(action.as_str(), source.to_string())?;
            return Err(LoopError::Validation { action, source });
        }

        let mut persisted_to = None;
        let mut report = None;
        let message = match call {
            ActionCall::StartRun(args) => {
                controller.start()?;
                tracing::debug!(seed = %args.seed, "run started");
                "Report creation started.".to_string()
            }
            ActionCall::SubmitDraft(draft) => {
                controller.submit_draft(draft)?;
                "Draft submitted. Moving to review.".to_string()
            }
            ActionCall::SubmitFeedback(feedback) => {
                let needed = feedback.iteration_needed;
                let severity = feedback
                    .highest_severity()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string());
                controller.submit_feedback(feedback)?;
                format!(
                    "Feedback submitted (iteration needed: {}, highest severity: {}). Moving to revision.",
                    needed, severity
                )
            }
            ActionCall::SubmitRevision(revised) => match controller.submit_revision(revised)? {
                RevisionOutcome::AnotherPass { iteration } => {
                    format!("Report revised. Starting review pass {}.", iteration)
                }
                RevisionOutcome::Finalize { forced: false } => {
                    "Revisions complete. Moving to finalization.".to_string()
                }
                RevisionOutcome::Finalize { forced: true } => {
                    "Iteration budget exhausted. Moving to finalization.".to_string()
                }
            },
            ActionCall::FinalizeReport(draft) => {
                let session_id = controller.context().session_id.clone();
                let location = match sink.write_report(&session_id, &draft.title, &draft.content) {
                    Ok(location) => location,
                    Err(source) => {
                        controller.record_error(action.as_str(), source.to_string())?;
                        return Err(LoopError::Adapter { action, source });
                    }
                };
                let sealed = controller.finalize(draft)?;
                let message = format!(
                    "Report finalized and written to {} (converged: {}).",
                    location, sealed.converged
                );
                persisted_to = Some(location);
                report = Some(sealed);
                message
            }
        };

        Ok(ActionOutcome {
            action,
            message,
            from_stage,
            persisted_to,
            report,
            context: controller.context().clone(),
        })
    }
}

/// Evaluate one request against `table`, turning a deny into a contract violation.
pub(crate) fn authorize(
    table: &PermissionTable,
    role: Role,
    action: ActionName,
    stage: Stage,
) -> Result<(), LoopError> {
    let request = PermissionRequest {
        role,
        action,
        stage,
    };
    match table.evaluate(&request) {
        PermissionDecision::Allow => Ok(()),
        PermissionDecision::Deny { reason } => {
            tracing::warn!(%role, %action, %stage, %reason, "action denied");
            Err(LoopError::ActionNotPermitted {
                role,
                action,
                stage,
                reason,
            })
        }
    }
}
