// controller.rs — StageController: the run state machine.
//
// The controller owns the run's Context and is the only way to mutate it.
// Every operation checks its guards before touching any field, so a rejected
// call leaves the Context exactly as it was (version included).
//
// Guard order for stage transitions:
//   1. Terminated        → ContextError::Terminated
//   2. has_error latched → ContextError::ErrorLatched
//   3. wrong stage       → ContextError::InvalidStage
//
// Convergence-by-budget: when the reviewer asks for another pass but
// iteration_count == max_iterations, submit_revision goes to Finalize anyway.
// Every run therefore reaches Finalize after at most max_iterations reviews.

use chrono::Utc;

use crate::artifact::{FeedbackCollection, FinalReport, ReportDraft, RevisedReport};
use crate::context::{Context, StageTransition};
use crate::error::ContextError;
use crate::stage::Stage;

/// Where a submitted revision sent the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionOutcome {
    /// Back to Review for pass number `iteration`.
    AnotherPass { iteration: u32 },
    /// On to Finalize. `forced` is true when the iteration budget overrode
    /// the reviewer's request for another pass.
    Finalize { forced: bool },
}

/// Drives one run's Context through the stage graph.
#[derive(Debug, Clone)]
pub struct StageController {
    ctx: Context,
}

impl StageController {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Hand the Context back to the caller (for persistence or diagnostics).
    pub fn into_context(self) -> Context {
        self.ctx
    }

    pub fn stage(&self) -> Stage {
        self.ctx.stage
    }

    pub fn is_terminal(&self) -> bool {
        self.ctx.is_terminated()
    }

    /// Check that a transition out of `expected` would currently be accepted.
    ///
    /// Lets callers run side effects (like persisting the final report) only
    /// when the transition that follows them cannot be rejected.
    pub fn expect_stage(&self, expected: Stage) -> Result<(), ContextError> {
        self.guard(expected, expected.as_str())
    }

    /// Idle → Create. Starts the first iteration.
    pub fn start(&mut self) -> Result<(), ContextError> {
        self.guard(Stage::Idle, "start")?;
        self.ctx.iteration_count = 1;
        self.move_to(Stage::Create);
        Ok(())
    }

    /// Create → Review. Stores the first draft.
    pub fn submit_draft(&mut self, draft: ReportDraft) -> Result<(), ContextError> {
        self.guard(Stage::Create, "submit_draft")?;
        self.ctx.draft = Some(draft);
        self.move_to(Stage::Review);
        Ok(())
    }

    /// Review → Revise. Stores the feedback and its `iteration_needed` verdict.
    pub fn submit_feedback(&mut self, feedback: FeedbackCollection) -> Result<(), ContextError> {
        self.guard(Stage::Review, "submit_feedback")?;
        self.ctx.iteration_needed = feedback.iteration_needed;
        self.ctx.feedback = Some(feedback);
        self.move_to(Stage::Revise);
        Ok(())
    }

    /// Revise → Review (another pass) or Revise → Finalize.
    ///
    /// Loops back only when the reviewer asked for another pass and
    /// `iteration_count < max_iterations`. The revision replaces the draft
    /// either way, and the consumed feedback is cleared.
    pub fn submit_revision(
        &mut self,
        revised: RevisedReport,
    ) -> Result<RevisionOutcome, ContextError> {
        self.guard(Stage::Revise, "submit_revision")?;

        let wants_another_pass = self.ctx.iteration_needed;
        let budget_left = self.ctx.iteration_count < self.ctx.max_iterations;

        self.ctx.draft = Some(revised.to_draft());
        self.ctx.revised = Some(revised);
        self.ctx.feedback = None;

        if wants_another_pass && budget_left {
            self.ctx.iteration_count += 1;
            self.move_to(Stage::Review);
            return Ok(RevisionOutcome::AnotherPass {
                iteration: self.ctx.iteration_count,
            });
        }

        if wants_another_pass {
            tracing::warn!(
                run_id = %self.ctx.run_id,
                iteration = self.ctx.iteration_count,
                max_iterations = self.ctx.max_iterations,
                "iteration budget exhausted; forcing finalize"
            );
            self.ctx.budget_forced = true;
        }
        self.move_to(Stage::Finalize);
        Ok(RevisionOutcome::Finalize {
            forced: wants_another_pass,
        })
    }

    /// Finalize → Terminated. Seals the final artifact; the run is immutable afterwards.
    pub fn finalize(&mut self, report: ReportDraft) -> Result<FinalReport, ContextError> {
        self.guard(Stage::Finalize, "finalize")?;
        let sealed = FinalReport::seal(report, !self.ctx.budget_forced);
        self.ctx.iteration_needed = false;
        self.ctx.final_artifact = Some(sealed.clone());
        self.move_to(Stage::Terminated);
        Ok(sealed)
    }

    /// Latch an adapter or validation error. The stage is left unchanged.
    pub fn record_error(
        &mut self,
        error_stage: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), ContextError> {
        if self.ctx.is_terminated() {
            return Err(ContextError::Terminated {
                run_id: self.ctx.run_id,
                operation: "record_error".to_string(),
            });
        }
        self.ctx.has_error = true;
        self.ctx.error_stage = Some(error_stage.into());
        self.ctx.error_message = Some(message.into());
        self.touch();
        Ok(())
    }

    /// Count one orchestrator turn against the round budget.
    ///
    /// Returns the number of the round being started.
    pub fn begin_round(&mut self) -> Result<u32, ContextError> {
        if self.ctx.is_terminated() {
            return Err(ContextError::Terminated {
                run_id: self.ctx.run_id,
                operation: "begin_round".to_string(),
            });
        }
        if self.ctx.round_count >= self.ctx.max_rounds {
            return Err(ContextError::RoundBudgetExhausted {
                run_id: self.ctx.run_id,
                max_rounds: self.ctx.max_rounds,
            });
        }
        self.ctx.round_count += 1;
        self.touch();
        Ok(self.ctx.round_count)
    }

    fn guard(&self, expected: Stage, operation: &str) -> Result<(), ContextError> {
        let ctx = &self.ctx;
        if ctx.is_terminated() {
            return Err(ContextError::Terminated {
                run_id: ctx.run_id,
                operation: operation.to_string(),
            });
        }
        if ctx.has_error {
            return Err(ContextError::ErrorLatched {
                run_id: ctx.run_id,
                error_stage: ctx.error_stage.clone().unwrap_or_default(),
                expected,
                actual: ctx.stage,
            });
        }
        if ctx.stage != expected {
            return Err(ContextError::InvalidStage {
                run_id: ctx.run_id,
                expected,
                actual: ctx.stage,
            });
        }
        Ok(())
    }

    fn move_to(&mut self, next: Stage) {
        let from = self.ctx.stage;
        debug_assert!(from.can_transition_to(next), "{} -> {}", from, next);
        self.ctx.stage = next;
        self.ctx.history.push(StageTransition {
            from,
            to: next,
            iteration: self.ctx.iteration_count,
            at: Utc::now(),
        });
        self.touch();
        tracing::debug!(
            run_id = %self.ctx.run_id,
            from = %from,
            to = %next,
            iteration = self.ctx.iteration_count,
            "stage transition"
        );
    }

    fn touch(&mut self) {
        self.ctx.version += 1;
        self.ctx.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextTemplate, RunKind};

    fn controller(max_iterations: u32) -> StageController {
        let ctx = Context::from_template(
            &ContextTemplate::new(max_iterations, 50),
            "1",
            RunKind::Session,
        )
        .unwrap();
        StageController::new(ctx)
    }

    fn draft() -> ReportDraft {
        ReportDraft::new("Session 1", "First draft")
    }

    fn feedback(iteration_needed: bool) -> FeedbackCollection {
        FeedbackCollection {
            items: vec![],
            overall_assessment: "Reasonable".to_string(),
            priority_issues: vec!["Tighten summary".to_string()],
            iteration_needed,
        }
    }

    fn revision(n: u32) -> RevisedReport {
        RevisedReport {
            title: "Session 1".to_string(),
            content: format!("Revision {}", n),
            changes_made: vec![format!("change {}", n)],
        }
    }

    /// Drive a controller to the Revise stage of its first pass.
    fn at_first_revise(max_iterations: u32, iteration_needed: bool) -> StageController {
        let mut c = controller(max_iterations);
        c.start().unwrap();
        c.submit_draft(draft()).unwrap();
        c.submit_feedback(feedback(iteration_needed)).unwrap();
        c
    }

    #[test]
    fn start_enters_create_at_iteration_one() {
        let mut c = controller(2);
        c.start().unwrap();
        assert_eq!(c.stage(), Stage::Create);
        assert_eq!(c.context().iteration_count, 1);
    }

    #[test]
    fn start_twice_is_a_state_error() {
        let mut c = controller(2);
        c.start().unwrap();
        let err = c.start().unwrap_err();
        assert!(err.is_state_error());
        assert!(matches!(
            err,
            ContextError::InvalidStage {
                expected: Stage::Idle,
                actual: Stage::Create,
                ..
            }
        ));
    }

    #[test]
    fn revision_during_create_leaves_context_unchanged() {
        let mut c = controller(2);
        c.start().unwrap();
        let before = c.context().clone();

        let err = c.submit_revision(revision(1)).unwrap_err();
        assert!(matches!(
            err,
            ContextError::InvalidStage {
                expected: Stage::Revise,
                actual: Stage::Create,
                ..
            }
        ));
        assert_eq!(c.context(), &before);
    }

    #[test]
    fn second_feedback_before_revision_is_rejected() {
        let mut c = at_first_revise(3, true);
        let before = c.context().clone();

        let err = c.submit_feedback(feedback(false)).unwrap_err();
        assert!(matches!(
            err,
            ContextError::InvalidStage {
                expected: Stage::Review,
                actual: Stage::Revise,
                ..
            }
        ));
        assert_eq!(c.context(), &before);
        assert_eq!(c.context().times_entered(Stage::Revise), 1);
    }

    #[test]
    fn iteration_needed_loops_back_while_budget_remains() {
        let mut c = at_first_revise(2, true);
        let outcome = c.submit_revision(revision(1)).unwrap();
        assert_eq!(outcome, RevisionOutcome::AnotherPass { iteration: 2 });
        assert_eq!(c.stage(), Stage::Review);
        assert!(c.context().feedback.is_none());
        assert_eq!(c.context().draft.as_ref().unwrap().content, "Revision 1");
    }

    #[test]
    fn no_iteration_needed_goes_to_finalize() {
        let mut c = at_first_revise(3, false);
        let outcome = c.submit_revision(revision(1)).unwrap();
        assert_eq!(outcome, RevisionOutcome::Finalize { forced: false });
        assert_eq!(c.stage(), Stage::Finalize);
        assert_eq!(c.context().iteration_count, 1);
        assert!(!c.context().budget_forced);
    }

    #[test]
    fn exhausted_budget_forces_finalize() {
        let mut c = at_first_revise(1, true);
        let outcome = c.submit_revision(revision(1)).unwrap();
        assert_eq!(outcome, RevisionOutcome::Finalize { forced: true });
        assert!(c.context().budget_forced);

        let report = c.finalize(ReportDraft::new("Final", "Done")).unwrap();
        assert!(!report.converged);
        assert_eq!(c.context().iteration_count, 1);
    }

    #[test]
    fn iteration_count_never_exceeds_budget() {
        let mut c = controller(3);
        c.start().unwrap();
        c.submit_draft(draft()).unwrap();
        let mut n = 0;
        while c.stage() != Stage::Finalize {
            c.submit_feedback(feedback(true)).unwrap();
            n += 1;
            c.submit_revision(revision(n)).unwrap();
            assert!(c.context().iteration_count <= c.context().max_iterations);
        }
        assert_eq!(n, 3);
        assert_eq!(c.context().times_entered(Stage::Review), 3);
    }

    #[test]
    fn finalize_terminates_and_clears_iteration_needed() {
        let mut c = at_first_revise(2, false);
        c.submit_revision(revision(1)).unwrap();
        let report = c.finalize(ReportDraft::new("Final", "Done")).unwrap();

        assert!(report.converged);
        assert!(c.is_terminal());
        assert!(!c.context().iteration_needed);
        assert_eq!(c.context().final_artifact.as_ref(), Some(&report));
    }

    #[test]
    fn terminated_run_rejects_every_mutation() {
        let mut c = at_first_revise(1, false);
        c.submit_revision(revision(1)).unwrap();
        c.finalize(ReportDraft::new("Final", "Done")).unwrap();
        let before = c.context().clone();

        assert!(matches!(
            c.finalize(ReportDraft::new("Again", "Again")),
            Err(ContextError::Terminated { .. })
        ));
        assert!(c.start().unwrap_err().is_state_error());
        assert!(c.submit_draft(draft()).unwrap_err().is_state_error());
        assert!(c.record_error("x", "y").is_err());
        assert!(c.begin_round().is_err());
        assert_eq!(c.context(), &before);
    }

    #[test]
    fn latched_error_blocks_transitions() {
        let mut c = controller(2);
        c.start().unwrap();
        c.record_error("read_transcript", "transcript not found").unwrap();
        assert_eq!(c.stage(), Stage::Create);

        let err = c.submit_draft(draft()).unwrap_err();
        match err {
            ContextError::ErrorLatched {
                error_stage,
                expected,
                actual,
                ..
            } => {
                assert_eq!(error_stage, "read_transcript");
                assert_eq!(expected, Stage::Create);
                assert_eq!(actual, Stage::Create);
            }
            other => panic!("expected ErrorLatched, got {:?}", other),
        }
        assert!(c.context().draft.is_none());
    }

    #[test]
    fn round_budget_is_enforced() {
        let ctx =
            Context::from_template(&ContextTemplate::new(2, 2), "1", RunKind::Session).unwrap();
        let mut c = StageController::new(ctx);
        assert_eq!(c.begin_round().unwrap(), 1);
        assert_eq!(c.begin_round().unwrap(), 2);
        assert!(matches!(
            c.begin_round(),
            Err(ContextError::RoundBudgetExhausted { max_rounds: 2, .. })
        ));
        assert_eq!(c.context().round_count, 2);
    }

    #[test]
    fn every_mutation_bumps_version() {
        let mut c = controller(2);
        let v0 = c.context().version;
        c.begin_round().unwrap();
        c.start().unwrap();
        c.submit_draft(draft()).unwrap();
        assert_eq!(c.context().version, v0 + 3);
    }

    #[test]
    fn history_records_each_transition() {
        let mut c = at_first_revise(2, false);
        c.submit_revision(revision(1)).unwrap();
        let path: Vec<Stage> = c.context().history.iter().map(|t| t.to).collect();
        assert_eq!(
            path,
            vec![Stage::Create, Stage::Review, Stage::Revise, Stage::Finalize]
        );
    }
}
