// scenarios.rs — End-to-end runs through the orchestrator.
//
// Each test drives a full run with memory adapters and a scripted
// generator, then checks the stage history recorded in the Context:
//
//   A. reviewer converges on pass 2 of 2    → 2 reviews, 2 revisions, finalize
//   B. reviewer never converges, budget 1   → forced finalize, report flagged
//   C. transcript missing                   → adapter error latched in Create
//   D. revision submitted during Create     → state error, Context unchanged
//   E. combining run over prior reports     → same stage history as A and B

use fl_adapters::{AdapterSet, MemoryReportStore, MemoryTranscripts, StaticInstructions};
use fl_context::{
    Context, ContextError, ContextTemplate, RevisedReport, RunKind, Stage, StageController,
};
use fl_orchestrator::{
    ActionCall, ActionRegistry, LoopError, Orchestrator, RoleAgent, RunOutcome, RunRequest,
    ScriptedGenerator, Toolkit,
};
use fl_policy::Role;
use serde_json::{json, Value};

fn adapters(reports: &MemoryReportStore) -> AdapterSet {
    AdapterSet::new(
        MemoryTranscripts::new()
            .with("1", "Alice: the launch slips a week.\nBob: agreed.")
            .with("2", "Carol: budget approved."),
        StaticInstructions::new("Summarize the decisions."),
        reports.clone(),
        reports.clone(),
    )
}

fn draft(title: &str) -> Value {
    json!({ "title": title, "content": format!("{} body", title) })
}

fn feedback(iteration_needed: bool) -> Value {
    json!({
        "items": [{
            "section": "Decisions",
            "feedback": "List who agreed.",
            "severity": "moderate",
            "recommendation": "Name the participants."
        }],
        "overall_assessment": "Mostly complete.",
        "priority_issues": ["participants"],
        "iteration_needed": iteration_needed
    })
}

fn revision(n: u32) -> Value {
    json!({
        "title": "Report",
        "content": format!("Revision {} body", n),
        "changes_made": [format!("revision {}", n)]
    })
}

/// Script for a run whose reviewer returns `verdicts` in order.
fn script(verdicts: &[bool]) -> ScriptedGenerator {
    let mut generator = ScriptedGenerator::new();
    generator.push(Role::Drafter, draft("Report"));
    for (i, needed) in verdicts.iter().enumerate() {
        generator.push(Role::Reviewer, feedback(*needed));
        generator.push(Role::Revisor, revision(i as u32 + 1));
    }
    generator.push(Role::Finalizer, json!({ "title": "Final", "content": "Final body" }));
    generator
}

fn stage_path(ctx: &Context) -> Vec<(Stage, Stage)> {
    ctx.history.iter().map(|t| (t.from, t.to)).collect()
}

#[test]
fn scenario_a_reviewer_converges_within_budget() {
    let reports = MemoryReportStore::new();
    let mut orchestrator = Orchestrator::new(ActionRegistry::default(), adapters(&reports));
    let mut generator = script(&[true, false]);

    let outcome = orchestrator
        .run(
            &RunRequest::session("1", "Write the session report."),
            &ContextTemplate::new(2, 50),
            &mut generator,
        )
        .unwrap();

    let (report, context) = match outcome {
        RunOutcome::Completed { report, context } => (report, context),
        other => panic!("expected a completed run, got {:?}", other),
    };
    assert_eq!(context.times_entered(Stage::Review), 2);
    assert_eq!(context.times_entered(Stage::Revise), 2);
    assert_eq!(context.times_entered(Stage::Finalize), 1);
    assert_eq!(context.iteration_count, 2);
    assert!(!context.iteration_needed);
    assert!(!context.budget_forced);
    assert!(report.converged);
    assert_eq!(report.content, "Final body");
    assert_eq!(reports.get("1").unwrap().content, "Final body");
}

#[test]
fn scenario_b_budget_forces_finalize() {
    let reports = MemoryReportStore::new();
    let mut orchestrator = Orchestrator::new(ActionRegistry::default(), adapters(&reports));
    // The reviewer would keep asking for passes; only the first is consumed.
    let mut generator = script(&[true, true, true]);

    let outcome = orchestrator
        .run(
            &RunRequest::session("1", "Write the session report."),
            &ContextTemplate::new(1, 50),
            &mut generator,
        )
        .unwrap();

    let (report, context) = match outcome {
        RunOutcome::Completed { report, context } => (report, context),
        other => panic!("expected a completed run, got {:?}", other),
    };
    assert_eq!(context.times_entered(Stage::Review), 1);
    assert_eq!(context.times_entered(Stage::Revise), 1);
    assert!(context.budget_forced);
    assert!(!report.converged);
    assert!(reports.get("1").is_some());
    assert_eq!(generator.remaining(Role::Reviewer), 2);
}

#[test]
fn scenario_c_missing_transcript_latches_adapter_error() {
    let reports = MemoryReportStore::new();
    let mut orchestrator = Orchestrator::new(ActionRegistry::default(), adapters(&reports));
    let mut generator = script(&[false]);

    let outcome = orchestrator
        .run(
            &RunRequest::session("404", "Write the session report."),
            &ContextTemplate::default(),
            &mut generator,
        )
        .unwrap();

    let (context, error) = match outcome {
        RunOutcome::Failed { context, error } => (context, error),
        other => panic!("expected a failed run, got {:?}", other),
    };
    assert!(matches!(error, LoopError::Adapter { .. }));
    assert!(context.has_error);
    assert_eq!(context.error_stage.as_deref(), Some("read_transcript"));
    assert!(context.error_message.is_some());
    assert_eq!(context.stage, Stage::Create);
    assert!(context.draft.is_none());
    assert!(reports.is_empty());
}

#[test]
fn scenario_d_revision_during_create_is_a_state_error() {
    let ctx = Context::from_template(&ContextTemplate::default(), "1", RunKind::Session).unwrap();
    let mut controller = StageController::new(ctx);
    controller.start().unwrap();
    let before = controller.context().clone();

    // Straight to the controller.
    let err = controller
        .submit_revision(RevisedReport {
            title: "T".to_string(),
            content: "C".to_string(),
            changes_made: vec![],
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ContextError::InvalidStage {
            expected: Stage::Revise,
            actual: Stage::Create,
            ..
        }
    ));
    assert_eq!(controller.context(), &before);

    // Through the registry, as the role that owns the action.
    let reports = MemoryReportStore::new();
    let err = ActionRegistry::default()
        .invoke(
            Role::Revisor,
            ActionCall::SubmitRevision(RevisedReport {
                title: "T".to_string(),
                content: "C".to_string(),
                changes_made: vec![],
            }),
            &mut controller,
            &reports,
        )
        .unwrap_err();
    assert!(matches!(err, LoopError::State(_)));
    assert_eq!(controller.context(), &before);
}

/// A drafter that skips ahead and submits a revision instead of a draft.
struct SkippingDrafter;

impl RoleAgent for SkippingDrafter {
    fn role(&self) -> Role {
        Role::Drafter
    }

    fn take_turn(&mut self, _toolkit: &mut Toolkit<'_>) -> Result<ActionCall, LoopError> {
        Ok(ActionCall::SubmitRevision(RevisedReport {
            title: "T".to_string(),
            content: "C".to_string(),
            changes_made: vec![],
        }))
    }
}

#[test]
fn scenario_d_misbehaving_agent_aborts_the_run() {
    let reports = MemoryReportStore::new();
    let mut orchestrator = Orchestrator::new(ActionRegistry::default(), adapters(&reports))
        .with_agent(Box::new(SkippingDrafter));

    let err = orchestrator
        .run(
            &RunRequest::session("1", "Write the session report."),
            &ContextTemplate::default(),
            &mut script(&[false]),
        )
        .unwrap_err();

    assert!(err.is_contract_violation());
    assert!(matches!(err, LoopError::State(_)));
    assert!(reports.is_empty());
}

#[test]
fn scenario_e_combining_run_follows_the_same_stages() {
    let reports = MemoryReportStore::new();
    reports.insert("1", "Session 1", "Launch slips a week.");
    reports.insert("2", "Session 2", "Budget approved.");

    for (verdicts, max_iterations) in [(vec![true, false], 2), (vec![true, true], 1)] {
        let mut session = Orchestrator::new(ActionRegistry::default(), adapters(&reports));
        let session_outcome = session
            .run(
                &RunRequest::session("1", "Write the session report."),
                &ContextTemplate::new(max_iterations, 50),
                &mut script(&verdicts),
            )
            .unwrap();

        let mut combining = Orchestrator::new(ActionRegistry::default(), adapters(&reports));
        let combined_outcome = combining
            .run(
                &RunRequest::combining(
                    "combined",
                    vec!["1".to_string(), "2".to_string()],
                    "Combine the session reports.",
                ),
                &ContextTemplate::new(max_iterations, 50),
                &mut script(&verdicts),
            )
            .unwrap();

        assert!(session_outcome.is_completed());
        assert!(combined_outcome.is_completed());
        assert_eq!(combined_outcome.context().kind, RunKind::Combining);
        assert_eq!(
            stage_path(session_outcome.context()),
            stage_path(combined_outcome.context())
        );
        assert_eq!(
            session_outcome.report().map(|r| r.converged),
            combined_outcome.report().map(|r| r.converged)
        );
    }
    assert!(reports.get("combined").is_some());
}

#[test]
fn combining_run_with_missing_prior_report_fails() {
    let reports = MemoryReportStore::new();
    reports.insert("1", "Session 1", "Launch slips a week.");
    let mut orchestrator = Orchestrator::new(ActionRegistry::default(), adapters(&reports));

    let outcome = orchestrator
        .run(
            &RunRequest::combining(
                "combined",
                vec!["1".to_string(), "2".to_string()],
                "Combine the session reports.",
            ),
            &ContextTemplate::default(),
            &mut script(&[false]),
        )
        .unwrap();

    assert_eq!(outcome.status(), "failed");
    assert_eq!(
        outcome.context().error_stage.as_deref(),
        Some("read_prior_reports")
    );
}
