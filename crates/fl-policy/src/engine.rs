// engine.rs — Permission evaluation.
//
// Every action call passes through `evaluate()` before it runs:
//
// 1. Does any grant mention the action? → No → Deny
// 2. Does the invoking role hold a grant for it? → No → Deny
// 3. Does that grant cover the current stage? → No → Deny
// 4. Allow
//
// Checks 2 and 3 are reported separately so a wrong-role call and a
// wrong-stage call are each individually identifiable.

use fl_context::Stage;
use serde::{Deserialize, Serialize};

use crate::action::ActionName;
use crate::role::Role;
use crate::table::PermissionTable;

/// A request to invoke an action, submitted to the table for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionRequest {
    pub role: Role,
    pub action: ActionName,
    /// The run's stage at the time of the call.
    pub stage: Stage,
}

/// The result of a permission evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PermissionDecision {
    Allow,
    Deny { reason: String },
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionDecision::Allow)
    }
}

/// One check performed during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationStep {
    /// Which check was performed ("action_known", "role_binding", "stage_window").
    pub check: String,
    pub outcome: String,
    /// Whether this step decided the outcome.
    pub terminal: bool,
}

/// Full record of an evaluation, for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub decision: PermissionDecision,
    pub steps: Vec<EvaluationStep>,
    /// The grant that allowed the call, if any.
    pub matching_grant: Option<String>,
}

impl PermissionTable {
    /// Evaluate a request and return a decision.
    pub fn evaluate(&self, request: &PermissionRequest) -> PermissionDecision {
        self.evaluate_with_trace(request).decision
    }

    /// Evaluate a request, recording every check performed.
    pub fn evaluate_with_trace(&self, request: &PermissionRequest) -> EvaluationTrace {
        let mut steps = Vec::new();

        // Step 1: the action must appear in the table at all.
        let for_action: Vec<_> = self
            .grants()
            .iter()
            .filter(|g| g.action == request.action)
            .collect();
        if for_action.is_empty() {
            let reason = format!("action '{}' is not registered", request.action);
            steps.push(step("action_known", format!("failed: {}", reason), true));
            return deny(steps, reason);
        }
        steps.push(step("action_known", "passed", false));

        // Step 2: the invoking role must hold a grant for it.
        let for_role: Vec<_> = for_action
            .iter()
            .filter(|g| g.role == request.role)
            .collect();
        if for_role.is_empty() {
            let holders: Vec<&str> = for_action.iter().map(|g| g.role.as_str()).collect();
            let reason = format!(
                "action '{}' is not granted to role '{}' (granted to: {})",
                request.action,
                request.role,
                holders.join(", ")
            );
            steps.push(step("role_binding", format!("failed: {}", reason), true));
            return deny(steps, reason);
        }
        steps.push(step("role_binding", "passed", false));

        // Step 3: one of the role's grants must cover the current stage.
        match for_role.iter().find(|g| g.stages.contains(&request.stage)) {
            Some(grant) => {
                steps.push(step("stage_window", "allowed: matching grant found", true));
                EvaluationTrace {
                    decision: PermissionDecision::Allow,
                    steps,
                    matching_grant: Some(format!(
                        "{}.{} during {}",
                        grant.role,
                        grant.action,
                        stage_list(&grant.stages)
                    )),
                }
            }
            None => {
                let allowed: Vec<Stage> = for_role
                    .iter()
                    .flat_map(|g| g.stages.iter().copied())
                    .collect();
                let reason = format!(
                    "action '{}' is not permitted for role '{}' during stage '{}' (allowed: {})",
                    request.action,
                    request.role,
                    request.stage,
                    stage_list(&allowed)
                );
                steps.push(step("stage_window", format!("failed: {}", reason), true));
                deny(steps, reason)
            }
        }
    }
}

fn step(check: &str, outcome: impl Into<String>, terminal: bool) -> EvaluationStep {
    EvaluationStep {
        check: check.to_string(),
        outcome: outcome.into(),
        terminal,
    }
}

fn deny(steps: Vec<EvaluationStep>, reason: String) -> EvaluationTrace {
    EvaluationTrace {
        decision: PermissionDecision::Deny { reason },
        steps,
        matching_grant: None,
    }
}

fn stage_list(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("|")
}
