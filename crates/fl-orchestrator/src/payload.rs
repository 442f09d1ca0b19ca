// payload.rs — Structured action payloads.
//
// A role never mutates the Context with free text. It produces one
// `ActionCall`, a tagged variant whose payload has already passed serde's
// schema checks (required fields, lowercase severity enum, no unknown
// fields). `validate()` then applies the content rules serde cannot express,
// such as non-empty text.

use fl_context::{FeedbackCollection, ReportDraft, RevisedReport, Stage, ValidationError};
use fl_policy::ActionName;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arguments of `start_run`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StartRunArgs {
    /// The seed instruction the run was started with.
    pub seed: String,
}

/// One mutating action together with its validated payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum ActionCall {
    StartRun(StartRunArgs),
    SubmitDraft(ReportDraft),
    SubmitFeedback(FeedbackCollection),
    SubmitRevision(RevisedReport),
    FinalizeReport(ReportDraft),
}

impl ActionCall {
    pub fn name(&self) -> ActionName {
        match self {
            ActionCall::StartRun(_) => ActionName::StartRun,
            ActionCall::SubmitDraft(_) => ActionName::SubmitDraft,
            ActionCall::SubmitFeedback(_) => ActionName::SubmitFeedback,
            ActionCall::SubmitRevision(_) => ActionName::SubmitRevision,
            ActionCall::FinalizeReport(_) => ActionName::FinalizeReport,
        }
    }

    /// The stage the run must be in for this call to be accepted.
    pub fn source_stage(&self) -> Stage {
        match self {
            ActionCall::StartRun(_) => Stage::Idle,
            ActionCall::SubmitDraft(_) => Stage::Create,
            ActionCall::SubmitFeedback(_) => Stage::Review,
            ActionCall::SubmitRevision(_) => Stage::Revise,
            ActionCall::FinalizeReport(_) => Stage::Finalize,
        }
    }

    /// Parse a raw JSON payload for `action`.
    ///
    /// Schema failures (missing fields, an unknown severity, a wrong type)
    /// come back as a `ValidationError` on the `payload` field.
    pub fn from_payload(action: ActionName, payload: Value) -> Result<Self, ValidationError> {
        fn parse<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, ValidationError> {
            serde_json::from_value(payload).map_err(|e| ValidationError::new("payload", e.to_string()))
        }

        let call = match action {
            ActionName::StartRun => ActionCall::StartRun(parse(payload)?),
            ActionName::SubmitDraft => ActionCall::SubmitDraft(parse(payload)?),
            ActionName::SubmitFeedback => ActionCall::SubmitFeedback(parse(payload)?),
            ActionName::SubmitRevision => ActionCall::SubmitRevision(parse(payload)?),
            ActionName::FinalizeReport => ActionCall::FinalizeReport(parse(payload)?),
            ActionName::ReadTranscript
            | ActionName::ReadPriorReports
            | ActionName::ReadInstructions => {
                return Err(ValidationError::new(
                    "action",
                    format!("'{}' does not take a payload", action),
                ))
            }
        };
        Ok(call)
    }

    /// Content rules beyond the schema.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ActionCall::StartRun(args) => {
                if args.seed.trim().is_empty() {
                    return Err(ValidationError::new("seed", "must not be empty"));
                }
                Ok(())
            }
            ActionCall::SubmitDraft(draft) | ActionCall::FinalizeReport(draft) => draft.validate(),
            ActionCall::SubmitFeedback(feedback) => feedback.validate(),
            ActionCall::SubmitRevision(revised) => revised.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feedback_payload_parses() {
        let call = ActionCall::from_payload(
            ActionName::SubmitFeedback,
            json!({
                "items": [{
                    "section": "Findings",
                    "feedback": "Missing evidence",
                    "severity": "major",
                    "recommendation": "Quote the transcript"
                }],
                "overall_assessment": "Needs work",
                "priority_issues": ["evidence"],
                "iteration_needed": true
            }),
        )
        .unwrap();
        assert_eq!(call.name(), ActionName::SubmitFeedback);
        assert_eq!(call.source_stage(), Stage::Review);
        assert!(call.validate().is_ok());
    }

    #[test]
    fn unknown_severity_is_a_validation_error() {
        let err = ActionCall::from_payload(
            ActionName::SubmitFeedback,
            json!({
                "items": [{"section": "A", "feedback": "B", "severity": "urgent"}],
                "overall_assessment": "x",
                "priority_issues": [],
                "iteration_needed": false
            }),
        )
        .unwrap_err();
        assert_eq!(err.field, "payload");
        assert!(err.reason.contains("urgent"));
    }

    #[test]
    fn revision_without_changes_made_defaults_to_empty() {
        let call = ActionCall::from_payload(
            ActionName::SubmitRevision,
            json!({"title": "T", "content": "C"}),
        )
        .unwrap();
        match call {
            ActionCall::SubmitRevision(r) => assert!(r.changes_made.is_empty()),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ActionCall::from_payload(
            ActionName::SubmitDraft,
            json!({"title": "T", "content": "C", "author": "me"}),
        )
        .is_err());
    }

    #[test]
    fn read_actions_have_no_payload() {
        let err = ActionCall::from_payload(ActionName::ReadTranscript, json!({})).unwrap_err();
        assert_eq!(err.field, "action");
    }

    #[test]
    fn empty_draft_fails_content_validation() {
        let call = ActionCall::SubmitDraft(ReportDraft::new("Title", "   "));
        assert_eq!(call.validate().unwrap_err().field, "content");
    }

    #[test]
    fn tagged_serialization_names_the_action() {
        let call = ActionCall::StartRun(StartRunArgs {
            seed: "Go".to_string(),
        });
        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(value["action"], "start_run");
        assert_eq!(value["payload"]["seed"], "Go");
    }
}
