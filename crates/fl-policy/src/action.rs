// action.rs — Names of the registered actions.
//
// Mutating actions change the run Context and are each bound to one role.
// Read actions only consult an I/O adapter; several roles may hold them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A registered action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    StartRun,
    ReadTranscript,
    ReadPriorReports,
    ReadInstructions,
    SubmitDraft,
    SubmitFeedback,
    SubmitRevision,
    FinalizeReport,
}

impl ActionName {
    pub const ALL: [ActionName; 8] = [
        ActionName::StartRun,
        ActionName::ReadTranscript,
        ActionName::ReadPriorReports,
        ActionName::ReadInstructions,
        ActionName::SubmitDraft,
        ActionName::SubmitFeedback,
        ActionName::SubmitRevision,
        ActionName::FinalizeReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::StartRun => "start_run",
            ActionName::ReadTranscript => "read_transcript",
            ActionName::ReadPriorReports => "read_prior_reports",
            ActionName::ReadInstructions => "read_instructions",
            ActionName::SubmitDraft => "submit_draft",
            ActionName::SubmitFeedback => "submit_feedback",
            ActionName::SubmitRevision => "submit_revision",
            ActionName::FinalizeReport => "finalize_report",
        }
    }

    /// True for actions that mutate the run Context.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            ActionName::ReadTranscript | ActionName::ReadPriorReports | ActionName::ReadInstructions
        )
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
