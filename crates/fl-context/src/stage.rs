// stage.rs — Stage: the named phases of a run.
//
// The stage graph is fixed:
//   Idle → Create → Review → Revise → Review (loop) | Finalize → Terminated
//
// There is no "Failed" stage. A run that hits an adapter or validation
// error keeps its current stage and latches `has_error` on the context.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle stage of a run.
///
/// `#[serde(rename_all = "snake_case")]` makes this serialize as `"create"`,
/// `"review"`, etc.; the same names used in permission tables and events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Fresh context, `start()` not yet called.
    Idle,

    /// The first draft is being produced.
    Create,

    /// The current draft is being reviewed.
    Review,

    /// Feedback is being applied to the draft.
    Revise,

    /// The final artifact is being produced and persisted.
    Finalize,

    /// The final artifact exists; the run accepts no further mutation.
    Terminated,
}

impl Stage {
    /// Every stage, in lifecycle order.
    pub const ALL: [Stage; 6] = [
        Stage::Idle,
        Stage::Create,
        Stage::Review,
        Stage::Revise,
        Stage::Finalize,
        Stage::Terminated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Create => "create",
            Stage::Review => "review",
            Stage::Revise => "revise",
            Stage::Finalize => "finalize",
            Stage::Terminated => "terminated",
        }
    }

    /// Check whether moving from this stage to `next` follows the stage graph.
    pub fn can_transition_to(&self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::Idle, Stage::Create)
                | (Stage::Create, Stage::Review)
                | (Stage::Review, Stage::Revise)
                // Another pass requested and iteration budget remains.
                | (Stage::Revise, Stage::Review)
                | (Stage::Revise, Stage::Finalize)
                | (Stage::Finalize, Stage::Terminated)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Terminated)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
