// role.rs — The participants of a run.

use std::fmt;

use fl_context::Stage;
use serde::{Deserialize, Serialize};

/// A capability-bound participant in a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Receives the seed instruction and starts the run.
    Entry,
    /// Produces the first draft from the source material.
    Drafter,
    /// Evaluates a draft and decides whether another pass is needed.
    Reviewer,
    /// Applies feedback to the draft.
    Revisor,
    /// Polishes and persists the final artifact.
    Finalizer,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Entry,
        Role::Drafter,
        Role::Reviewer,
        Role::Revisor,
        Role::Finalizer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Entry => "entry",
            Role::Drafter => "drafter",
            Role::Reviewer => "reviewer",
            Role::Revisor => "revisor",
            Role::Finalizer => "finalizer",
        }
    }

    /// The role eligible to act while the run is in `stage`.
    ///
    /// `None` for Terminated: nobody acts on a finished run.
    pub fn for_stage(stage: Stage) -> Option<Role> {
        match stage {
            Stage::Idle => Some(Role::Entry),
            Stage::Create => Some(Role::Drafter),
            Stage::Review => Some(Role::Reviewer),
            Stage::Revise => Some(Role::Revisor),
            Stage::Finalize => Some(Role::Finalizer),
            Stage::Terminated => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_live_stage_has_exactly_one_role() {
        for stage in Stage::ALL {
            assert_eq!(Role::for_stage(stage).is_some(), !stage.is_terminal());
        }
    }

    #[test]
    fn roles_serialize_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Revisor).unwrap(), "\"revisor\"");
    }
}
