// table.rs — Permission grants and the table that holds them.
//
// A grant is scoped by three dimensions:
// - `role`: who may invoke the action
// - `action`: which registered action
// - `stages`: the stages in which the grant applies
//
// Example grant: { role: reviewer, action: submit_feedback, stages: [review] }
// If it's not in the table, it's denied.

use std::collections::HashMap;
use std::path::Path;

use fl_context::Stage;
use serde::{Deserialize, Serialize};

use crate::action::ActionName;
use crate::error::PolicyError;
use crate::role::Role;

/// A single permission: `role` may invoke `action` during `stages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionGrant {
    pub role: Role,
    pub action: ActionName,
    pub stages: Vec<Stage>,
}

impl PermissionGrant {
    pub fn new(role: Role, action: ActionName, stages: &[Stage]) -> Self {
        Self {
            role,
            action,
            stages: stages.to_vec(),
        }
    }
}

/// The complete set of permissions for a run.
///
/// Construction validates the table: a mutating action bound to two roles,
/// or a grant with no stages, is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct PermissionTable {
    grants: Vec<PermissionGrant>,
}

/// Unvalidated table shape, as read from YAML.
#[derive(Deserialize)]
struct RawTable {
    grants: Vec<PermissionGrant>,
}

impl TryFrom<RawTable> for PermissionTable {
    type Error = PolicyError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        PermissionTable::new(raw.grants)
    }
}

impl PermissionTable {
    pub fn new(grants: Vec<PermissionGrant>) -> Result<Self, PolicyError> {
        let mut bound: HashMap<ActionName, Role> = HashMap::new();
        for grant in &grants {
            if grant.stages.is_empty() {
                return Err(PolicyError::EmptyStages {
                    role: grant.role,
                    action: grant.action,
                });
            }
            if !grant.action.is_mutation() {
                continue;
            }
            if let Some(&first) = bound.get(&grant.action) {
                if first != grant.role {
                    return Err(PolicyError::DuplicateBinding {
                        action: grant.action,
                        first,
                        second: grant.role,
                    });
                }
            }
            bound.insert(grant.action, grant.role);
        }
        Ok(Self { grants })
    }

    /// The standard table: each role acts only in its own stage.
    pub fn standard() -> Self {
        use ActionName::*;
        use Role::*;

        let grants = vec![
            PermissionGrant::new(Entry, StartRun, &[Stage::Idle]),
            PermissionGrant::new(Drafter, ReadTranscript, &[Stage::Create]),
            PermissionGrant::new(Drafter, ReadPriorReports, &[Stage::Create]),
            PermissionGrant::new(Drafter, ReadInstructions, &[Stage::Create]),
            PermissionGrant::new(Drafter, SubmitDraft, &[Stage::Create]),
            PermissionGrant::new(Reviewer, ReadTranscript, &[Stage::Review]),
            PermissionGrant::new(Reviewer, ReadPriorReports, &[Stage::Review]),
            PermissionGrant::new(Reviewer, ReadInstructions, &[Stage::Review]),
            PermissionGrant::new(Reviewer, SubmitFeedback, &[Stage::Review]),
            PermissionGrant::new(Revisor, ReadInstructions, &[Stage::Revise]),
            PermissionGrant::new(Revisor, SubmitRevision, &[Stage::Revise]),
            PermissionGrant::new(Finalizer, ReadInstructions, &[Stage::Finalize]),
            PermissionGrant::new(Finalizer, FinalizeReport, &[Stage::Finalize]),
        ];
        // The standard grants bind every mutating action once.
        Self { grants }
    }

    /// Parse and validate a table from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, PolicyError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a table from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String, PolicyError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn grants(&self) -> &[PermissionGrant] {
        &self.grants
    }

    /// The role a mutating action is bound to, if any.
    pub fn bound_role(&self, action: ActionName) -> Option<Role> {
        self.grants
            .iter()
            .find(|g| g.action == action && action.is_mutation())
            .map(|g| g.role)
    }

    /// Every action `role` holds a grant for, in table order without duplicates.
    pub fn capabilities_of(&self, role: Role) -> Vec<ActionName> {
        let mut actions = Vec::new();
        for grant in self.grants.iter().filter(|g| g.role == role) {
            if !actions.contains(&grant.action) {
                actions.push(grant.action);
            }
        }
        actions
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}
