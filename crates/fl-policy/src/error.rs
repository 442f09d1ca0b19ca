// error.rs — Error types for permission tables.

use std::path::PathBuf;

use thiserror::Error;

use crate::action::ActionName;
use crate::role::Role;

/// Errors that can occur while building or loading a permission table.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A mutating action was granted to more than one role.
    #[error("action '{action}' is bound to both '{first}' and '{second}'")]
    DuplicateBinding {
        action: ActionName,
        first: Role,
        second: Role,
    },

    /// A grant lists no stage in which it applies.
    #[error("grant of '{action}' to '{role}' lists no stages")]
    EmptyStages { role: Role, action: ActionName },

    /// The table file could not be read.
    #[error("failed to read permission table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The table file is not valid YAML for a permission table.
    #[error("failed to parse permission table: {0}")]
    Parse(#[from] serde_yaml::Error),
}
