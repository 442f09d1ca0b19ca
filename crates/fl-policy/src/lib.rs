//! # fl-policy
//!
//! Default-deny permission table for the feedback loop engine.
//!
//! Every action a role can take is listed in a [`PermissionTable`] as a
//! [`PermissionGrant`] of (role, action, stages). The table is checked
//! structurally before an action runs, independently of the stage
//! controller's own guards: a mutating action invoked by the wrong role is
//! denied here even in the right stage, and read actions, which the state
//! machine never sees, are confined to their grants' stage windows.
//!
//! ## Key invariants
//!
//! - **Default deny**: no matching grant → denied.
//! - **Single binding**: each mutating action is granted to exactly one role.
//! - **Stage windows**: a grant names the only stages in which it applies.

pub mod action;
pub mod engine;
pub mod error;
pub mod role;
pub mod table;

pub use action::ActionName;
pub use engine::{EvaluationStep, EvaluationTrace, PermissionDecision, PermissionRequest};
pub use error::PolicyError;
pub use role::Role;
pub use table::{PermissionGrant, PermissionTable};
