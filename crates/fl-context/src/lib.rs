//! # fl-context
//!
//! Run context and stage state machine for the feedback loop engine.
//!
//! A [`Context`] is the single owned, versioned state value for one run. It
//! is constructed fresh from a [`ContextTemplate`] for every run and is only
//! ever mutated through a [`StageController`], which enforces the stage graph
//! and the iteration budget:
//!
//! ```text
//! Idle → Create → Review → Revise ─┬─→ Review   (iteration needed, budget left)
//!                                  └─→ Finalize → Terminated
//! ```
//!
//! ## Key components
//!
//! - [`StageController`] — validated transitions, iteration and round budgets
//! - [`Context`] — run state (stage, budgets, draft, feedback, final artifact, error)
//! - [`ReportDraft`], [`FeedbackCollection`], [`RevisedReport`], [`FinalReport`] — artifacts
//! - [`RunEvent`] / [`EventDispatcher`] — lifecycle events for notification sinks
//! - [`RunStore`] — JSON file persistence of context snapshots

pub mod artifact;
pub mod context;
pub mod controller;
pub mod error;
pub mod events;
pub mod stage;
pub mod store;

pub use artifact::{
    FeedbackCollection, FeedbackItem, FinalReport, ReportDraft, RevisedReport, Severity,
};
pub use context::{Context, ContextTemplate, RunKind, StageTransition};
pub use controller::{RevisionOutcome, StageController};
pub use error::{ContextError, ValidationError};
pub use events::{EventDispatcher, LogSink, NotificationSink, RunEvent};
pub use stage::Stage;
pub use store::RunStore;
