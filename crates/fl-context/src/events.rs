// events.rs — Run lifecycle events and notification dispatch.
//
// The orchestrator emits a RunEvent at key points of every run. Notification
// sinks (a JSONL log file by default) observe these events; they never
// influence control flow. The dispatcher is synchronous, like the runs it
// observes.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RunKind;
use crate::error::ContextError;
use crate::stage::Stage;

/// Events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A fresh context was created and the run began.
    RunStarted {
        run_id: Uuid,
        session_id: String,
        kind: RunKind,
        timestamp: DateTime<Utc>,
    },

    /// A role invoked a registered action.
    ActionInvoked {
        run_id: Uuid,
        role: String,
        action: String,
        round: u32,
        timestamp: DateTime<Utc>,
    },

    /// The run moved through the stage graph.
    StageChanged {
        run_id: Uuid,
        from_stage: Stage,
        to_stage: Stage,
        iteration: u32,
        timestamp: DateTime<Utc>,
    },

    /// The final artifact was written by the report sink.
    ReportPersisted {
        run_id: Uuid,
        location: String,
        digest: String,
        timestamp: DateTime<Utc>,
    },

    /// The orchestrator stopped driving the run.
    RunHalted {
        run_id: Uuid,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn event_type(&self) -> &str {
        match self {
            RunEvent::RunStarted { .. } => "run_started",
            RunEvent::ActionInvoked { .. } => "action_invoked",
            RunEvent::StageChanged { .. } => "stage_changed",
            RunEvent::ReportPersisted { .. } => "report_persisted",
            RunEvent::RunHalted { .. } => "run_halted",
        }
    }

    pub fn run_started(run_id: Uuid, session_id: &str, kind: RunKind) -> Self {
        RunEvent::RunStarted {
            run_id,
            session_id: session_id.to_string(),
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn action_invoked(run_id: Uuid, role: &str, action: &str, round: u32) -> Self {
        RunEvent::ActionInvoked {
            run_id,
            role: role.to_string(),
            action: action.to_string(),
            round,
            timestamp: Utc::now(),
        }
    }

    pub fn stage_changed(run_id: Uuid, from: Stage, to: Stage, iteration: u32) -> Self {
        RunEvent::StageChanged {
            run_id,
            from_stage: from,
            to_stage: to,
            iteration,
            timestamp: Utc::now(),
        }
    }

    pub fn report_persisted(run_id: Uuid, location: &str, digest: &str) -> Self {
        RunEvent::ReportPersisted {
            run_id,
            location: location.to_string(),
            digest: digest.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn run_halted(run_id: Uuid, status: &str, detail: Option<String>) -> Self {
        RunEvent::RunHalted {
            run_id,
            status: status.to_string(),
            detail,
            timestamp: Utc::now(),
        }
    }
}

/// Receives run events.
pub trait NotificationSink: Send {
    /// Handle an event. Errors are logged but don't stop the run.
    fn send(&self, event: &RunEvent) -> Result<(), ContextError>;
}

/// Appends events as JSONL to a file.
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, event: &RunEvent) -> Result<(), ContextError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ContextError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| ContextError::IoError {
                path: self.path.display().to_string(),
                source,
            })?;

        // One write per line: concurrent runs share this file.
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        file.write_all(line.as_bytes()).map_err(|source| ContextError::IoError {
            path: self.path.display().to_string(),
            source,
        })?;

        Ok(())
    }
}

/// Dispatches events to every registered sink.
///
/// A failing sink is logged via tracing and skipped; the others still
/// receive the event.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn dispatch(&self, event: &RunEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!("notification sink error: {}", e);
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
