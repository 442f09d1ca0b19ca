//! In-memory adapters - no filesystem access
//!
//! Useful for tests and for embedding the engine where source material is
//! already loaded. `MemoryReportStore` is cheaply cloneable; clones share the
//! same storage, so a caller can keep one handle and inspect what a run wrote.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::adapter::{
    check_session_id, AdapterError, InstructionSource, ReportSink, ReportSource, Result,
    TranscriptSource,
};

/// Transcripts keyed by session id
#[derive(Debug, Clone, Default)]
pub struct MemoryTranscripts {
    transcripts: HashMap<String, String>,
}

impl MemoryTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, session_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.transcripts.insert(session_id.into(), text.into());
        self
    }
}

impl TranscriptSource for MemoryTranscripts {
    fn read_transcript(&self, session_id: &str) -> Result<String> {
        self.transcripts
            .get(session_id)
            .cloned()
            .ok_or_else(|| AdapterError::not_found("transcript", format!("memory:{}", session_id)))
    }
}

/// Fixed instruction text, or none at all
#[derive(Debug, Clone, Default)]
pub struct StaticInstructions {
    text: Option<String>,
}

impl StaticInstructions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// An instruction source that always reports NotFound
    pub fn missing() -> Self {
        Self { text: None }
    }
}

impl InstructionSource for StaticInstructions {
    fn read_instructions(&self) -> Result<String> {
        self.text
            .clone()
            .ok_or_else(|| AdapterError::not_found("instructions", "memory:instructions"))
    }
}

/// A stored report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReport {
    pub title: String,
    pub content: String,
}

/// Shared in-memory report storage
#[derive(Debug, Clone, Default)]
pub struct MemoryReportStore {
    reports: Arc<Mutex<HashMap<String, StoredReport>>>,
    reject_writes: bool,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail with WriteFailure
    pub fn read_only() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    /// Seed a report, as if an earlier run had written it
    pub fn insert(&self, session_id: &str, title: &str, content: &str) {
        self.lock().insert(
            session_id.to_string(),
            StoredReport {
                title: title.to_string(),
                content: content.to_string(),
            },
        );
    }

    pub fn get(&self, session_id: &str) -> Option<StoredReport> {
        self.lock().get(session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredReport>> {
        // A panic while holding the lock can't leave a HashMap half-updated.
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ReportSink for MemoryReportStore {
    fn write_report(&self, session_id: &str, title: &str, content: &str) -> Result<String> {
        check_session_id(session_id)?;
        let location = format!("memory:{}", session_id);
        if self.reject_writes {
            return Err(AdapterError::WriteFailure {
                location,
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "report store is read-only",
                ),
            });
        }
        self.insert(session_id, title, content);
        Ok(location)
    }
}

impl ReportSource for MemoryReportStore {
    fn read_report(&self, session_id: &str) -> Result<String> {
        self.get(session_id)
            .map(|r| r.content)
            .ok_or_else(|| AdapterError::not_found("report", format!("memory:{}", session_id)))
    }
}
