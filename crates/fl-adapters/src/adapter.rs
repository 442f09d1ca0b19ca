//! Core adapter traits and error type

use thiserror::Error;

/// Errors that can occur while reading source material or persisting reports
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{resource} not found: {location}")]
    NotFound { resource: String, location: String },

    #[error("failed to read {location}: {source}")]
    Unreadable {
        location: String,
        source: std::io::Error,
    },

    #[error("failed to write {location}: {source}")]
    WriteFailure {
        location: String,
        source: std::io::Error,
    },

    #[error("invalid session id '{0}'")]
    InvalidSession(String),
}

impl AdapterError {
    pub fn not_found(resource: impl Into<String>, location: impl Into<String>) -> Self {
        AdapterError::NotFound {
            resource: resource.into(),
            location: location.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Source of raw session transcripts
pub trait TranscriptSource: Send {
    /// Full transcript text for `session_id`
    fn read_transcript(&self, session_id: &str) -> Result<String>;
}

/// Source of the fixed task instructions for a run
pub trait InstructionSource: Send {
    fn read_instructions(&self) -> Result<String>;
}

/// Destination for finalized reports
///
/// Writing the same session twice overwrites the earlier report.
pub trait ReportSink: Send {
    /// Persist a report and return the location it was written to
    fn write_report(&self, session_id: &str, title: &str, content: &str) -> Result<String>;
}

/// Source of previously persisted reports (input of a combining run)
pub trait ReportSource: Send {
    fn read_report(&self, session_id: &str) -> Result<String>;
}

/// The adapters one run works with
///
/// Each run gets its own set; sets are never shared between concurrent runs.
pub struct AdapterSet {
    pub transcripts: Box<dyn TranscriptSource>,
    pub instructions: Box<dyn InstructionSource>,
    pub prior_reports: Box<dyn ReportSource>,
    pub sink: Box<dyn ReportSink>,
}

impl AdapterSet {
    pub fn new(
        transcripts: impl TranscriptSource + 'static,
        instructions: impl InstructionSource + 'static,
        prior_reports: impl ReportSource + 'static,
        sink: impl ReportSink + 'static,
    ) -> Self {
        Self {
            transcripts: Box::new(transcripts),
            instructions: Box::new(instructions),
            prior_reports: Box::new(prior_reports),
            sink: Box::new(sink),
        }
    }
}

/// Reject session ids that could escape a storage directory
pub(crate) fn check_session_id(session_id: &str) -> Result<()> {
    let bad = session_id.trim().is_empty()
        || session_id.contains("..")
        || session_id.contains('/')
        || session_id.contains('\\');
    if bad {
        return Err(AdapterError::InvalidSession(session_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_session_ids_are_accepted() {
        assert!(check_session_id("1").is_ok());
        assert!(check_session_id("combined").is_ok());
    }

    #[test]
    fn traversal_session_ids_are_rejected() {
        for id in ["", "  ", "../etc", "a/b", "a\\b"] {
            assert!(matches!(
                check_session_id(id),
                Err(AdapterError::InvalidSession(_))
            ));
        }
    }
}
