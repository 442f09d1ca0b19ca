//! Filesystem adapters - plain files under a project directory

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::adapter::{
    check_session_id, AdapterError, InstructionSource, ReportSink, ReportSource, Result,
    TranscriptSource,
};

/// Reads `<dir>/<pattern>` with `{session}` replaced by the session id
pub struct FsTranscriptSource {
    dir: PathBuf,
    pattern: String,
}

impl FsTranscriptSource {
    pub fn new(dir: impl AsRef<Path>, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            pattern: pattern.into(),
        }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(render(&self.pattern, session_id))
    }
}

impl TranscriptSource for FsTranscriptSource {
    fn read_transcript(&self, session_id: &str) -> Result<String> {
        check_session_id(session_id)?;
        read_text("transcript", &self.path_for(session_id))
    }
}

/// Reads the instructions from a single file
pub struct FsInstructionSource {
    path: PathBuf,
}

impl FsInstructionSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl InstructionSource for FsInstructionSource {
    fn read_instructions(&self) -> Result<String> {
        read_text("instructions", &self.path)
    }
}

/// Report directory used both as the final-report sink and as the
/// prior-report source of a combining run
pub struct FsReportStore {
    dir: PathBuf,
    pattern: String,
}

impl FsReportStore {
    pub fn new(dir: impl AsRef<Path>, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            pattern: pattern.into(),
        }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(render(&self.pattern, session_id))
    }
}

impl ReportSink for FsReportStore {
    fn write_report(&self, session_id: &str, title: &str, content: &str) -> Result<String> {
        check_session_id(session_id)?;
        let path = self.path_for(session_id);
        let location = path.display().to_string();

        fs::create_dir_all(&self.dir).map_err(|source| AdapterError::WriteFailure {
            location: self.dir.display().to_string(),
            source,
        })?;
        // Content is written verbatim; the title travels in events and snapshots.
        fs::write(&path, content).map_err(|source| AdapterError::WriteFailure {
            location: location.clone(),
            source,
        })?;

        tracing::info!(session_id, title, location = %location, "report written");
        Ok(location)
    }
}

impl ReportSource for FsReportStore {
    fn read_report(&self, session_id: &str) -> Result<String> {
        check_session_id(session_id)?;
        read_text("report", &self.path_for(session_id))
    }
}

fn render(pattern: &str, session_id: &str) -> String {
    pattern.replace("{session}", session_id)
}

fn read_text(resource: &str, path: &Path) -> Result<String> {
    let location = path.display().to_string();
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            AdapterError::not_found(resource, location)
        } else {
            AdapterError::Unreadable { location, source }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn transcript_read_uses_pattern() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("fg_2_transcript.txt"), "hello").unwrap();
        let source = FsTranscriptSource::new(dir.path(), "fg_{session}_transcript.txt");

        assert_eq!(source.read_transcript("2").unwrap(), "hello");
    }

    #[test]
    fn missing_transcript_is_not_found() {
        let dir = tempdir().unwrap();
        let source = FsTranscriptSource::new(dir.path(), "{session}_transcript.txt");

        match source.read_transcript("99") {
            Err(AdapterError::NotFound { resource, location }) => {
                assert_eq!(resource, "transcript");
                assert!(location.ends_with("99_transcript.txt"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn traversal_session_is_rejected_before_io() {
        let dir = tempdir().unwrap();
        let source = FsTranscriptSource::new(dir.path(), "{session}.txt");
        assert!(matches!(
            source.read_transcript("../secret"),
            Err(AdapterError::InvalidSession(_))
        ));
    }

    #[test]
    fn missing_instructions_is_not_found() {
        let dir = tempdir().unwrap();
        let source = FsInstructionSource::new(dir.path().join("none.md"));
        assert!(matches!(
            source.read_instructions(),
            Err(AdapterError::NotFound { .. })
        ));
    }

    #[test]
    fn report_write_creates_dir_and_overwrites() {
        let dir = tempdir().unwrap();
        let store = FsReportStore::new(dir.path().join("reports"), "{session}_report.md");

        let first = store.write_report("1", "Title", "first").unwrap();
        let second = store.write_report("1", "Title", "second").unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&second).unwrap(), "second");
        assert_eq!(store.read_report("1").unwrap(), "second");
    }
}
