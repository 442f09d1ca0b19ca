//! File layout configuration for the filesystem adapters

use std::path::{Path, PathBuf};

use fl_context::RunKind;
use serde::{Deserialize, Serialize};

use crate::adapter::AdapterSet;
use crate::fs::{FsInstructionSource, FsReportStore, FsTranscriptSource};

/// Where transcripts, instructions and reports live, relative to a project root
///
/// Patterns substitute `{session}` with the session id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutConfig {
    #[serde(default = "default_transcripts_dir")]
    pub transcripts_dir: PathBuf,

    #[serde(default = "default_transcript_pattern")]
    pub transcript_pattern: String,

    /// Instructions for per-session runs
    #[serde(default = "default_session_instructions")]
    pub session_instructions: PathBuf,

    /// Instructions for the combining run
    #[serde(default = "default_combining_instructions")]
    pub combining_instructions: PathBuf,

    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    #[serde(default = "default_report_pattern")]
    pub report_pattern: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            transcripts_dir: default_transcripts_dir(),
            transcript_pattern: default_transcript_pattern(),
            session_instructions: default_session_instructions(),
            combining_instructions: default_combining_instructions(),
            reports_dir: default_reports_dir(),
            report_pattern: default_report_pattern(),
        }
    }
}

// Serde default functions
fn default_transcripts_dir() -> PathBuf {
    PathBuf::from("transcripts")
}

fn default_transcript_pattern() -> String {
    "{session}_transcript.txt".to_string()
}

fn default_session_instructions() -> PathBuf {
    PathBuf::from("instructions/session_report_instructions.md")
}

fn default_combining_instructions() -> PathBuf {
    PathBuf::from("instructions/combined_report_instructions.md")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_report_pattern() -> String {
    "{session}_report.md".to_string()
}

impl LayoutConfig {
    /// Filesystem adapters for one run rooted at `root`
    ///
    /// Session and combining runs differ only in which instruction file
    /// they read.
    pub fn adapters(&self, root: &Path, kind: RunKind) -> AdapterSet {
        let instructions = match kind {
            RunKind::Session => &self.session_instructions,
            RunKind::Combining => &self.combining_instructions,
        };
        let reports_dir = root.join(&self.reports_dir);
        AdapterSet::new(
            FsTranscriptSource::new(root.join(&self.transcripts_dir), &self.transcript_pattern),
            FsInstructionSource::new(root.join(instructions)),
            FsReportStore::new(&reports_dir, &self.report_pattern),
            FsReportStore::new(&reports_dir, &self.report_pattern),
        )
    }
}
