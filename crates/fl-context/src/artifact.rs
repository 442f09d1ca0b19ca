// artifact.rs — The documents that move through a run.
//
// A run carries one artifact through its stages:
//   ReportDraft        — produced at Create, replaced at every Revise
//   FeedbackCollection — produced at Review, consumed by the next Revise
//   RevisedReport      — produced at Revise, carries an audit trail of changes
//   FinalReport        — produced exactly once, at Finalize
//
// All payload types reject unknown fields. `validate()` enforces the rules
// serde can't express (non-empty text); severity is an enum, so an invalid
// severity never deserializes in the first place.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// How serious a feedback item is.
///
/// Variants are ordered, so `Severity::Critical > Severity::Minor`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// A draft of the artifact: title plus full text content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReportDraft {
    /// Report title.
    pub title: String,
    /// Full text content of the draft.
    pub content: String,
}

impl ReportDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }
}

/// One piece of reviewer feedback, scoped to a section of the draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FeedbackItem {
    /// Section of the report the feedback applies to.
    pub section: String,
    /// Detailed feedback.
    pub feedback: String,
    pub severity: Severity,
    /// Recommended action to address the feedback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// The reviewer's structured verdict on one draft.
///
/// `iteration_needed` is the only field that drives control flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FeedbackCollection {
    pub items: Vec<FeedbackItem>,
    pub overall_assessment: String,
    pub priority_issues: Vec<String>,
    /// Whether the reviewer wants another review/revise pass.
    pub iteration_needed: bool,
}

impl FeedbackCollection {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("overall_assessment", &self.overall_assessment)?;
        for (i, item) in self.items.iter().enumerate() {
            require_text(&format!("items[{}].section", i), &item.section)?;
            require_text(&format!("items[{}].feedback", i), &item.feedback)?;
        }
        for (i, issue) in self.priority_issues.iter().enumerate() {
            require_text(&format!("priority_issues[{}]", i), issue)?;
        }
        Ok(())
    }

    /// The most severe item in the collection, if any.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.items.iter().map(|item| item.severity).max()
    }
}

/// A revised draft, with the list of changes applied from feedback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RevisedReport {
    pub title: String,
    pub content: String,
    /// Audit trail of the changes made in response to feedback.
    #[serde(default)]
    pub changes_made: Vec<String>,
}

impl RevisedReport {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }

    /// The revised text as the run's new current draft.
    pub fn to_draft(&self) -> ReportDraft {
        ReportDraft::new(self.title.clone(), self.content.clone())
    }
}

/// The terminal artifact of a run. Created exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalReport {
    pub title: String,
    pub content: String,
    /// False when the iteration budget forced finalization while the
    /// reviewer still asked for another pass.
    pub converged: bool,
    /// Lowercase hex SHA-256 of `content`.
    pub digest: String,
}

impl FinalReport {
    /// Seal a finalized draft, computing its content digest.
    pub fn seal(draft: ReportDraft, converged: bool) -> Self {
        let digest = content_digest(&draft.content);
        Self {
            title: draft.title,
            content: draft.content,
            converged,
            digest,
        }
    }
}

/// Lowercase hex-encoded SHA-256 of a piece of text.
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}
