// generator.rs — The content-generation capability behind the role agents.
//
// Agents decide *which* action to take; a ContentGenerator decides *what*
// goes into its payload. The generator returns raw JSON. Nothing it returns
// is trusted: the payload is parsed and validated at the action boundary.
//
// Two implementations ship with the engine:
// - ScriptedGenerator: per-role FIFO of canned payloads (tests, replays).
// - PassthroughGenerator: deterministic payloads built from the request.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use fl_context::{FeedbackCollection, ReportDraft, Stage};
use fl_policy::{ActionName, Role};
use serde_json::{json, Value};

use crate::error::{GenerationError, LoopError};

/// A report from an earlier run, used as input of a combining run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorReport {
    pub session_id: String,
    pub content: String,
}

/// Source material gathered by an agent through its toolkit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMaterial {
    pub transcript: Option<String>,
    pub prior_reports: Vec<PriorReport>,
    pub instructions: Option<String>,
}

/// Everything a generator may look at when producing one payload.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub role: Role,
    pub action: ActionName,
    pub stage: Stage,
    /// Current review pass (1-based once the run has started).
    pub iteration: u32,
    pub max_iterations: u32,
    pub session_id: String,
    /// The seed instruction the run was started with.
    pub seed: String,
    pub sources: SourceMaterial,
    pub draft: Option<ReportDraft>,
    pub feedback: Option<FeedbackCollection>,
}

/// Produces the raw JSON payload for one action.
pub trait ContentGenerator: Send {
    fn generate(&mut self, request: &GenerationRequest) -> Result<Value, GenerationError>;
}

/// Replays canned payloads, one queue per role.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    queues: HashMap<Role, VecDeque<Value>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a payload for `role`.
    pub fn push(&mut self, role: Role, payload: Value) -> &mut Self {
        self.queues.entry(role).or_default().push_back(payload);
        self
    }

    pub fn with(mut self, role: Role, payload: Value) -> Self {
        self.push(role, payload);
        self
    }

    /// Parse a script of the form `{ "drafter": [..], "reviewer": [..] }`.
    pub fn from_json(text: &str) -> Result<Self, LoopError> {
        let script: HashMap<Role, Vec<Value>> = serde_json::from_str(text)
            .map_err(|e| LoopError::Config(format!("invalid generator script: {}", e)))?;
        let queues = script
            .into_iter()
            .map(|(role, payloads)| (role, payloads.into_iter().collect()))
            .collect();
        Ok(Self { queues })
    }

    pub fn load(path: &Path) -> Result<Self, LoopError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoopError::Config(format!("cannot read script {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Payloads still queued for `role`.
    pub fn remaining(&self, role: Role) -> usize {
        self.queues.get(&role).map_or(0, VecDeque::len)
    }
}

impl ContentGenerator for ScriptedGenerator {
    fn generate(&mut self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        self.queues
            .get_mut(&request.role)
            .and_then(VecDeque::pop_front)
            .ok_or(GenerationError::Exhausted(request.role))
    }
}

/// Deterministic generator that assembles payloads from the request itself.
///
/// The reviewer asks for another pass until `review_passes` reviews have
/// happened, so `review_passes = 1` converges on the first review.
#[derive(Debug, Clone)]
pub struct PassthroughGenerator {
    pub review_passes: u32,
}

impl Default for PassthroughGenerator {
    fn default() -> Self {
        Self { review_passes: 1 }
    }
}

impl PassthroughGenerator {
    pub fn new(review_passes: u32) -> Self {
        Self { review_passes }
    }

    fn draft(request: &GenerationRequest) -> Value {
        let title = format!("Report: {}", request.session_id);
        let mut content = format!("# {}\n\n{}\n", title, request.seed);
        if let Some(instructions) = &request.sources.instructions {
            content.push_str(&format!("\n## Instructions\n\n{}\n", instructions.trim()));
        }
        if let Some(transcript) = &request.sources.transcript {
            content.push_str(&format!("\n## Transcript\n\n{}\n", transcript.trim()));
        }
        for prior in &request.sources.prior_reports {
            content.push_str(&format!(
                "\n## Session {}\n\n{}\n",
                prior.session_id,
                prior.content.trim()
            ));
        }
        json!({ "title": title, "content": content })
    }

    fn review(&self, request: &GenerationRequest) -> Value {
        let needed = request.iteration < self.review_passes;
        let assessment = if needed {
            format!("Pass {} of {}: needs another revision.", request.iteration, self.review_passes)
        } else {
            format!("Pass {}: ready to finalize.", request.iteration)
        };
        json!({
            "items": [{
                "section": "Overall",
                "feedback": assessment,
                "severity": if needed { "moderate" } else { "minor" },
            }],
            "overall_assessment": assessment,
            "priority_issues": [],
            "iteration_needed": needed,
        })
    }

    fn revise(request: &GenerationRequest, draft: &ReportDraft) -> Value {
        let changes: Vec<String> = request
            .feedback
            .iter()
            .flat_map(|f| f.items.iter())
            .map(|item| format!("{}: {}", item.section, item.feedback))
            .collect();
        json!({
            "title": draft.title,
            "content": draft.content,
            "changes_made": changes,
        })
    }
}

impl ContentGenerator for PassthroughGenerator {
    fn generate(&mut self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let current_draft = || {
            request
                .draft
                .as_ref()
                .ok_or_else(|| GenerationError::MissingInput("no current draft".to_string()))
        };
        match request.action {
            ActionName::SubmitDraft => Ok(Self::draft(request)),
            ActionName::SubmitFeedback => {
                current_draft()?;
                Ok(self.review(request))
            }
            ActionName::SubmitRevision => Ok(Self::revise(request, current_draft()?)),
            ActionName::FinalizeReport => {
                let draft = current_draft()?;
                Ok(json!({ "title": draft.title, "content": draft.content }))
            }
            ActionName::StartRun => Ok(json!({ "seed": request.seed })),
            other => Err(GenerationError::Failed(format!(
                "'{}' has no generated payload",
                other
            ))),
        }
    }
}
