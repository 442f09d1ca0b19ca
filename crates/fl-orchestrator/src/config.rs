// config.rs — Project configuration.
//
// A project is a directory holding transcripts, instructions and reports.
// Engine state (run snapshots, the event log, the optional config file)
// lives under `.fl/` in the project root:
//
//   .fl/loop.toml        budgets, layout and run settings (all optional)
//   .fl/runs/            one JSON snapshot per run
//   .fl/events.jsonl     lifecycle events

use std::path::{Path, PathBuf};

use fl_adapters::LayoutConfig;
use fl_context::ContextTemplate;
use fl_policy::PermissionTable;
use serde::{Deserialize, Serialize};

use crate::error::LoopError;

/// Location of the config file, relative to the project root.
pub const CONFIG_FILE: &str = ".fl/loop.toml";

/// Settings that shape individual runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSettings {
    /// Session id the combining run reports under.
    #[serde(default = "default_combined_session_id")]
    pub combined_session_id: String,

    /// Seed instruction for per-session runs; `{session}` is substituted.
    #[serde(default = "default_session_seed")]
    pub session_seed: String,

    /// Seed instruction for the combining run.
    #[serde(default = "default_combining_seed")]
    pub combining_seed: String,

    /// Optional YAML permission table, relative to the project root.
    /// The standard table is used when unset.
    #[serde(default)]
    pub permissions: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            combined_session_id: default_combined_session_id(),
            session_seed: default_session_seed(),
            combining_seed: default_combining_seed(),
            permissions: None,
        }
    }
}

fn default_combined_session_id() -> String {
    "combined".to_string()
}

fn default_session_seed() -> String {
    "Write a report on session {session} based on its transcript.".to_string()
}

fn default_combining_seed() -> String {
    "Combine the session reports into a single report.".to_string()
}

/// Everything needed to run sessions of one project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Project root; not part of the file.
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub budgets: ContextTemplate,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub runs: RunSettings,
}

impl ProjectConfig {
    /// Defaults for a project rooted at `root`.
    pub fn for_project(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            budgets: ContextTemplate::default(),
            layout: LayoutConfig::default(),
            runs: RunSettings::default(),
        }
    }

    /// Load `.fl/loop.toml` from `root`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, LoopError> {
        let root = root.as_ref();
        let path = root.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| LoopError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| LoopError::Config(format!("invalid {}: {}", path.display(), e)))?;
        config.root = root.to_path_buf();
        Ok(config)
    }

    /// Load the config file, falling back to defaults when it is absent or unusable.
    pub fn load_or_default(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        if !root.join(CONFIG_FILE).exists() {
            return Self::for_project(root);
        }
        Self::load(root).unwrap_or_else(|e| {
            tracing::warn!("{}; using defaults", e);
            Self::for_project(root)
        })
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".fl")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.state_dir().join("runs")
    }

    pub fn events_log(&self) -> PathBuf {
        self.state_dir().join("events.jsonl")
    }

    /// The configured permission table, or the standard one.
    pub fn permission_table(&self) -> Result<PermissionTable, LoopError> {
        match &self.runs.permissions {
            Some(path) => Ok(PermissionTable::load(self.root.join(path))?),
            None => Ok(PermissionTable::standard()),
        }
    }

    pub fn session_seed(&self, session_id: &str) -> String {
        self.runs.session_seed.replace("{session}", session_id)
    }
}
