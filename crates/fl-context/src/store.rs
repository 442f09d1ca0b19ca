// store.rs — RunStore: persisted snapshots of finished runs.
//
// Each run's final Context is stored as `<store_dir>/<run_id>.json`. The
// caller decides what to keep: completed, incomplete and failed runs can all
// be saved for diagnostics.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::context::Context;
use crate::error::ContextError;

/// JSON file store for run context snapshots.
pub struct RunStore {
    store_dir: PathBuf,
}

impl RunStore {
    /// Create a store backed by `store_dir`, creating the directory if needed.
    pub fn new(store_dir: impl AsRef<Path>) -> Result<Self, ContextError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir).map_err(|source| ContextError::IoError {
            path: store_dir.display().to_string(),
            source,
        })?;
        Ok(Self { store_dir })
    }

    /// Save a snapshot (creates or overwrites).
    pub fn save(&self, ctx: &Context) -> Result<(), ContextError> {
        let path = self.run_file(ctx.run_id);
        let json = serde_json::to_string_pretty(ctx)?;
        fs::write(&path, json).map_err(|source| ContextError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn get(&self, run_id: Uuid) -> Result<Option<Context>, ContextError> {
        let path = self.run_file(run_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| ContextError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Like `get`, but a missing run is an error.
    pub fn load(&self, run_id: Uuid) -> Result<Context, ContextError> {
        self.get(run_id)?.ok_or(ContextError::NotFound(run_id))
    }

    /// All snapshots, newest first. Unparseable files are skipped.
    pub fn list(&self) -> Result<Vec<Context>, ContextError> {
        let mut runs = Vec::new();

        let entries = fs::read_dir(&self.store_dir).map_err(|source| ContextError::IoError {
            path: self.store_dir.display().to_string(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| ContextError::IoError {
                path: self.store_dir.display().to_string(),
                source,
            })?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                let json = fs::read_to_string(&path).map_err(|source| ContextError::IoError {
                    path: path.display().to_string(),
                    source,
                })?;
                match serde_json::from_str::<Context>(&json) {
                    Ok(ctx) => runs.push(ctx),
                    Err(e) => tracing::debug!(path = %path.display(), "skipping run file: {}", e),
                }
            }
        }

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    /// Snapshots whose stage display name equals `stage_name`.
    pub fn list_by_stage(&self, stage_name: &str) -> Result<Vec<Context>, ContextError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|ctx| ctx.stage.as_str() == stage_name)
            .collect())
    }

    pub fn delete(&self, run_id: Uuid) -> Result<bool, ContextError> {
        let path = self.run_file(run_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| ContextError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(true)
    }

    fn run_file(&self, run_id: Uuid) -> PathBuf {
        self.store_dir.join(format!("{}.json", run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextTemplate, RunKind};
    use crate::controller::StageController;
    use tempfile::tempdir;

    fn fresh(session: &str) -> Context {
        Context::from_template(&ContextTemplate::default(), session, RunKind::Session).unwrap()
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path().join("runs")).unwrap();

        let ctx = fresh("3");
        store.save(&ctx).unwrap();

        let loaded = store.load(ctx.run_id).unwrap();
        assert_eq!(loaded, ctx);
    }

    #[test]
    fn missing_run_is_none_or_not_found() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();
        let id = Uuid::new_v4();

        assert!(store.get(id).unwrap().is_none());
        assert!(matches!(store.load(id), Err(ContextError::NotFound(_))));
    }

    #[test]
    fn list_by_stage_filters() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();

        let idle = fresh("1");
        let mut started = StageController::new(fresh("2"));
        started.start().unwrap();

        store.save(&idle).unwrap();
        store.save(started.context()).unwrap();

        assert_eq!(store.list().unwrap().len(), 2);
        let create = store.list_by_stage("create").unwrap();
        assert_eq!(create.len(), 1);
        assert_eq!(create[0].session_id, "2");
    }

    #[test]
    fn delete_removes_snapshot() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();
        let ctx = fresh("1");
        store.save(&ctx).unwrap();

        assert!(store.delete(ctx.run_id).unwrap());
        assert!(!store.delete(ctx.run_id).unwrap());
        assert!(store.get(ctx.run_id).unwrap().is_none());
    }

    #[test]
    fn non_json_files_are_ignored() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        store.save(&fresh("1")).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
    }
}
