//! Storage backends for tracked runs

use crate::error::{PipelineError, Result};
use super::tracker::Run;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Storage backend trait
pub trait StorageBackend: Send + Sync {
    /// Write a run, replacing an earlier version of it
    fn save_run(&self, run: &Run) -> Result<()>;

    /// All runs of a project, oldest first
    fn load_runs(&self, project: &str) -> Result<Vec<Run>>;

    /// Delete a run
    fn delete_run(&self, project: &str, run_id: &str) -> Result<()>;
}

/// Local file system storage: one JSON file per run under
/// `<base_dir>/<project>/<run_id>.json`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn project_dir(&self, project: &str) -> PathBuf {
        self.base_dir.join(project)
    }

    fn run_file(&self, project: &str, run_id: &str) -> PathBuf {
        self.project_dir(project).join(format!("{}.json", run_id))
    }
}

impl StorageBackend for LocalStorage {
    fn save_run(&self, run: &Run) -> Result<()> {
        fs::create_dir_all(self.project_dir(&run.project))?;

        let file = File::create(self.run_file(&run.project, &run.run_id))?;
        serde_json::to_writer_pretty(BufWriter::new(file), run)?;
        Ok(())
    }

    fn load_runs(&self, project: &str) -> Result<Vec<Run>> {
        let dir = self.project_dir(project);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let file = File::open(&path)?;
            match serde_json::from_reader::<_, Run>(BufReader::new(file)) {
                Ok(run) => runs.push(run),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable run file"),
            }
        }

        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }

    fn delete_run(&self, project: &str, run_id: &str) -> Result<()> {
        let path = self.run_file(project, run_id);
        if !path.exists() {
            return Err(PipelineError::Tracking(format!(
                "run '{}' not found in project '{}'",
                run_id, project
            )));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::RunConfig;

    #[test]
    fn test_local_storage_save_load() {
        let temp_dir = std::env::temp_dir()
            .join("heartflow_test_storage")
            .join(std::process::id().to_string());
        let storage = LocalStorage::new(&temp_dir);

        let run = Run::new("demo", "first", RunConfig::new());
        storage.save_run(&run).unwrap();

        let runs = storage.load_runs("demo").unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, run.run_id);

        storage.delete_run("demo", &run.run_id).unwrap();
        assert!(storage.load_runs("demo").unwrap().is_empty());
        assert!(storage.delete_run("demo", &run.run_id).is_err());

        let _ = fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn test_unknown_project_is_empty() {
        let storage = LocalStorage::new(std::env::temp_dir().join("heartflow_test_storage_none"));
        assert!(storage.load_runs("nothing-here").unwrap().is_empty());
    }
}
