//! Build directory layout and locking
//!
//! ```text
//! build/
//! ├── <artifact>/              # published outputs of the last good build
//! ├── reports/pipeline.json    # report of the last run
//! ├── .staging/<task>/<artifact>/
//! └── .stagehand.lock
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::error::PipelineError;
use crate::domain::{ArtifactName, TaskName};

/// Paths used by one project's builds
#[derive(Debug, Clone)]
pub struct BuildLayout {
    project_dir: PathBuf,
    build_dir: PathBuf,
}

impl BuildLayout {
    /// `build_dir` may be relative to the project directory
    pub fn new(project_dir: impl Into<PathBuf>, build_dir: impl AsRef<Path>) -> Self {
        let project_dir = project_dir.into();
        let build_dir = project_dir.join(build_dir);
        Self {
            project_dir,
            build_dir,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Root of all transient stage outputs
    pub fn staging_root(&self) -> PathBuf {
        self.build_dir.join(".staging")
    }

    /// Where `task` writes `artifact` during a run
    pub fn staging_dir(&self, task: &TaskName, artifact: &ArtifactName) -> PathBuf {
        self.staging_root()
            .join(task.as_str())
            .join(artifact.as_str())
    }

    /// Where `artifact` is published after a successful run
    pub fn published_dir(&self, artifact: &ArtifactName) -> PathBuf {
        self.build_dir.join(artifact.as_str())
    }

    pub fn report_path(&self) -> PathBuf {
        self.build_dir.join("reports").join("pipeline.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.build_dir.join(".stagehand.lock")
    }

    /// Takes the exclusive build lock, failing fast if it is held
    pub fn lock(&self) -> Result<BuildLock, PipelineError> {
        fs::create_dir_all(&self.build_dir).map_err(|e| {
            PipelineError::io(
                format!("Failed to create build directory {}", self.build_dir.display()),
                e,
            )
        })?;

        let path = self.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| PipelineError::io(format!("Failed to open {}", path.display()), e))?;

        file.try_lock_exclusive()
            .map_err(|_| PipelineError::Locked(path.clone()))?;

        Ok(BuildLock { file, path })
    }
}

/// Held for the duration of a run; released on drop
#[derive(Debug)]
pub struct BuildLock {
    file: File,
    path: PathBuf,
}

impl BuildLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout(dir: &TempDir) -> BuildLayout {
        BuildLayout::new(dir.path(), "build")
    }

    #[test]
    fn paths_are_under_build_dir() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let task = TaskName::new("test").unwrap();
        let artifact = ArtifactName::new("snippets").unwrap();

        assert_eq!(layout.build_dir(), dir.path().join("build"));
        assert_eq!(
            layout.staging_dir(&task, &artifact),
            dir.path().join("build/.staging/test/snippets")
        );
        assert_eq!(layout.published_dir(&artifact), dir.path().join("build/snippets"));
    }

    #[test]
    fn absolute_build_dir_wins() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let layout = BuildLayout::new(dir.path(), other.path());
        assert_eq!(layout.build_dir(), other.path());
    }

    #[test]
    fn second_lock_fails_until_first_dropped() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);

        let first = layout.lock().unwrap();
        assert!(matches!(layout.lock(), Err(PipelineError::Locked(_))));

        drop(first);
        assert!(layout.lock().is_ok());
    }
}
