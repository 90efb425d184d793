//! Build report written to `build/reports/pipeline.json`

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fsutil::{to_entry_name, walk_files};
use crate::domain::{ArtifactName, TaskName, TaskState};

/// Outcome of one planned task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub name: TaskName,
    pub state: TaskState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,

    /// Failure diagnostics, or why the task did not run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl TaskReport {
    pub fn skipped(name: TaskName, state: TaskState, diagnostics: Option<String>) -> Self {
        Self {
            name,
            state,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            diagnostics,
        }
    }

    pub fn ran(
        name: TaskName,
        state: TaskState,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        diagnostics: Option<String>,
    ) -> Self {
        Self {
            name,
            state,
            started_at: Some(started_at),
            finished_at: Some(finished_at),
            duration_ms: Some((finished_at - started_at).num_milliseconds()),
            diagnostics,
        }
    }
}

/// An artifact promoted into the build directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedArtifact {
    pub name: ArtifactName,
    pub producer: TaskName,
    pub path: PathBuf,
    pub files: usize,
    pub bytes: u64,

    /// blake3 over every file's relative path and contents, in path order
    pub digest: String,
}

impl PublishedArtifact {
    pub fn describe(name: ArtifactName, producer: TaskName, path: &Path) -> std::io::Result<Self> {
        let files = walk_files(path)?;
        let mut hasher = blake3::Hasher::new();
        let mut bytes = 0u64;

        for rel in &files {
            let content = fs::read(path.join(rel))?;
            let entry = to_entry_name(rel);
            hasher.update(&(entry.len() as u64).to_le_bytes());
            hasher.update(entry.as_bytes());
            hasher.update(&(content.len() as u64).to_le_bytes());
            hasher.update(&content);
            bytes += content.len() as u64;
        }

        Ok(Self {
            name,
            producer,
            path: path.to_path_buf(),
            files: files.len(),
            bytes,
            digest: hasher.finalize().to_hex().to_string(),
        })
    }
}

/// Everything that happened in one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub targets: Vec<TaskName>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub tasks: Vec<TaskReport>,

    #[serde(default)]
    pub artifacts: Vec<PublishedArtifact>,
}

impl BuildReport {
    pub fn task(&self, name: &TaskName) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| &t.name == name)
    }

    /// Position of a task in execution order
    pub fn position(&self, name: &TaskName) -> Option<usize> {
        self.tasks.iter().position(|t| &t.name == name)
    }

    pub fn first_failure(&self) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.state == TaskState::Failed)
    }

    pub fn artifact(&self, name: &ArtifactName) -> Option<&PublishedArtifact> {
        self.artifacts.iter().find(|a| &a.name == name)
    }

    /// Writes the report atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = path.with_extension("json.tmp");
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self).context("Failed to serialize report")?;
            writeln!(writer).context("Failed to write report")?;
            writer.flush().context("Failed to flush report")?;
        }

        fs::rename(&temp_path, path).with_context(|| {
            format!("Failed to rename {} to {}", temp_path.display(), path.display())
        })?;
        Ok(())
    }
}
