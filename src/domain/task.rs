//! Build task model
//!
//! A task is a named unit of build work. It declares the tasks it must run
//! after, the artifacts it consumes and produces, and the classpaths its
//! action needs. What the task actually does lives in the pipeline layer.

use serde::{Deserialize, Serialize};

use super::name::{ArtifactName, TaskName};
use super::scope::Classpath;

/// Declaration of a build task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub name: TaskName,

    /// One-line description shown by `stagehand tasks`
    pub description: Option<String>,

    /// Explicit ordering dependencies
    pub depends_on: Vec<TaskName>,

    /// Artifacts consumed; each implies a dependency on its producer
    pub inputs: Vec<ArtifactName>,

    /// Artifacts produced
    pub outputs: Vec<ArtifactName>,

    /// Classpaths exposed to the action
    pub classpaths: Vec<Classpath>,

    /// Disabled tasks are planned but never run
    pub enabled: bool,
}

impl TaskSpec {
    /// Creates an enabled task with no dependencies
    pub fn new(name: TaskName) -> Self {
        Self {
            name,
            description: None,
            depends_on: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            classpaths: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on(mut self, task: TaskName) -> Self {
        if !self.depends_on.contains(&task) {
            self.depends_on.push(task);
        }
        self
    }

    pub fn input(mut self, artifact: ArtifactName) -> Self {
        if !self.inputs.contains(&artifact) {
            self.inputs.push(artifact);
        }
        self
    }

    pub fn output(mut self, artifact: ArtifactName) -> Self {
        if !self.outputs.contains(&artifact) {
            self.outputs.push(artifact);
        }
        self
    }

    pub fn classpath(mut self, classpath: Classpath) -> Self {
        if !self.classpaths.contains(&classpath) {
            self.classpaths.push(classpath);
        }
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Final state of a task after a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// The action ran and succeeded
    Succeeded,
    /// The action ran and failed
    Failed,
    /// The task is disabled in the manifest
    Disabled,
    /// The task was excluded on the command line
    Excluded,
    /// An upstream task failed
    Aborted,
    /// The run halted before reaching this task
    NotRun,
}

impl TaskState {
    /// Returns true if dependents ordered after this task may run
    pub fn releases_dependents(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Disabled | TaskState::Excluded
        )
    }

    /// Returns true if the task was skipped without running its action
    pub fn is_skipped(&self) -> bool {
        matches!(self, TaskState::Disabled | TaskState::Excluded)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Succeeded => "ok",
            TaskState::Failed => "FAILED",
            TaskState::Disabled => "SKIPPED (disabled)",
            TaskState::Excluded => "SKIPPED (excluded)",
            TaskState::Aborted => "ABORTED",
            TaskState::NotRun => "NOT RUN",
        }
    }
}
