//! Pipeline error taxonomy

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{ArtifactError, ArtifactName, GraphError, PlanError, TaskName};

/// Failure of a single stage. The message is the diagnostic shown to the
/// user when the build halts.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Compilation failed: {0}")]
    Compilation(String),

    #[error("Tests failed: {0}")]
    Test(String),

    #[error("Documentation rendering failed: {0}")]
    Documentation(String),

    #[error("Packaging failed: {0}")]
    Packaging(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Artifact '{0}' is not available to this task")]
    MissingInput(ArtifactName),

    #[error("Artifact '{0}' is not an output of this task")]
    UndeclaredOutput(ArtifactName),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    /// Wraps an I/O error with a description of what was being done
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StageError::Io {
            context: context.into(),
            source,
        }
    }
}

/// How a failing external command is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureKind {
    #[default]
    Command,
    Compilation,
    Test,
    Documentation,
    Packaging,
}

impl FailureKind {
    pub fn error(self, message: String) -> StageError {
        match self {
            FailureKind::Command => StageError::Command(message),
            FailureKind::Compilation => StageError::Compilation(message),
            FailureKind::Test => StageError::Test(message),
            FailureKind::Documentation => StageError::Documentation(message),
            FailureKind::Packaging => StageError::Packaging(message),
        }
    }
}

/// Failure of the pipeline machinery itself (as opposed to a stage)
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Task '{0}' has no action")]
    MissingAction(TaskName),

    #[error("Another build holds the lock at {0}")]
    Locked(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_maps_to_taxonomy() {
        let err = FailureKind::Test.error("2 tests failed".to_string());
        assert!(matches!(err, StageError::Test(_)));
        assert_eq!(err.to_string(), "Tests failed: 2 tests failed");
    }

    #[test]
    fn io_context_in_message() {
        let err = StageError::io(
            "Failed to read src/main/java/App.java",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "Failed to read src/main/java/App.java: missing");
    }
}
