//! Artifact handles
//!
//! Tasks never agree on shared paths. A producer's outputs are registered as
//! handles once it succeeds, and each consumer receives the handles for its
//! declared inputs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::name::{ArtifactName, TaskName};

#[derive(Debug, Error, PartialEq)]
pub enum ArtifactError {
    #[error("Artifact '{artifact}' required by '{task}' has not been produced")]
    Missing {
        artifact: ArtifactName,
        task: TaskName,
    },

    #[error("Artifact '{0}' was already registered by '{1}'")]
    AlreadyRegistered(ArtifactName, TaskName),
}

/// A produced artifact: what it is, who made it, where it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactHandle {
    pub name: ArtifactName,
    pub producer: TaskName,
    pub location: PathBuf,
}

impl ArtifactHandle {
    pub fn new(name: ArtifactName, producer: TaskName, location: impl Into<PathBuf>) -> Self {
        Self {
            name,
            producer,
            location: location.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.location
    }
}

/// Handles registered during one pipeline run
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    handles: HashMap<ArtifactName, ArtifactHandle>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handle: ArtifactHandle) -> Result<(), ArtifactError> {
        if let Some(existing) = self.handles.get(&handle.name) {
            return Err(ArtifactError::AlreadyRegistered(
                handle.name.clone(),
                existing.producer.clone(),
            ));
        }
        self.handles.insert(handle.name.clone(), handle);
        Ok(())
    }

    pub fn get(&self, name: &ArtifactName) -> Option<&ArtifactHandle> {
        self.handles.get(name)
    }

    /// Collects the handles for a task's inputs
    pub fn resolve_inputs(
        &self,
        task: &TaskName,
        inputs: &[ArtifactName],
    ) -> Result<HashMap<ArtifactName, ArtifactHandle>, ArtifactError> {
        inputs
            .iter()
            .map(|name| {
                self.get(name)
                    .map(|h| (name.clone(), h.clone()))
                    .ok_or_else(|| ArtifactError::Missing {
                        artifact: name.clone(),
                        task: task.clone(),
                    })
            })
            .collect()
    }

    /// All handles, sorted by artifact name
    pub fn handles(&self) -> Vec<&ArtifactHandle> {
        let mut handles: Vec<_> = self.handles.values().collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(s: &str) -> ArtifactName {
        ArtifactName::new(s).unwrap()
    }

    fn task(s: &str) -> TaskName {
        TaskName::new(s).unwrap()
    }

    #[test]
    fn resolve_registered_inputs() {
        let mut registry = ArtifactRegistry::new();
        registry
            .register(ArtifactHandle::new(artifact("snippets"), task("test"), "/tmp/s"))
            .unwrap();

        let inputs = registry
            .resolve_inputs(&task("asciidoctor"), &[artifact("snippets")])
            .unwrap();

        assert_eq!(inputs[&artifact("snippets")].producer, task("test"));
        assert_eq!(inputs[&artifact("snippets")].path(), Path::new("/tmp/s"));
    }

    #[test]
    fn missing_input_names_consumer() {
        let registry = ArtifactRegistry::new();
        let err = registry
            .resolve_inputs(&task("asciidoctor"), &[artifact("snippets")])
            .unwrap_err();

        assert_eq!(
            err,
            ArtifactError::Missing {
                artifact: artifact("snippets"),
                task: task("asciidoctor"),
            }
        );
    }

    #[test]
    fn double_registration_rejected() {
        let mut registry = ArtifactRegistry::new();
        registry
            .register(ArtifactHandle::new(artifact("docs"), task("asciidoctor"), "/a"))
            .unwrap();
        let result = registry.register(ArtifactHandle::new(artifact("docs"), task("other"), "/b"));

        assert!(matches!(result, Err(ArtifactError::AlreadyRegistered(_, _))));
        assert_eq!(registry.len(), 1);
    }
}
