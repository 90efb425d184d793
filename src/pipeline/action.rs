//! Stage actions and the context they run in

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::error::StageError;
use crate::domain::{ArtifactHandle, ArtifactName, Classpath, Coordinate, TaskName};
use crate::storage::ProjectMeta;

/// What a task does when it runs
pub trait StageAction {
    /// Short action name shown in task listings
    fn kind(&self) -> &'static str;

    fn run(&self, ctx: &StageContext<'_>) -> Result<(), StageError>;
}

/// Closures make ad-hoc actions, mostly for embedding and tests
impl<F> StageAction for F
where
    F: Fn(&StageContext<'_>) -> Result<(), StageError>,
{
    fn kind(&self) -> &'static str {
        "custom"
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<(), StageError> {
        self(ctx)
    }
}

/// A task that only groups other tasks
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifecycle;

impl StageAction for Lifecycle {
    fn kind(&self) -> &'static str {
        "lifecycle"
    }

    fn run(&self, _ctx: &StageContext<'_>) -> Result<(), StageError> {
        Ok(())
    }
}

/// Everything an action may look at while running
#[derive(Debug)]
pub struct StageContext<'a> {
    pub task: &'a TaskName,
    pub project_dir: &'a Path,
    pub meta: &'a ProjectMeta,
    inputs: HashMap<ArtifactName, ArtifactHandle>,
    outputs: HashMap<ArtifactName, PathBuf>,
    classpaths: Vec<(Classpath, Vec<Coordinate>)>,
}

impl<'a> StageContext<'a> {
    pub fn new(task: &'a TaskName, project_dir: &'a Path, meta: &'a ProjectMeta) -> Self {
        Self {
            task,
            project_dir,
            meta,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            classpaths: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: HashMap<ArtifactName, ArtifactHandle>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_output(mut self, name: ArtifactName, dir: PathBuf) -> Self {
        self.outputs.insert(name, dir);
        self
    }

    pub fn with_classpath(mut self, classpath: Classpath, coordinates: Vec<Coordinate>) -> Self {
        self.classpaths.push((classpath, coordinates));
        self
    }

    /// Location of an input artifact handed over by its producer
    pub fn input(&self, name: &ArtifactName) -> Result<&Path, StageError> {
        self.inputs
            .get(name)
            .map(|h| h.path())
            .ok_or_else(|| StageError::MissingInput(name.clone()))
    }

    /// Fresh, empty directory this task must write `name` into
    pub fn output(&self, name: &ArtifactName) -> Result<&Path, StageError> {
        self.outputs
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| StageError::UndeclaredOutput(name.clone()))
    }

    /// Resolved coordinates of a requested classpath
    pub fn classpath(&self, classpath: &Classpath) -> Option<&[Coordinate]> {
        self.classpaths
            .iter()
            .find(|(cp, _)| cp == classpath)
            .map(|(_, coords)| coords.as_slice())
    }

    /// Resolves a manifest path against the project directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.project_dir.join(path)
    }

    /// Environment handed to external commands
    pub fn env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (
                "STAGEHAND_PROJECT_DIR".to_string(),
                self.project_dir.display().to_string(),
            ),
            ("STAGEHAND_TASK".to_string(), self.task.to_string()),
            (
                "STAGEHAND_RUNTIME_VERSION".to_string(),
                self.meta.runtime_version.to_string(),
            ),
            ("STAGEHAND_ENCODING".to_string(), self.meta.encoding.clone()),
        ];

        let mut inputs: Vec<_> = self.inputs.iter().collect();
        inputs.sort_by(|a, b| a.0.cmp(b.0));
        for (name, handle) in inputs {
            env.push((
                format!("STAGEHAND_INPUT_{}", name.env_key()),
                handle.path().display().to_string(),
            ));
        }

        let mut outputs: Vec<_> = self.outputs.iter().collect();
        outputs.sort_by(|a, b| a.0.cmp(b.0));
        for (name, dir) in outputs {
            env.push((
                format!("STAGEHAND_OUTPUT_{}", name.env_key()),
                dir.display().to_string(),
            ));
        }

        for (classpath, coords) in &self.classpaths {
            let value = coords
                .iter()
                .map(Coordinate::to_string)
                .collect::<Vec<_>>()
                .join(",");
            env.push((
                format!("STAGEHAND_CLASSPATH_{}", classpath.env_key()),
                value,
            ));
        }

        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(s: &str) -> ArtifactName {
        ArtifactName::new(s).unwrap()
    }

    #[test]
    fn env_exposes_handles_and_classpaths() {
        let task = TaskName::new("test").unwrap();
        let meta = ProjectMeta::default();
        let mut inputs = HashMap::new();
        inputs.insert(
            artifact("classes"),
            ArtifactHandle::new(artifact("classes"), TaskName::new("compile").unwrap(), "/b/classes"),
        );

        let ctx = StageContext::new(&task, Path::new("/p"), &meta)
            .with_inputs(inputs)
            .with_output(artifact("generated-snippets"), PathBuf::from("/b/snippets"))
            .with_classpath(
                Classpath::TestRuntime,
                vec!["org.postgresql:postgresql".parse().unwrap()],
            );

        let env: HashMap<_, _> = ctx.env().into_iter().collect();
        assert_eq!(env["STAGEHAND_TASK"], "test");
        assert_eq!(env["STAGEHAND_INPUT_CLASSES"], "/b/classes");
        assert_eq!(env["STAGEHAND_OUTPUT_GENERATED_SNIPPETS"], "/b/snippets");
        assert_eq!(env["STAGEHAND_CLASSPATH_TEST_RUNTIME"], "org.postgresql:postgresql");
        assert_eq!(env["STAGEHAND_RUNTIME_VERSION"], "17");
        assert_eq!(env["STAGEHAND_ENCODING"], "UTF-8");
    }

    #[test]
    fn custom_classpath_env_key_is_shell_safe() {
        let task = TaskName::new("asciidoctor").unwrap();
        let meta = ProjectMeta::default();
        let extensions: Classpath = "asciidoctor-ext".parse().unwrap();

        let ctx = StageContext::new(&task, Path::new("/p"), &meta).with_classpath(
            extensions,
            vec!["org.springframework.restdocs:spring-restdocs-asciidoctor".parse().unwrap()],
        );

        let env: HashMap<_, _> = ctx.env().into_iter().collect();
        assert_eq!(
            env["STAGEHAND_CLASSPATH_ASCIIDOCTOR_EXT"],
            "org.springframework.restdocs:spring-restdocs-asciidoctor"
        );
        assert!(env.keys().all(|k| !k.contains('-')));
    }

    #[test]
    fn unknown_input_and_output() {
        let task = TaskName::new("docs").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, Path::new("/p"), &meta);

        assert!(matches!(ctx.input(&artifact("snippets")), Err(StageError::MissingInput(_))));
        assert!(matches!(ctx.output(&artifact("docs")), Err(StageError::UndeclaredOutput(_))));
        assert!(ctx.classpath(&Classpath::Runtime).is_none());
    }

    #[test]
    fn closures_are_actions() {
        let action = |_: &StageContext<'_>| -> Result<(), StageError> { Ok(()) };
        assert_eq!(action.kind(), "custom");
    }
}
