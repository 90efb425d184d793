//! Build pipeline: stage actions and the executor that runs them
//!
//! A [`Pipeline`] pairs every task declaration with the action it runs and
//! the dependency set its classpaths are resolved from. Plans are computed
//! from it; the [`Executor`] runs a plan against a [`BuildLayout`].

mod action;
pub mod asciidoc;
mod command;
mod compile;
mod docs;
mod error;
mod executor;
pub mod fsutil;
mod layout;
mod package;
mod report;

use std::collections::HashMap;

pub use action::{Lifecycle, StageAction, StageContext};
pub use command::CommandStage;
pub use compile::{CompileStage, SUPPORTED_ENCODING};
pub use docs::{DocsStage, DEFAULT_INCLUDE};
pub use error::{FailureKind, PipelineError, StageError};
pub use executor::{Executor, RunOptions};
pub use layout::{BuildLayout, BuildLock};
pub use package::{BootArchiveStage, PlainArchiveStage, DEFAULT_DOCS_PATH, LAUNCHER_CLASS};
pub use report::{BuildReport, PublishedArtifact, TaskReport};

use crate::domain::{BuildPlan, DependencySet, TaskGraph, TaskName, TaskSpec};
use crate::storage::ProjectMeta;

/// Tasks, their actions and the project's dependency declarations
pub struct Pipeline {
    specs: Vec<TaskSpec>,
    actions: HashMap<TaskName, Box<dyn StageAction>>,
    graph: TaskGraph,
    dependencies: DependencySet,
    meta: ProjectMeta,
    default_tasks: Vec<TaskName>,
}

impl Pipeline {
    pub fn builder(meta: ProjectMeta) -> PipelineBuilder {
        PipelineBuilder::new(meta)
    }

    pub fn specs(&self) -> &[TaskSpec] {
        &self.specs
    }

    pub fn spec(&self, name: &TaskName) -> Option<&TaskSpec> {
        self.specs.iter().find(|s| &s.name == name)
    }

    pub fn action(&self, name: &TaskName) -> Option<&dyn StageAction> {
        self.actions.get(name).map(|a| a.as_ref())
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    pub fn meta(&self) -> &ProjectMeta {
        &self.meta
    }

    pub fn default_tasks(&self) -> &[TaskName] {
        &self.default_tasks
    }

    /// Plans `targets`, or the default tasks when none are given
    pub fn plan(&self, targets: &[TaskName], excluded: &[TaskName]) -> Result<BuildPlan, PipelineError> {
        let targets = if targets.is_empty() {
            &self.default_tasks
        } else {
            targets
        };
        Ok(BuildPlan::new(&self.graph, &self.specs, targets, excluded)?)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("tasks", &self.specs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>())
            .field("default_tasks", &self.default_tasks)
            .finish()
    }
}

/// Assembles a [`Pipeline`], validating the task graph on [`build`](Self::build)
pub struct PipelineBuilder {
    meta: ProjectMeta,
    specs: Vec<TaskSpec>,
    actions: HashMap<TaskName, Box<dyn StageAction>>,
    dependencies: DependencySet,
    default_tasks: Vec<TaskName>,
}

impl PipelineBuilder {
    pub fn new(meta: ProjectMeta) -> Self {
        Self {
            meta,
            specs: Vec::new(),
            actions: HashMap::new(),
            dependencies: DependencySet::new(),
            default_tasks: Vec::new(),
        }
    }

    pub fn task(mut self, spec: TaskSpec, action: impl StageAction + 'static) -> Self {
        self.actions.insert(spec.name.clone(), Box::new(action));
        self.specs.push(spec);
        self
    }

    pub fn boxed_task(mut self, spec: TaskSpec, action: Box<dyn StageAction>) -> Self {
        self.actions.insert(spec.name.clone(), action);
        self.specs.push(spec);
        self
    }

    pub fn dependencies(mut self, dependencies: DependencySet) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn default_task(mut self, task: TaskName) -> Self {
        if !self.default_tasks.contains(&task) {
            self.default_tasks.push(task);
        }
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let graph = TaskGraph::from_specs(&self.specs)?;

        for spec in &self.specs {
            if !self.actions.contains_key(&spec.name) {
                return Err(PipelineError::MissingAction(spec.name.clone()));
            }
        }

        Ok(Pipeline {
            specs: self.specs,
            actions: self.actions,
            graph,
            dependencies: self.dependencies,
            meta: self.meta,
            default_tasks: self.default_tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtifactName, GraphError, PlanError, PlanStep};

    fn name(s: &str) -> TaskName {
        TaskName::new(s).unwrap()
    }

    fn artifact(s: &str) -> ArtifactName {
        ArtifactName::new(s).unwrap()
    }

    fn pipeline() -> Pipeline {
        Pipeline::builder(ProjectMeta::default())
            .task(TaskSpec::new(name("compile")).output(artifact("classes")), Lifecycle)
            .task(
                TaskSpec::new(name("test"))
                    .input(artifact("classes"))
                    .output(artifact("snippets")),
                Lifecycle,
            )
            .task(TaskSpec::new(name("jar")).disabled(), PlainArchiveStage)
            .task(
                TaskSpec::new(name("build"))
                    .depends_on(name("test"))
                    .depends_on(name("jar")),
                Lifecycle,
            )
            .default_task(name("build"))
            .build()
            .unwrap()
    }

    #[test]
    fn plan_defaults_to_default_tasks() {
        let pipeline = pipeline();
        let plan = pipeline.plan(&[], &[]).unwrap();

        let names: Vec<_> = plan.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.last(), Some(&"build"));
        assert_eq!(plan.step(&name("jar")), Some(PlanStep::Disabled));
        assert_eq!(plan.step(&name("compile")), Some(PlanStep::Run));
    }

    #[test]
    fn explicit_targets_win() {
        let pipeline = pipeline();
        let plan = pipeline.plan(&[name("compile")], &[]).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn excluding_a_producer_is_a_plan_error() {
        let pipeline = pipeline();
        let err = pipeline.plan(&[], &[name("compile")]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Plan(PlanError::InputFromSkippedTask { .. })
        ));
    }

    #[test]
    fn missing_producer_fails_build() {
        let err = Pipeline::builder(ProjectMeta::default())
            .task(TaskSpec::new(name("docs")).input(artifact("snippets")), Lifecycle)
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Graph(GraphError::NoProducer { .. })));
    }

    #[test]
    fn lookup() {
        let pipeline = pipeline();
        assert_eq!(pipeline.action(&name("jar")).unwrap().kind(), "plain-archive");
        assert!(pipeline.spec(&name("nope")).is_none());
        assert_eq!(pipeline.default_tasks(), &[name("build")]);
    }
}
