//! Runs a build plan
//!
//! Each planned task runs at most once, in plan order, and only after every
//! dependency it has in the plan finished without failing. Outputs are
//! written to fresh staging directories and handed to consumers as
//! [`ArtifactHandle`]s. Nothing reaches the published build directory unless
//! the whole run succeeds.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::action::StageContext;
use super::error::PipelineError;
use super::fsutil::remove_path;
use super::layout::BuildLayout;
use super::report::{BuildReport, PublishedArtifact, TaskReport};
use super::Pipeline;
use crate::domain::{
    ArtifactHandle, ArtifactRegistry, BuildPlan, PlanStep, TaskName, TaskSpec, TaskState,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Keep running tasks that do not depend on a failed one
    pub continue_on_failure: bool,
}

pub struct Executor<'a> {
    pipeline: &'a Pipeline,
    layout: &'a BuildLayout,
    options: RunOptions,
}

impl<'a> Executor<'a> {
    pub fn new(pipeline: &'a Pipeline, layout: &'a BuildLayout) -> Self {
        Self {
            pipeline,
            layout,
            options: RunOptions::default(),
        }
    }

    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the plan under the build lock and returns what happened.
    ///
    /// Stage failures are reported in the returned [`BuildReport`]; an `Err`
    /// means the pipeline machinery itself failed.
    pub fn run(&self, plan: &BuildPlan) -> Result<BuildReport, PipelineError> {
        let lock = self.layout.lock()?;
        debug!(path = %lock.path().display(), "Acquired build lock");
        let started_at = Utc::now();

        self.prepare(plan)?;

        let mut registry = ArtifactRegistry::new();
        let mut reports = Vec::with_capacity(plan.len());
        let mut aborted: HashSet<TaskName> = HashSet::new();
        let mut halted = false;

        for planned in &plan.tasks {
            let name = &planned.name;

            let skipped = match planned.step {
                PlanStep::Disabled => Some(TaskState::Disabled),
                PlanStep::Excluded => Some(TaskState::Excluded),
                PlanStep::Run if aborted.contains(name) => Some(TaskState::Aborted),
                PlanStep::Run if halted => Some(TaskState::NotRun),
                PlanStep::Run => None,
            };
            if let Some(state) = skipped {
                debug!(task = %name, state = state.label(), "Skipping task");
                reports.push(TaskReport::skipped(name.clone(), state, None));
                continue;
            }

            let spec = self
                .pipeline
                .spec(name)
                .ok_or_else(|| PipelineError::MissingAction(name.clone()))?;

            let started = Utc::now();
            info!(task = %name, "Running task");

            match self.run_task(spec, &mut registry) {
                Ok(()) => {
                    let finished = Utc::now();
                    info!(
                        task = %name,
                        duration_ms = (finished - started).num_milliseconds(),
                        "Task succeeded"
                    );
                    reports.push(TaskReport::ran(
                        name.clone(),
                        TaskState::Succeeded,
                        started,
                        finished,
                        None,
                    ));
                }
                Err(TaskFailure::Stage(message)) => {
                    let finished = Utc::now();
                    error!(task = %name, "{}", message);
                    reports.push(TaskReport::ran(
                        name.clone(),
                        TaskState::Failed,
                        started,
                        finished,
                        Some(message),
                    ));

                    let dependents = self.pipeline.graph().transitive_dependents(name);
                    if !dependents.is_empty() {
                        warn!(task = %name, count = dependents.len(), "Aborting dependents");
                    }
                    aborted.extend(dependents);

                    if !self.options.continue_on_failure {
                        halted = true;
                    }
                }
                Err(TaskFailure::Pipeline(e)) => {
                    self.discard_staging();
                    return Err(e);
                }
            }
        }

        let success = reports.iter().all(|r| r.state.releases_dependents());
        let artifacts = if success {
            self.promote(&registry)?
        } else {
            self.discard_staging();
            Vec::new()
        };

        Ok(BuildReport {
            targets: plan.targets.clone(),
            started_at,
            finished_at: Utc::now(),
            success,
            tasks: reports,
            artifacts,
        })
    }

    /// Clears staging and removes stale published outputs of tasks about to
    /// run, so a failed run never leaves an old artifact behind
    fn prepare(&self, plan: &BuildPlan) -> Result<(), PipelineError> {
        let staging = self.layout.staging_root();
        remove_path(&staging)
            .map_err(|e| PipelineError::io(format!("Failed to clear {}", staging.display()), e))?;

        for name in plan.runnable() {
            let Some(spec) = self.pipeline.spec(name) else {
                continue;
            };
            for output in &spec.outputs {
                let published = self.layout.published_dir(output);
                if published.exists() {
                    debug!(artifact = %output, path = %published.display(), "Removing stale output");
                }
                remove_path(&published).map_err(|e| {
                    PipelineError::io(format!("Failed to remove {}", published.display()), e)
                })?;
            }
        }
        Ok(())
    }

    fn run_task(&self, spec: &TaskSpec, registry: &mut ArtifactRegistry) -> Result<(), TaskFailure> {
        let name = &spec.name;
        let action = self
            .pipeline
            .action(name)
            .ok_or_else(|| PipelineError::MissingAction(name.clone()))?;

        let inputs = registry
            .resolve_inputs(name, &spec.inputs)
            .map_err(PipelineError::from)?;

        let mut ctx = StageContext::new(name, self.layout.project_dir(), self.pipeline.meta())
            .with_inputs(inputs);

        for output in &spec.outputs {
            let dir = self.layout.staging_dir(name, output);
            fs::create_dir_all(&dir).map_err(|e| {
                PipelineError::io(format!("Failed to create {}", dir.display()), e)
            })?;
            debug!(task = %name, artifact = %output, path = %dir.display(), "Staging output");
            ctx = ctx.with_output(output.clone(), dir);
        }

        for classpath in &spec.classpaths {
            let resolved = self.pipeline.dependencies().resolve(classpath);
            debug!(task = %name, classpath = classpath.as_str(), entries = resolved.len(), "Resolved classpath");
            ctx = ctx.with_classpath(classpath.clone(), resolved);
        }

        action
            .run(&ctx)
            .map_err(|e| TaskFailure::Stage(e.to_string()))?;

        for output in &spec.outputs {
            let handle = ArtifactHandle::new(
                output.clone(),
                name.clone(),
                self.layout.staging_dir(name, output),
            );
            registry.register(handle).map_err(PipelineError::from)?;
        }
        Ok(())
    }

    /// Moves every staged artifact into the build directory. If any move
    /// fails, the artifacts already moved are removed again.
    fn promote(&self, registry: &ArtifactRegistry) -> Result<Vec<PublishedArtifact>, PipelineError> {
        let mut moved: Vec<(&ArtifactHandle, PathBuf)> = Vec::with_capacity(registry.len());

        for handle in registry.handles() {
            let target = self.layout.published_dir(&handle.name);
            if let Err(e) = Self::publish(handle, &target) {
                self.unpublish(&moved);
                self.discard_staging();
                return Err(e);
            }
            debug!(artifact = %handle.name, path = %target.display(), "Published");
            moved.push((handle, target));
        }
        self.discard_staging();

        moved
            .into_iter()
            .map(|(handle, target)| {
                PublishedArtifact::describe(handle.name.clone(), handle.producer.clone(), &target)
                    .map_err(|e| PipelineError::io(format!("Failed to read {}", target.display()), e))
            })
            .collect()
    }

    fn publish(handle: &ArtifactHandle, target: &Path) -> Result<(), PipelineError> {
        remove_path(target)
            .map_err(|e| PipelineError::io(format!("Failed to remove {}", target.display()), e))?;
        fs::rename(handle.path(), target).map_err(|e| {
            PipelineError::io(
                format!("Failed to publish {} to {}", handle.name, target.display()),
                e,
            )
        })
    }

    fn unpublish(&self, moved: &[(&ArtifactHandle, PathBuf)]) {
        for (handle, target) in moved.iter().rev() {
            warn!(artifact = %handle.name, "Withdrawing published artifact");
            if let Err(e) = remove_path(target) {
                error!(path = %target.display(), error = %e, "Failed to withdraw artifact");
            }
        }
    }

    fn discard_staging(&self) {
        let staging = self.layout.staging_root();
        if let Err(e) = remove_path(&staging) {
            warn!(path = %staging.display(), error = %e, "Failed to discard staging");
        }
    }
}

/// Why a single task did not succeed
enum TaskFailure {
    /// The action failed; the message is the user-facing diagnostic
    Stage(String),
    Pipeline(PipelineError),
}

impl From<PipelineError> for TaskFailure {
    fn from(e: PipelineError) -> Self {
        TaskFailure::Pipeline(e)
    }
}
