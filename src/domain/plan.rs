//! Build planning
//!
//! Turns requested targets into the ordered list of tasks a run visits.
//!
//! A disabled or excluded task is skipped and does not hold back tasks that
//! are merely ordered after it. A task that *consumes an artifact* from a
//! skipped task cannot run at all; that is reported as a plan error before
//! anything executes.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use super::graph::{GraphError, TaskGraph};
use super::name::{ArtifactName, TaskName};
use super::task::TaskSpec;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("No tasks requested and no default tasks configured")]
    NoTargets,

    #[error("Task '{task}' consumes '{artifact}' from '{producer}', which is {reason}")]
    InputFromSkippedTask {
        task: TaskName,
        artifact: ArtifactName,
        producer: TaskName,
        reason: &'static str,
    },
}

/// What the executor does with a planned task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStep {
    Run,
    Disabled,
    Excluded,
}

impl PlanStep {
    fn skip_reason(&self) -> Option<&'static str> {
        match self {
            PlanStep::Run => None,
            PlanStep::Disabled => Some("disabled"),
            PlanStep::Excluded => Some("excluded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTask {
    pub name: TaskName,
    pub step: PlanStep,
}

/// Tasks to visit, dependencies first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    pub targets: Vec<TaskName>,
    pub tasks: Vec<PlannedTask>,
}

impl BuildPlan {
    /// Plans a run of `targets` (and their dependencies), skipping
    /// `excluded` tasks together with dependencies only they need
    pub fn new(
        graph: &TaskGraph,
        specs: &[TaskSpec],
        targets: &[TaskName],
        excluded: &[TaskName],
    ) -> Result<Self, PlanError> {
        if targets.is_empty() {
            return Err(PlanError::NoTargets);
        }

        for name in excluded {
            if !graph.contains(name) {
                return Err(GraphError::TaskNotFound(name.clone()).into());
            }
        }

        let excluded: HashSet<TaskName> = excluded.iter().cloned().collect();
        let closure = graph.closure(targets, &excluded)?;
        let specs: HashMap<&TaskName, &TaskSpec> = specs.iter().map(|s| (&s.name, s)).collect();

        let tasks: Vec<PlannedTask> = graph
            .topological_order()?
            .into_iter()
            .filter(|name| closure.contains(name))
            .map(|name| {
                let step = if excluded.contains(&name) {
                    PlanStep::Excluded
                } else if specs.get(&name).map(|s| s.enabled).unwrap_or(true) {
                    PlanStep::Run
                } else {
                    PlanStep::Disabled
                };
                PlannedTask { name, step }
            })
            .collect();

        let steps: HashMap<&TaskName, PlanStep> =
            tasks.iter().map(|t| (&t.name, t.step)).collect();

        for planned in tasks.iter().filter(|t| t.step == PlanStep::Run) {
            let Some(spec) = specs.get(&planned.name) else {
                continue;
            };

            for input in &spec.inputs {
                let Some(producer) = graph.producer(input) else {
                    continue;
                };
                let reason = steps
                    .get(producer)
                    .and_then(|step| step.skip_reason());

                if let Some(reason) = reason {
                    return Err(PlanError::InputFromSkippedTask {
                        task: planned.name.clone(),
                        artifact: input.clone(),
                        producer: producer.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(Self {
            targets: targets.to_vec(),
            tasks,
        })
    }

    /// Tasks whose action will run
    pub fn runnable(&self) -> impl Iterator<Item = &TaskName> {
        self.tasks
            .iter()
            .filter(|t| t.step == PlanStep::Run)
            .map(|t| &t.name)
    }

    pub fn step(&self, name: &TaskName) -> Option<PlanStep> {
        self.tasks.iter().find(|t| &t.name == name).map(|t| t.step)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
