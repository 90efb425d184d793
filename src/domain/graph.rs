//! Task graph
//!
//! Holds task ordering with cycle detection and topological ordering.
//! Uses petgraph for graph operations.
//!
//! Edge direction is `dependency -> dependent`: the source must complete
//! before the target may start.

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::name::{ArtifactName, TaskName};
use super::task::TaskSpec;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Adding dependency would create a cycle: {0} -> {1}")]
    CycleDetected(TaskName, TaskName),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskName),

    #[error("Task declared twice: {0}")]
    DuplicateTask(TaskName),

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(TaskName),

    #[error("Artifact '{artifact}' is produced by both '{first}' and '{second}'")]
    DuplicateProducer {
        artifact: ArtifactName,
        first: TaskName,
        second: TaskName,
    },

    #[error("Task '{task}' consumes '{artifact}', which no task produces")]
    NoProducer {
        artifact: ArtifactName,
        task: TaskName,
    },
}

/// Why one task must run before another
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// Declared with `depends_on`
    Ordering,
    /// The dependent consumes an artifact of the dependency
    Data(ArtifactName),
}

/// A directed acyclic graph of tasks
#[derive(Debug, Default)]
pub struct TaskGraph {
    /// The underlying directed graph
    graph: DiGraph<TaskName, EdgeKind>,

    /// Map from TaskName to node index
    node_map: HashMap<TaskName, NodeIndex>,

    /// Map from artifact to the task producing it
    producers: HashMap<ArtifactName, TaskName>,
}

impl TaskGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from task declarations, adding explicit ordering edges
    /// and implicit data edges from each input to its producer
    pub fn from_specs<'a>(specs: impl IntoIterator<Item = &'a TaskSpec>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        let specs: Vec<_> = specs.into_iter().collect();

        // First pass: nodes and producers
        for spec in &specs {
            if graph.contains(&spec.name) {
                return Err(GraphError::DuplicateTask(spec.name.clone()));
            }
            graph.add_task(spec.name.clone());

            for output in &spec.outputs {
                if let Some(first) = graph.producers.get(output) {
                    return Err(GraphError::DuplicateProducer {
                        artifact: output.clone(),
                        first: first.clone(),
                        second: spec.name.clone(),
                    });
                }
                graph.producers.insert(output.clone(), spec.name.clone());
            }
        }

        // Second pass: edges
        for spec in &specs {
            for dep in &spec.depends_on {
                graph.add_edge(&spec.name, dep, EdgeKind::Ordering)?;
            }

            for input in &spec.inputs {
                let producer = graph
                    .producers
                    .get(input)
                    .cloned()
                    .ok_or_else(|| GraphError::NoProducer {
                        artifact: input.clone(),
                        task: spec.name.clone(),
                    })?;
                graph.add_edge(&spec.name, &producer, EdgeKind::Data(input.clone()))?;
            }
        }

        Ok(graph)
    }

    /// Adds a task to the graph
    pub fn add_task(&mut self, task: TaskName) {
        if !self.node_map.contains_key(&task) {
            let idx = self.graph.add_node(task.clone());
            self.node_map.insert(task, idx);
        }
    }

    /// Adds an ordering edge: `task` depends on `depends_on`
    pub fn add_dependency(&mut self, task: &TaskName, depends_on: &TaskName) -> Result<(), GraphError> {
        self.add_edge(task, depends_on, EdgeKind::Ordering)
    }

    fn add_edge(&mut self, task: &TaskName, depends_on: &TaskName, kind: EdgeKind) -> Result<(), GraphError> {
        if task == depends_on {
            return Err(GraphError::SelfDependency(task.clone()));
        }

        let task_idx = *self
            .node_map
            .get(task)
            .ok_or_else(|| GraphError::TaskNotFound(task.clone()))?;

        let dep_idx = *self
            .node_map
            .get(depends_on)
            .ok_or_else(|| GraphError::TaskNotFound(depends_on.clone()))?;

        // A data edge carries more information than an ordering edge
        if let Some(edge) = self.graph.find_edge(dep_idx, task_idx) {
            if matches!(kind, EdgeKind::Data(_)) {
                self.graph[edge] = kind;
            }
            return Ok(());
        }

        let edge = self.graph.add_edge(dep_idx, task_idx, kind);

        if is_cyclic_directed(&self.graph) {
            self.graph.remove_edge(edge);
            return Err(GraphError::CycleDetected(task.clone(), depends_on.clone()));
        }

        Ok(())
    }

    /// Returns the direct dependencies of a task
    pub fn dependencies(&self, task: &TaskName) -> Vec<TaskName> {
        self.neighbors(task, Direction::Incoming)
    }

    /// Returns the direct dependents of a task (tasks that depend on it)
    pub fn dependents(&self, task: &TaskName) -> Vec<TaskName> {
        self.neighbors(task, Direction::Outgoing)
    }

    fn neighbors(&self, task: &TaskName, direction: Direction) -> Vec<TaskName> {
        let idx = match self.node_map.get(task) {
            Some(idx) => *idx,
            None => return vec![],
        };

        let mut names: Vec<TaskName> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        names.sort();
        names
    }

    /// Returns why `task` depends on `dependency`, if it does directly
    pub fn edge_kind(&self, task: &TaskName, dependency: &TaskName) -> Option<&EdgeKind> {
        let task_idx = self.node_map.get(task)?;
        let dep_idx = self.node_map.get(dependency)?;
        let edge = self.graph.find_edge(*dep_idx, *task_idx)?;
        self.graph.edge_weight(edge)
    }

    /// Returns the task producing an artifact
    pub fn producer(&self, artifact: &ArtifactName) -> Option<&TaskName> {
        self.producers.get(artifact)
    }

    /// Returns the targets plus everything they transitively depend on.
    /// Tasks in `boundary` are included but the walk does not continue past
    /// them.
    pub fn closure(
        &self,
        targets: &[TaskName],
        boundary: &HashSet<TaskName>,
    ) -> Result<HashSet<TaskName>, GraphError> {
        let mut stack = Vec::with_capacity(targets.len());
        for target in targets {
            let idx = *self
                .node_map
                .get(target)
                .ok_or_else(|| GraphError::TaskNotFound(target.clone()))?;
            stack.push(idx);
        }

        let mut closure = HashSet::new();
        while let Some(idx) = stack.pop() {
            let name = &self.graph[idx];
            if !closure.insert(name.clone()) || boundary.contains(name) {
                continue;
            }
            stack.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
        }

        Ok(closure)
    }

    /// Returns every task that transitively depends on `task`
    pub fn transitive_dependents(&self, task: &TaskName) -> HashSet<TaskName> {
        let Some(&start) = self.node_map.get(task) else {
            return HashSet::new();
        };

        let mut dependents = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                dependents.insert(self.graph[idx].clone());
            }
        }
        dependents
    }

    /// Returns all tasks in topological order (dependencies before dependents)
    pub fn topological_order(&self) -> Result<Vec<TaskName>, GraphError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => {
                // Unreachable while add_edge keeps the graph acyclic
                let name = self.graph[cycle.node_id()].clone();
                Err(GraphError::CycleDetected(name.clone(), name))
            }
        }
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, task: &TaskName) -> bool {
        self.node_map.contains_key(task)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }
}
