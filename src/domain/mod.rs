//! Domain models for stagehand
//!
//! Contains the dependency and task model without any I/O concerns.

mod name;
mod coordinate;
mod scope;
mod dependency;
mod task;
mod artifact;
mod graph;
mod plan;

pub use name::{ArtifactName, NameError, TaskName};
pub use coordinate::{Coordinate, CoordinateError};
pub use scope::{Classpath, Scope, ScopeError};
pub use dependency::{DependencyDeclaration, DependencySet};
pub use task::{TaskSpec, TaskState};
pub use artifact::{ArtifactError, ArtifactHandle, ArtifactRegistry};
pub use graph::{EdgeKind, GraphError, TaskGraph};
pub use plan::{BuildPlan, PlanError, PlanStep, PlannedTask};
