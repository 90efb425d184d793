//! Stagehand - a local build-pipeline runner
//!
//! A project declares tasks in `pipeline.toml`. Stagehand orders them in a
//! dependency graph, passes artifacts between them through explicit handles
//! and publishes outputs only when the whole run succeeds. The stock
//! pipeline compiles sources, runs tests that record documentation snippets,
//! renders those snippets into HTML and packages everything into a runnable
//! archive.

pub mod domain;
pub mod pipeline;
pub mod storage;
pub mod cli;

pub use domain::{BuildPlan, TaskGraph, TaskName, TaskSpec, TaskState};
pub use pipeline::{BuildReport, Executor, Pipeline};
