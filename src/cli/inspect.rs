//! `tasks` and `deps` commands

use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;

use super::output::Output;
use crate::domain::{ArtifactName, Classpath, Coordinate, TaskName};
use crate::storage::Project;

#[derive(Serialize)]
struct TaskRow<'a> {
    name: &'a TaskName,
    action: &'static str,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    depends_on: Vec<TaskName>,
    inputs: &'a [ArtifactName],
    outputs: &'a [ArtifactName],
    classpaths: &'a [Classpath],
}

pub fn tasks(output: &Output, all: bool) -> Result<()> {
    let project = Project::open_current()?;
    let pipeline = project.pipeline()?;

    let mut rows = Vec::new();
    for name in pipeline.graph().topological_order()? {
        let (Some(spec), Some(action)) = (pipeline.spec(&name), pipeline.action(&name)) else {
            continue;
        };
        if !spec.enabled && !all {
            continue;
        }

        let mut depends_on = pipeline.graph().dependencies(&name);
        depends_on.sort();

        rows.push(TaskRow {
            name: &spec.name,
            action: action.kind(),
            enabled: spec.enabled,
            description: spec.description.as_deref(),
            depends_on,
            inputs: &spec.inputs,
            outputs: &spec.outputs,
            classpaths: &spec.classpaths,
        });
    }

    if output.is_json() {
        output.data(&rows);
        return Ok(());
    }

    for row in &rows {
        let name = if row.enabled {
            row.name.to_string()
        } else {
            format!("{} (disabled)", row.name)
        };
        let deps = row
            .depends_on
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        output.row(&[
            &name,
            row.action,
            &deps,
            row.description.unwrap_or(""),
        ]);

        if all {
            if !row.inputs.is_empty() {
                println!("    inputs: {}", join(row.inputs));
            }
            if !row.outputs.is_empty() {
                println!("    outputs: {}", join(row.outputs));
            }
            if !row.classpaths.is_empty() {
                println!("    classpaths: {}", join(row.classpaths));
            }
        }
    }

    Ok(())
}

pub fn deps(output: &Output, classpath: Option<&Classpath>) -> Result<()> {
    let project = Project::open_current()?;
    let dependencies = project.manifest().dependency_set();

    match classpath {
        Some(classpath) => {
            let resolved: Vec<Coordinate> = dependencies.resolve(classpath);
            if output.is_json() {
                output.data(&serde_json::json!({
                    "classpath": classpath,
                    "scopes": classpath
                        .members()
                        .iter()
                        .flat_map(|s| dependencies.effective_scopes(s))
                        .map(|s| s.to_string())
                        .collect::<BTreeSet<_>>(),
                    "coordinates": resolved,
                }));
            } else if resolved.is_empty() {
                println!("No dependencies on the {} classpath", classpath);
            } else {
                for coordinate in &resolved {
                    println!("{}", coordinate);
                }
            }
        }
        None => {
            let grouped = dependencies.by_scope();
            if output.is_json() {
                output.data(&grouped);
            } else if grouped.is_empty() {
                println!("No dependencies declared");
            } else {
                for (scope, coordinates) in &grouped {
                    let parents = dependencies.parents(scope);
                    if parents.is_empty() {
                        println!("{}", scope);
                    } else {
                        println!("{} (extends {})", scope, join(parents));
                    }
                    for coordinate in coordinates {
                        println!("  {}", coordinate);
                    }
                }
            }
        }
    }

    Ok(())
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
