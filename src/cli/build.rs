//! `build` and `clean` commands

use std::path::Path;

use anyhow::{bail, Context, Result};

use super::output::Output;
use crate::domain::{PlanStep, TaskName, TaskState};
use crate::pipeline::fsutil::remove_path;
use crate::pipeline::{BuildReport, Executor, RunOptions};
use crate::storage::Project;

pub fn run(
    output: &Output,
    build_dir: Option<&Path>,
    tasks: &[TaskName],
    exclude: &[TaskName],
    continue_on_failure: bool,
    dry_run: bool,
) -> Result<()> {
    let project = Project::open_current()?;
    let pipeline = project.pipeline()?;
    let plan = pipeline.plan(tasks, exclude)?;

    if dry_run {
        if output.is_json() {
            output.data(&plan);
        } else {
            for planned in &plan.tasks {
                let note = match planned.step {
                    PlanStep::Run => "",
                    PlanStep::Disabled => " SKIPPED (disabled)",
                    PlanStep::Excluded => " SKIPPED (excluded)",
                };
                println!(":{}{}", planned.name, note);
            }
        }
        return Ok(());
    }

    let layout = project.layout(build_dir);
    let report = Executor::new(&pipeline, &layout)
        .options(RunOptions { continue_on_failure })
        .run(&plan)?;

    report
        .save(&layout.report_path())
        .context("Failed to write build report")?;

    if output.is_json() {
        output.data(&report);
    } else {
        print_report(&report, layout.project_dir());
    }

    if let Some(failed) = report.first_failure() {
        bail!(
            "Task '{}' failed\n{}",
            failed.name,
            failed.diagnostics.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn print_report(report: &BuildReport, project_dir: &Path) {
    for task in &report.tasks {
        match task.state {
            TaskState::Succeeded => println!("> Task :{}", task.name),
            state => println!("> Task :{} {}", task.name, state.label()),
        }
    }

    println!();
    let elapsed = (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0;
    if report.success {
        println!("BUILD SUCCESSFUL in {:.1}s", elapsed);
    } else {
        println!("BUILD FAILED in {:.1}s", elapsed);
    }

    if !report.artifacts.is_empty() {
        println!();
        for artifact in &report.artifacts {
            let shown = artifact
                .path
                .strip_prefix(project_dir)
                .unwrap_or(&artifact.path);
            println!(
                "{:<10} {:<24} {} file(s), {} bytes, blake3 {}",
                artifact.name,
                shown.display(),
                artifact.files,
                artifact.bytes,
                artifact.digest.get(..16).unwrap_or(&artifact.digest)
            );
        }
    }
}

pub fn clean(output: &Output, build_dir: Option<&Path>) -> Result<()> {
    let project = Project::open_current()?;
    let layout = project.layout(build_dir);

    if layout.build_dir().exists() {
        // Refuse while another build is running
        drop(layout.lock()?);
        remove_path(layout.build_dir()).with_context(|| {
            format!("Failed to remove {}", layout.build_dir().display())
        })?;
    }

    output.success(&format!("Removed {}", layout.build_dir().display()));
    Ok(())
}
