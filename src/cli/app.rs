//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use super::output::{Output, OutputFormat};
use super::{build, inspect, logging};
use crate::domain::{Classpath, TaskName};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(author, version, about = "Compile, test, document and package a project in dependency order")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Build directory, relative to the project root
    #[arg(long, global = true, env = "STAGEHAND_BUILD_DIR")]
    pub build_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Run tasks and everything they depend on
    Build {
        /// Tasks to run (defaults to the manifest's default_tasks)
        tasks: Vec<TaskName>,

        /// Skip a task; may be repeated
        #[arg(short = 'x', long = "exclude-task")]
        exclude: Vec<TaskName>,

        /// Keep running tasks that do not depend on a failed one
        #[arg(long = "continue")]
        continue_on_failure: bool,

        /// Print the plan without running anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List tasks in execution order
    Tasks {
        /// Include disabled tasks and artifact details
        #[arg(long)]
        all: bool,
    },

    /// List dependency declarations, or resolve one classpath
    Deps {
        /// Classpath to resolve (e.g. runtime, test_compile, asciidoctor_ext)
        #[arg(long)]
        classpath: Option<Classpath>,
    },

    /// Remove the build directory
    Clean,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load()?.global.default_format,
    };
    let output = Output::new(format);
    let build_dir = cli.build_dir.as_deref();

    debug!("stagehand starting");

    match cli.command {
        Commands::Init { path } => {
            debug!(path = %path.display(), "Initializing project");
            let project = Project::init(&path)?;
            output.success(&format!(
                "Initialized stagehand project at {}",
                project.root().display()
            ));
        }

        Commands::Build {
            tasks,
            exclude,
            continue_on_failure,
            dry_run,
        } => build::run(
            &output,
            build_dir,
            &tasks,
            &exclude,
            continue_on_failure,
            dry_run,
        )?,

        Commands::Tasks { all } => inspect::tasks(&output, all)?,

        Commands::Deps { classpath } => inspect::deps(&output, classpath.as_ref())?,

        Commands::Clean => build::clean(&output, build_dir)?,
    }

    debug!("Command completed successfully");
    Ok(())
}
