//! Configuration handling for stagehand
//!
//! The project manifest is `pipeline.toml` at the project root; user
//! preferences live in `~/.config/stagehand/config.toml` (global).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    ArtifactName, Classpath, Coordinate, DependencySet, NameError, Scope, TaskName, TaskSpec,
};
use crate::pipeline::{
    BootArchiveStage, CommandStage, CompileStage, DocsStage, FailureKind, Lifecycle, Pipeline,
    PipelineError, PlainArchiveStage, StageAction, SUPPORTED_ENCODING,
};

/// File name of the project manifest
pub const MANIFEST_FILE: &str = "pipeline.toml";

/// Artifact names that would collide with the build directory layout
const RESERVED_ARTIFACTS: &[&str] = &["reports"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("project.name must not be empty")]
    MissingProjectName,

    #[error("project.runtime_version must be positive, got {0}")]
    InvalidRuntimeVersion(u32),

    #[error("Unsupported source encoding '{0}' (only UTF-8 is supported)")]
    UnsupportedEncoding(String),

    #[error("Task '{0}' builds the plain archive, which must stay disabled")]
    PlainArchiveEnabled(TaskName),

    #[error("Task '{0}' has an empty command")]
    EmptyCommand(TaskName),

    #[error("Default task '{0}' is not defined")]
    UnknownDefaultTask(TaskName),

    #[error("Task '{task}' requests unknown classpath '{classpath}'")]
    UnknownClasspath { task: TaskName, classpath: String },

    #[error("Artifact name '{0}' is reserved")]
    ReservedArtifact(ArtifactName),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Identity and build settings of the project being built
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectMeta {
    pub group: String,
    pub name: String,
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Java language level handed to stages and written to the manifest
    pub runtime_version: u32,

    /// Application entry point; required for the runnable archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,

    /// Source file encoding
    pub encoding: String,
}

impl Default for ProjectMeta {
    fn default() -> Self {
        Self {
            group: String::new(),
            name: String::new(),
            version: "unspecified".to_string(),
            description: None,
            runtime_version: 17,
            main_class: None,
            encoding: SUPPORTED_ENCODING.to_string(),
        }
    }
}

/// A named dependency configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ConfigurationConfig {
    /// Scopes whose dependencies this one inherits
    pub extends_from: Vec<Scope>,
}

/// The action a task runs, selected by its `action` key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ActionConfig {
    Compile {
        #[serde(default = "default_sources")]
        sources: Vec<PathBuf>,
        #[serde(default = "default_resources")]
        resources: Vec<PathBuf>,
        #[serde(default)]
        output: Option<ArtifactName>,
        /// Optional external compiler
        #[serde(default)]
        command: Option<Vec<String>>,
    },

    Test {
        command: Vec<String>,
        #[serde(default)]
        working_dir: Option<PathBuf>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },

    Command {
        command: Vec<String>,
        #[serde(default)]
        working_dir: Option<PathBuf>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },

    Docs {
        #[serde(default = "default_docs_dir")]
        source_dir: PathBuf,
        #[serde(default)]
        include: Vec<String>,
        #[serde(default)]
        snippets: Option<ArtifactName>,
        #[serde(default)]
        output: Option<ArtifactName>,
        /// Classpath of renderer extensions
        #[serde(default)]
        extensions: Option<Classpath>,
    },

    BootArchive {
        #[serde(default)]
        classes: Option<ArtifactName>,
        #[serde(default)]
        docs: Option<ArtifactName>,
        #[serde(default)]
        output: Option<ArtifactName>,
        #[serde(default)]
        docs_path: Option<String>,
        #[serde(default)]
        archive_name: Option<String>,
    },

    PlainArchive {},

    Lifecycle {},
}

impl ActionConfig {
    /// Output artifact named in the action's own settings
    fn output(&self) -> Option<&ArtifactName> {
        match self {
            ActionConfig::Compile { output, .. }
            | ActionConfig::Docs { output, .. }
            | ActionConfig::BootArchive { output, .. } => output.as_ref(),
            _ => None,
        }
    }
}

fn default_sources() -> Vec<PathBuf> {
    vec![PathBuf::from("src/main/java")]
}

fn default_resources() -> Vec<PathBuf> {
    vec![PathBuf::from("src/main/resources")]
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("src/docs/asciidoc")
}

fn default_true() -> bool {
    true
}

fn artifact_or(name: &Option<ArtifactName>, default: &str) -> Result<ArtifactName, NameError> {
    match name {
        Some(name) => Ok(name.clone()),
        None => ArtifactName::new(default),
    }
}

/// One `[tasks.<name>]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ArtifactName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ArtifactName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classpaths: Vec<Classpath>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(flatten)]
    pub action: ActionConfig,
}

impl TaskConfig {
    /// Declared settings plus what the action implies, and the action itself
    fn build(&self, name: &TaskName) -> Result<(TaskSpec, Box<dyn StageAction>), ConfigError> {
        let mut spec = TaskSpec::new(name.clone());
        if let Some(description) = &self.description {
            spec = spec.with_description(description.clone());
        }
        for dep in &self.depends_on {
            spec = spec.depends_on(dep.clone());
        }
        for input in &self.inputs {
            spec = spec.input(input.clone());
        }
        for output in &self.outputs {
            spec = spec.output(output.clone());
        }
        for classpath in &self.classpaths {
            spec = spec.classpath(classpath.clone());
        }
        if !self.enabled {
            spec = spec.disabled();
        }

        let action: Box<dyn StageAction> = match &self.action {
            ActionConfig::Compile {
                sources,
                resources,
                output,
                command,
            } => {
                let output = artifact_or(output, "classes")?;
                spec = spec
                    .output(output.clone())
                    .classpath(Classpath::Compile)
                    .classpath(Classpath::AnnotationProcessor);

                let mut stage = CompileStage::new(output);
                for root in sources {
                    stage = stage.source_root(root.clone());
                }
                for root in resources {
                    stage = stage.resource_root(root.clone());
                }
                if let Some(argv) = command {
                    let compiler = CommandStage::from_argv(argv)
                        .ok_or_else(|| ConfigError::EmptyCommand(name.clone()))?;
                    stage = stage.compiler(compiler);
                }
                Box::new(stage)
            }

            ActionConfig::Test {
                command,
                working_dir,
                env,
            } => {
                spec = spec
                    .classpath(Classpath::TestCompile)
                    .classpath(Classpath::TestRuntime);
                Box::new(command_stage(name, command, working_dir, env)?.failure_kind(FailureKind::Test))
            }

            ActionConfig::Command {
                command,
                working_dir,
                env,
            } => Box::new(command_stage(name, command, working_dir, env)?),

            ActionConfig::Docs {
                source_dir,
                include,
                snippets,
                output,
                extensions,
            } => {
                let snippets = artifact_or(snippets, "snippets")?;
                let output = artifact_or(output, "docs")?;
                spec = spec.input(snippets.clone()).output(output.clone());

                let mut stage = DocsStage::new(source_dir.clone(), snippets, output);
                for pattern in include {
                    stage = stage.include(pattern.clone());
                }
                if let Some(extensions) = extensions {
                    spec = spec.classpath(extensions.clone());
                    stage = stage.extensions(extensions.clone());
                }
                Box::new(stage)
            }

            ActionConfig::BootArchive {
                classes,
                docs,
                output,
                docs_path,
                archive_name,
            } => {
                let classes = artifact_or(classes, "classes")?;
                let docs = artifact_or(docs, "docs")?;
                let output = artifact_or(output, "libs")?;
                spec = spec
                    .input(classes.clone())
                    .input(docs.clone())
                    .output(output.clone())
                    .classpath(Classpath::Runtime);

                let mut stage = BootArchiveStage::new(classes, docs, output);
                if let Some(path) = docs_path {
                    stage = stage.docs_path(path.clone());
                }
                if let Some(file) = archive_name {
                    stage = stage.archive_name(file.clone());
                }
                Box::new(stage)
            }

            ActionConfig::PlainArchive {} => Box::new(PlainArchiveStage),

            ActionConfig::Lifecycle {} => Box::new(Lifecycle),
        };

        Ok((spec, action))
    }
}

fn command_stage(
    task: &TaskName,
    argv: &[String],
    working_dir: &Option<PathBuf>,
    env: &BTreeMap<String, String>,
) -> Result<CommandStage, ConfigError> {
    let mut stage =
        CommandStage::from_argv(argv).ok_or_else(|| ConfigError::EmptyCommand(task.clone()))?;
    if let Some(dir) = working_dir {
        stage = stage.working_dir(dir.clone());
    }
    for (key, value) in env {
        stage = stage.env(key.clone(), value.clone());
    }
    Ok(stage)
}

/// The whole `pipeline.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub project: ProjectMeta,

    /// Tasks built when `stagehand build` is given no targets
    #[serde(default)]
    pub default_tasks: Vec<TaskName>,

    /// Build directory, relative to the project root
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    #[serde(default)]
    pub configurations: BTreeMap<Scope, ConfigurationConfig>,

    #[serde(default)]
    pub dependencies: BTreeMap<Scope, Vec<Coordinate>>,

    #[serde(default)]
    pub tasks: BTreeMap<TaskName, TaskConfig>,
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

impl PipelineConfig {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and validates the manifest at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid manifest: {}", path.display()))?;
        Ok(config)
    }

    /// Checks the manifest-level invariants that do not need the task graph
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.name.trim().is_empty() {
            return Err(ConfigError::MissingProjectName);
        }
        if self.project.runtime_version == 0 {
            return Err(ConfigError::InvalidRuntimeVersion(0));
        }
        if !self.project.encoding.eq_ignore_ascii_case(SUPPORTED_ENCODING) {
            return Err(ConfigError::UnsupportedEncoding(self.project.encoding.clone()));
        }

        for default in &self.default_tasks {
            if !self.tasks.contains_key(default) {
                return Err(ConfigError::UnknownDefaultTask(default.clone()));
            }
        }

        let known_scopes = self.known_scopes();

        for (name, task) in &self.tasks {
            match &task.action {
                ActionConfig::PlainArchive {} if task.enabled => {
                    return Err(ConfigError::PlainArchiveEnabled(name.clone()));
                }
                ActionConfig::Test { command, .. } | ActionConfig::Command { command, .. }
                    if command.is_empty() =>
                {
                    return Err(ConfigError::EmptyCommand(name.clone()));
                }
                _ => {}
            }

            let extensions = match &task.action {
                ActionConfig::Docs { extensions, .. } => extensions.as_ref(),
                _ => None,
            };
            for classpath in task.classpaths.iter().chain(extensions) {
                if let Classpath::Scope(scope @ Scope::Custom(_)) = classpath {
                    if !known_scopes.contains(&scope) {
                        return Err(ConfigError::UnknownClasspath {
                            task: name.clone(),
                            classpath: classpath.to_string(),
                        });
                    }
                }
            }

            for output in task.outputs.iter().chain(task.action.output()) {
                if RESERVED_ARTIFACTS.contains(&output.as_str()) {
                    return Err(ConfigError::ReservedArtifact(output.clone()));
                }
            }
        }

        Ok(())
    }

    /// Scopes that are declared, configured or extended from
    fn known_scopes(&self) -> Vec<&Scope> {
        let mut scopes: Vec<&Scope> = self
            .configurations
            .iter()
            .flat_map(|(scope, cfg)| std::iter::once(scope).chain(cfg.extends_from.iter()))
            .chain(self.dependencies.keys())
            .collect();
        scopes.sort();
        scopes.dedup();
        scopes
    }

    /// The declared dependencies with configuration inheritance applied
    pub fn dependency_set(&self) -> DependencySet {
        let mut deps = DependencySet::new();
        for (scope, cfg) in &self.configurations {
            for parent in &cfg.extends_from {
                deps.extend(scope.clone(), parent.clone());
            }
        }
        for (scope, coordinates) in &self.dependencies {
            for coordinate in coordinates {
                deps.declare(coordinate.clone(), scope.clone());
            }
        }
        deps
    }

    /// Builds the runnable pipeline
    pub fn to_pipeline(&self) -> Result<Pipeline, ConfigError> {
        self.validate()?;

        let mut builder = Pipeline::builder(self.project.clone()).dependencies(self.dependency_set());
        for (name, task) in &self.tasks {
            let (spec, action) = task.build(name)?;
            builder = builder.boxed_task(spec, action);
        }
        for default in &self.default_tasks {
            builder = builder.default_task(default.clone());
        }

        Ok(builder.build()?)
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Combined configuration (global + located project)
#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = std::env::current_dir()
            .ok()
            .and_then(|dir| Self::find_project_root_from(&dir));

        Ok(Self {
            global,
            project_root,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "stagehand", "stagehand").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Finds the project root by walking up from `start` to a directory
    /// containing `pipeline.toml`
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(MANIFEST_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns the project root, or an error if not in a project
    pub fn require_project_root(&self) -> Result<&Path> {
        self.project_root.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No {} found. Run 'stagehand init' first.", MANIFEST_FILE)
        })
    }
}
