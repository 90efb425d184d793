//! Project management
//!
//! Handles project initialization and gives access to the manifest, the
//! assembled pipeline and the build layout.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::{Config, PipelineConfig, MANIFEST_FILE};
use crate::pipeline::{BuildLayout, Pipeline};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("No pipeline.toml found. Run 'stagehand init' first.")]
    NotInProject,
}

const DEFAULT_INDEX: &str = r#"= API Documentation
:doctype: book
:toc: left
:source-highlighter: highlightjs

== Overview

Snippets generated by the test stage are included from `{snippets}`.
"#;

const GITIGNORE: &str = "build/\n";

/// Manifest written by `stagehand init`; `{name}` is the project name
const DEFAULT_MANIFEST: &str = r#"# stagehand build pipeline
default_tasks = ["build"]

[project]
group = "com.example"
name = "{name}"
version = "0.0.1-SNAPSHOT"
description = "{name}"
runtime_version = 17
encoding = "UTF-8"
main_class = "com.example.Application"

[configurations]
compile_only = { extends_from = ["annotation_processor"] }
asciidoctor_ext = {}

[dependencies]
implementation = [
    "org.springframework.boot:spring-boot-starter-web",
    "org.springframework.boot:spring-boot-starter-validation",
]
compile_only = ["org.projectlombok:lombok"]
annotation_processor = ["org.projectlombok:lombok"]
test_implementation = [
    "org.springframework.boot:spring-boot-starter-test",
    "org.springframework.restdocs:spring-restdocs-mockmvc",
]
test_runtime_only = ["org.junit.platform:junit-platform-launcher"]
asciidoctor_ext = ["org.springframework.restdocs:spring-restdocs-asciidoctor"]

[tasks.compile]
action = "compile"
description = "Checks and stages main sources and resources"
sources = ["src/main/java"]
resources = ["src/main/resources"]

[tasks.test]
action = "test"
description = "Runs the test suite and records documentation snippets"
inputs = ["classes"]
outputs = ["snippets"]
command = [
    "sh", "-c",
    "java -jar \"$JUNIT_CONSOLE\" execute --scan-class-path --class-path \"$STAGEHAND_INPUT_CLASSES\" -Dorg.springframework.restdocs.outputDir=\"$STAGEHAND_OUTPUT_SNIPPETS\"",
]

[tasks.asciidoctor]
action = "docs"
description = "Renders API documentation from the test snippets"
source_dir = "src/docs/asciidoc"
include = ["**/index.adoc"]
extensions = "asciidoctor_ext"

[tasks.boot-jar]
action = "boot-archive"
description = "Packages the runnable archive with documentation under static/docs"

[tasks.jar]
action = "plain-archive"
description = "Plain archive (never built)"
enabled = false

[tasks.build]
action = "lifecycle"
description = "Compiles, tests, documents and packages the project"
depends_on = ["boot-jar", "jar"]
"#;

/// A stagehand project: a directory holding `pipeline.toml`
pub struct Project {
    root: PathBuf,
    manifest: PipelineConfig,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let manifest_path = root.join(MANIFEST_FILE);

        if !manifest_path.is_file() {
            return Err(ProjectError::NotInProject.into());
        }

        let manifest = PipelineConfig::load(&manifest_path)?;
        Ok(Self { root, manifest })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let root = Config::find_project_root_from(&cwd).ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a project at the given path. Existing files are kept.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        for dir in ["src/main/java", "src/main/resources", "src/test/java", "src/docs/asciidoc"] {
            let path = root.join(dir);
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }

        let manifest_path = root.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            let manifest = DEFAULT_MANIFEST.replace("{name}", &project_name(&root));
            fs::write(&manifest_path, manifest)
                .with_context(|| format!("Failed to write manifest: {}", manifest_path.display()))?;
        }

        let index_path = root.join("src/docs/asciidoc/index.adoc");
        if !index_path.exists() {
            fs::write(&index_path, DEFAULT_INDEX)
                .with_context(|| format!("Failed to write {}", index_path.display()))?;
        }

        let gitignore_path = root.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn manifest(&self) -> &PipelineConfig {
        &self.manifest
    }

    /// Assembles the pipeline described by the manifest
    pub fn pipeline(&self) -> Result<Pipeline> {
        self.manifest
            .to_pipeline()
            .with_context(|| format!("Invalid manifest: {}", self.manifest_path().display()))
    }

    /// Build layout, with an optional override of the manifest's build dir
    pub fn layout(&self, build_dir: Option<&Path>) -> BuildLayout {
        let build_dir = build_dir.unwrap_or(&self.manifest.build_dir);
        BuildLayout::new(&self.root, build_dir)
    }
}

/// Directory name reduced to characters valid in an archive name
fn project_name(root: &Path) -> String {
    let raw = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '-' })
        .collect();

    let name = name.trim_matches('-');
    if name.is_empty() {
        "app".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskName;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.manifest_path().is_file());
        assert!(dir.path().join("src/main/java").is_dir());
        assert!(dir.path().join("src/docs/asciidoc/index.adoc").is_file());
        assert!(dir.path().join(".gitignore").is_file());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();

        fs::write(dir.path().join("src/docs/asciidoc/index.adoc"), "= Mine\n").unwrap();
        Project::init(dir.path()).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("src/docs/asciidoc/index.adoc")).unwrap(),
            "= Mine\n"
        );
    }

    #[test]
    fn default_manifest_builds_a_pipeline() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let pipeline = project.pipeline().unwrap();

        let plan = pipeline.plan(&[], &[]).unwrap();
        let order: Vec<&str> = plan.tasks.iter().map(|t| t.name.as_str()).collect();
        let pos = |t: &str| order.iter().position(|n| *n == t).unwrap();
        assert!(pos("compile") < pos("test"));
        assert!(pos("test") < pos("asciidoctor"));
        assert!(pos("asciidoctor") < pos("boot-jar"));
        assert!(!pipeline.spec(&TaskName::new("jar").unwrap()).unwrap().enabled);
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        let err = Project::open(dir.path()).err().unwrap();
        assert!(err.to_string().contains("stagehand init"));
    }

    #[test]
    fn layout_override() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert_eq!(project.layout(None).build_dir(), dir.path().join("build"));
        assert_eq!(
            project.layout(Some(Path::new("out"))).build_dir(),
            dir.path().join("out")
        );
    }

    #[test]
    fn project_name_is_sanitized() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("fastpick be!");
        fs::create_dir_all(&sub).unwrap();
        assert_eq!(project_name(&sub), "fastpick-be");
    }
}
