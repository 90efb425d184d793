//! Compile stage
//!
//! Every source file is decoded with the project encoding before anything
//! else happens; a file that does not decode fails the stage. Sources and
//! resources are then staged into the classes artifact, and the optional
//! compiler command runs with that artifact as its output.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::action::{StageAction, StageContext};
use super::command::CommandStage;
use super::error::{FailureKind, StageError};
use super::fsutil::{copy_tree, walk_files};
use crate::domain::ArtifactName;

/// The only encoding sources may be declared in
pub const SUPPORTED_ENCODING: &str = "UTF-8";

#[derive(Debug, Clone)]
pub struct CompileStage {
    sources: Vec<PathBuf>,
    resources: Vec<PathBuf>,
    output: ArtifactName,
    compiler: Option<CommandStage>,
}

impl CompileStage {
    pub fn new(output: ArtifactName) -> Self {
        Self {
            sources: Vec::new(),
            resources: Vec::new(),
            output,
            compiler: None,
        }
    }

    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sources.push(root.into());
        self
    }

    pub fn resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resources.push(root.into());
        self
    }

    /// External compiler; its failures are reported as compilation errors
    pub fn compiler(mut self, command: CommandStage) -> Self {
        self.compiler = Some(command.failure_kind(FailureKind::Compilation));
        self
    }

    /// Decodes one source file, naming the first bad byte on failure
    fn check_encoding(root: &Path, rel: &Path) -> Result<(), StageError> {
        let path = root.join(rel);
        let bytes = fs::read(&path)
            .map_err(|e| StageError::io(format!("Failed to read {}", path.display()), e))?;

        std::str::from_utf8(&bytes).map_err(|e| {
            StageError::Compilation(format!(
                "{}: not valid {} (invalid byte at offset {})",
                path.display(),
                SUPPORTED_ENCODING,
                e.valid_up_to()
            ))
        })?;
        Ok(())
    }
}

impl StageAction for CompileStage {
    fn kind(&self) -> &'static str {
        "compile"
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<(), StageError> {
        if !ctx.meta.encoding.eq_ignore_ascii_case(SUPPORTED_ENCODING) {
            return Err(StageError::Compilation(format!(
                "unsupported source encoding '{}'",
                ctx.meta.encoding
            )));
        }

        let out = ctx.output(&self.output)?;
        let mut source_count = 0;

        for root in &self.sources {
            let root = ctx.resolve(root);
            let files = walk_files(&root)
                .map_err(|e| StageError::io(format!("Failed to scan {}", root.display()), e))?;
            if files.is_empty() {
                debug!(task = %ctx.task, root = %root.display(), "No sources");
                continue;
            }

            for rel in &files {
                Self::check_encoding(&root, rel)?;
            }

            copy_tree(&root, out)
                .map_err(|e| StageError::io(format!("Failed to stage {}", root.display()), e))?;
            source_count += files.len();
        }

        let mut resource_count = 0;
        for root in &self.resources {
            let root = ctx.resolve(root);
            resource_count += copy_tree(&root, out)
                .map_err(|e| StageError::io(format!("Failed to stage {}", root.display()), e))?;
        }

        info!(
            task = %ctx.task,
            sources = source_count,
            resources = resource_count,
            "Staged compilation inputs"
        );

        if let Some(compiler) = &self.compiler {
            compiler.run(ctx)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskName;
    use crate::storage::ProjectMeta;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let java = dir.path().join("src/main/java/com/maximum0/fastpickbe");
        fs::create_dir_all(&java).unwrap();
        fs::write(java.join("Application.java"), "class Application {} // 쿠폰").unwrap();

        let resources = dir.path().join("src/main/resources");
        fs::create_dir_all(&resources).unwrap();
        fs::write(resources.join("application.yml"), "server:\n  port: 8080\n").unwrap();

        let out = dir.path().join("build/classes");
        fs::create_dir_all(&out).unwrap();
        (dir, out)
    }

    fn stage() -> CompileStage {
        CompileStage::new(ArtifactName::new("classes").unwrap())
            .source_root("src/main/java")
            .resource_root("src/main/resources")
    }

    #[test]
    fn stages_sources_and_resources() {
        let (dir, out) = setup();
        let task = TaskName::new("compile").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, dir.path(), &meta)
            .with_output(ArtifactName::new("classes").unwrap(), out.clone());

        stage().run(&ctx).unwrap();

        assert!(out.join("com/maximum0/fastpickbe/Application.java").is_file());
        assert!(out.join("application.yml").is_file());
    }

    #[test]
    fn invalid_utf8_is_compilation_error() {
        let (dir, out) = setup();
        fs::write(
            dir.path().join("src/main/java/Broken.java"),
            [b'c', b'l', 0xff, 0xfe],
        )
        .unwrap();

        let task = TaskName::new("compile").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, dir.path(), &meta)
            .with_output(ArtifactName::new("classes").unwrap(), out);

        let err = stage().run(&ctx).unwrap_err();
        assert!(matches!(err, StageError::Compilation(_)));
        assert!(err.to_string().contains("Broken.java"));
        assert!(err.to_string().contains("offset 2"));
    }

    #[test]
    fn other_encodings_are_refused() {
        let (dir, out) = setup();
        let task = TaskName::new("compile").unwrap();
        let meta = ProjectMeta {
            encoding: "ISO-8859-1".to_string(),
            ..ProjectMeta::default()
        };
        let ctx = StageContext::new(&task, dir.path(), &meta)
            .with_output(ArtifactName::new("classes").unwrap(), out);

        assert!(matches!(stage().run(&ctx), Err(StageError::Compilation(_))));
    }

    #[test]
    fn missing_source_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let task = TaskName::new("compile").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, dir.path(), &meta)
            .with_output(ArtifactName::new("classes").unwrap(), out.clone());

        stage().run(&ctx).unwrap();
        assert!(walk_files(&out).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn compiler_failure_is_compilation_error() {
        let (dir, out) = setup();
        let task = TaskName::new("compile").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, dir.path(), &meta)
            .with_output(ArtifactName::new("classes").unwrap(), out);

        let javac = CommandStage::from_argv(&["false".to_string()]).unwrap();
        let err = stage().compiler(javac).run(&ctx).unwrap_err();
        assert!(matches!(err, StageError::Compilation(_)));
    }
}
