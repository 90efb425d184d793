//! Documentation stage
//!
//! Renders the selected AsciiDoc sources to HTML, resolving `{snippets}`
//! to the snippet artifact handed over by the test stage. The output
//! mirrors the source tree with `.adoc` replaced by `.html`.

use std::fs;
use std::path::PathBuf;

use glob::Pattern;
use tracing::{debug, info};

use super::action::{StageAction, StageContext};
use super::asciidoc::Renderer;
use super::error::StageError;
use super::fsutil::{to_entry_name, walk_files};
use crate::domain::{ArtifactName, Classpath};

/// Pattern used when no include patterns are configured
pub const DEFAULT_INCLUDE: &str = "**/index.adoc";

#[derive(Debug, Clone)]
pub struct DocsStage {
    source_dir: PathBuf,
    include: Vec<String>,
    snippets: ArtifactName,
    output: ArtifactName,
    extensions: Option<Classpath>,
}

impl DocsStage {
    pub fn new(source_dir: impl Into<PathBuf>, snippets: ArtifactName, output: ArtifactName) -> Self {
        Self {
            source_dir: source_dir.into(),
            include: Vec::new(),
            snippets,
            output,
            extensions: None,
        }
    }

    /// Adds a glob, relative to the source directory, selecting documents
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    /// Classpath of renderer extensions, recorded in the generated pages
    pub fn extensions(mut self, classpath: Classpath) -> Self {
        self.extensions = Some(classpath);
        self
    }

    pub fn snippets(&self) -> &ArtifactName {
        &self.snippets
    }

    pub fn output(&self) -> &ArtifactName {
        &self.output
    }

    pub fn extensions_classpath(&self) -> Option<&Classpath> {
        self.extensions.as_ref()
    }

    fn patterns(&self) -> Result<Vec<Pattern>, StageError> {
        let raw: Vec<&str> = if self.include.is_empty() {
            vec![DEFAULT_INCLUDE]
        } else {
            self.include.iter().map(String::as_str).collect()
        };

        raw.into_iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    StageError::Documentation(format!("invalid include pattern '{}': {}", p, e))
                })
            })
            .collect()
    }
}

impl StageAction for DocsStage {
    fn kind(&self) -> &'static str {
        "docs"
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<(), StageError> {
        let snippets = ctx.input(&self.snippets)?;
        let out = ctx.output(&self.output)?;
        let source_dir = ctx.resolve(&self.source_dir);
        let patterns = self.patterns()?;

        let mut renderer = Renderer::new().attribute("snippets", snippets.display().to_string());
        if let Some(extensions) = &self.extensions {
            let coords = ctx
                .classpath(extensions)
                .unwrap_or_default()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            renderer = renderer.meta("generator-extensions", coords);
        }

        let files = walk_files(&source_dir).map_err(|e| {
            StageError::io(format!("Failed to scan {}", source_dir.display()), e)
        })?;

        let selected: Vec<_> = files
            .iter()
            .filter(|rel| {
                let name = to_entry_name(rel);
                patterns.iter().any(|p| p.matches(&name))
            })
            .collect();

        if selected.is_empty() {
            return Err(StageError::Documentation(format!(
                "no documents in {} match the include patterns",
                source_dir.display()
            )));
        }

        for rel in &selected {
            let source = source_dir.join(rel);
            let html = renderer
                .render_file(&source)
                .map_err(|e| StageError::Documentation(e.to_string()))?;

            let target = out.join(rel.with_extension("html"));
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    StageError::io(format!("Failed to create {}", parent.display()), e)
                })?;
            }
            fs::write(&target, html)
                .map_err(|e| StageError::io(format!("Failed to write {}", target.display()), e))?;
            debug!(task = %ctx.task, document = %rel.display(), "Rendered");
        }

        info!(task = %ctx.task, documents = selected.len(), "Rendered documentation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtifactHandle, Scope, TaskName};
    use crate::storage::ProjectMeta;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::TempDir;

    fn artifact(s: &str) -> ArtifactName {
        ArtifactName::new(s).unwrap()
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    struct Fixture {
        dir: TempDir,
        snippets: PathBuf,
        out: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let snippets = dir.path().join("build/snippets");
        write(
            &snippets.join("coupon-issue/http-response.adoc"),
            "----\nHTTP/1.1 200 OK\n----\n",
        );
        write(
            &dir.path().join("src/docs/asciidoc/index.adoc"),
            "= FastPick API\n\ninclude::{snippets}/coupon-issue/http-response.adoc[]\n",
        );
        write(
            &dir.path().join("src/docs/asciidoc/partials/footer.adoc"),
            "Not a top-level document.\n",
        );
        let out = dir.path().join("build/.staging/docs/docs");
        fs::create_dir_all(&out).unwrap();
        Fixture { dir, snippets, out }
    }

    fn inputs(snippets: &Path) -> HashMap<ArtifactName, ArtifactHandle> {
        let mut inputs = HashMap::new();
        inputs.insert(
            artifact("snippets"),
            ArtifactHandle::new(artifact("snippets"), TaskName::new("test").unwrap(), snippets),
        );
        inputs
    }

    fn stage() -> DocsStage {
        DocsStage::new("src/docs/asciidoc", artifact("snippets"), artifact("docs"))
    }

    #[test]
    fn renders_index_only_by_default() {
        let fx = fixture();
        let task = TaskName::new("docs").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, fx.dir.path(), &meta)
            .with_inputs(inputs(&fx.snippets))
            .with_output(artifact("docs"), fx.out.clone());

        stage().run(&ctx).unwrap();

        let html = fs::read_to_string(fx.out.join("index.html")).unwrap();
        assert!(html.contains("HTTP/1.1 200 OK"));
        assert!(!fx.out.join("partials/footer.html").exists());
    }

    #[test]
    fn missing_snippet_fails_documentation() {
        let fx = fixture();
        fs::remove_dir_all(&fx.snippets).unwrap();
        fs::create_dir_all(&fx.snippets).unwrap();

        let task = TaskName::new("docs").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, fx.dir.path(), &meta)
            .with_inputs(inputs(&fx.snippets))
            .with_output(artifact("docs"), fx.out.clone());

        let err = stage().run(&ctx).unwrap_err();
        assert!(matches!(err, StageError::Documentation(_)));
        assert!(err.to_string().contains("http-response.adoc"));
    }

    #[test]
    fn without_snippets_handle_fails() {
        let fx = fixture();
        let task = TaskName::new("docs").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, fx.dir.path(), &meta)
            .with_output(artifact("docs"), fx.out.clone());

        assert!(matches!(stage().run(&ctx), Err(StageError::MissingInput(_))));
    }

    #[test]
    fn custom_patterns_and_extensions() {
        let fx = fixture();
        let task = TaskName::new("docs").unwrap();
        let meta = ProjectMeta::default();
        let ext = Classpath::Scope(Scope::Custom("asciidoctor_ext".to_string()));
        let ctx = StageContext::new(&task, fx.dir.path(), &meta)
            .with_inputs(inputs(&fx.snippets))
            .with_output(artifact("docs"), fx.out.clone())
            .with_classpath(
                ext.clone(),
                vec!["org.springframework.restdocs:spring-restdocs-asciidoctor".parse().unwrap()],
            );

        stage()
            .include("**/*.adoc")
            .extensions(ext)
            .run(&ctx)
            .unwrap();

        assert!(fx.out.join("partials/footer.html").is_file());
        let html = fs::read_to_string(fx.out.join("index.html")).unwrap();
        assert!(html.contains("spring-restdocs-asciidoctor"));
    }

    #[test]
    fn invalid_pattern_is_documentation_error() {
        let fx = fixture();
        let task = TaskName::new("docs").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, fx.dir.path(), &meta)
            .with_inputs(inputs(&fx.snippets))
            .with_output(artifact("docs"), fx.out.clone());

        let err = stage().include("***[").run(&ctx).unwrap_err();
        assert!(matches!(err, StageError::Documentation(_)));
    }

    #[test]
    fn no_matching_documents_fails() {
        let fx = fixture();
        let task = TaskName::new("docs").unwrap();
        let meta = ProjectMeta::default();
        let ctx = StageContext::new(&task, fx.dir.path(), &meta)
            .with_inputs(inputs(&fx.snippets))
            .with_output(artifact("docs"), fx.out.clone());

        let err = stage().include("**/*.md").run(&ctx).unwrap_err();
        assert!(err.to_string().contains("no documents"));
    }
}
