//! Packaging stages
//!
//! The runnable archive is a zip laid out like a Spring Boot jar, with the
//! rendered documentation embedded under `static/docs/`. It is built so that
//! the same inputs always produce the same bytes: entries are sorted and
//! every entry carries the same timestamp and fixed permissions.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::action::{StageAction, StageContext};
use super::error::StageError;
use super::fsutil::{to_entry_name, walk_files};
use crate::domain::{ArtifactName, Classpath};

pub const LAUNCHER_CLASS: &str = "org.springframework.boot.loader.launch.JarLauncher";
pub const DEFAULT_DOCS_PATH: &str = "static/docs";

const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";
const CLASSES_PREFIX: &str = "BOOT-INF/classes";
const CLASSPATH_INDEX_ENTRY: &str = "BOOT-INF/classpath.idx";

const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

/// Where an entry's bytes come from
#[derive(Debug)]
enum EntrySource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Runnable archive with compiled classes and documentation
#[derive(Debug, Clone)]
pub struct BootArchiveStage {
    classes: ArtifactName,
    docs: ArtifactName,
    output: ArtifactName,
    docs_path: String,
    archive_name: Option<String>,
}

impl BootArchiveStage {
    pub fn new(classes: ArtifactName, docs: ArtifactName, output: ArtifactName) -> Self {
        Self {
            classes,
            docs,
            output,
            docs_path: DEFAULT_DOCS_PATH.to_string(),
            archive_name: None,
        }
    }

    /// Directory inside the archive that receives the documentation
    pub fn docs_path(mut self, path: impl Into<String>) -> Self {
        self.docs_path = path.into().trim_matches('/').to_string();
        self
    }

    pub fn archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = Some(name.into());
        self
    }

    pub fn classes(&self) -> &ArtifactName {
        &self.classes
    }

    pub fn docs(&self) -> &ArtifactName {
        &self.docs
    }

    pub fn output(&self) -> &ArtifactName {
        &self.output
    }

    /// `<name>-<version>.jar` unless overridden
    fn file_name(&self, ctx: &StageContext<'_>) -> String {
        match &self.archive_name {
            Some(name) => name.clone(),
            None => format!("{}-{}.jar", ctx.meta.name, ctx.meta.version),
        }
    }

    fn manifest(&self, ctx: &StageContext<'_>, main_class: &str) -> String {
        let lines = [
            ("Manifest-Version", "1.0".to_string()),
            ("Main-Class", LAUNCHER_CLASS.to_string()),
            ("Start-Class", main_class.to_string()),
            ("Spring-Boot-Classes", format!("{}/", CLASSES_PREFIX)),
            ("Spring-Boot-Classpath-Index", CLASSPATH_INDEX_ENTRY.to_string()),
            ("Implementation-Title", ctx.meta.name.clone()),
            ("Implementation-Version", ctx.meta.version.clone()),
            ("Build-Jdk-Spec", ctx.meta.runtime_version.to_string()),
        ];

        let mut manifest = String::new();
        for (key, value) in lines {
            manifest.push_str(&format!("{}: {}\r\n", key, value));
        }
        manifest.push_str("\r\n");
        manifest
    }

    fn classpath_index(ctx: &StageContext<'_>) -> String {
        ctx.classpath(&Classpath::Runtime)
            .unwrap_or_default()
            .iter()
            .map(|c| format!("- \"{}\"\n", c))
            .collect()
    }

    /// Every archive entry by name, sorted
    fn collect_entries(
        &self,
        ctx: &StageContext<'_>,
        main_class: &str,
    ) -> Result<Vec<(String, EntrySource)>, StageError> {
        let mut entries = vec![
            (
                MANIFEST_ENTRY.to_string(),
                EntrySource::Bytes(self.manifest(ctx, main_class).into_bytes()),
            ),
            (
                CLASSPATH_INDEX_ENTRY.to_string(),
                EntrySource::Bytes(Self::classpath_index(ctx).into_bytes()),
            ),
        ];

        for (artifact, prefix) in [
            (&self.classes, CLASSES_PREFIX),
            (&self.docs, self.docs_path.as_str()),
        ] {
            let root = ctx.input(artifact)?;
            let files = walk_files(root)
                .map_err(|e| StageError::io(format!("Failed to scan {}", root.display()), e))?;
            for rel in files {
                let name = join_entry(prefix, &to_entry_name(&rel));
                entries.push((name, EntrySource::File(root.join(rel))));
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for pair in entries.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(StageError::Packaging(format!("duplicate archive entry '{}'", pair[0].0)));
            }
        }
        Ok(entries)
    }
}

impl StageAction for BootArchiveStage {
    fn kind(&self) -> &'static str {
        "boot-archive"
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<(), StageError> {
        let main_class = ctx.meta.main_class.as_deref().ok_or_else(|| {
            StageError::Packaging("project.main_class is required for a runnable archive".to_string())
        })?;

        let entries = self.collect_entries(ctx, main_class)?;

        let mut dirs = BTreeSet::new();
        if !self.docs_path.is_empty() {
            dirs.insert(format!("{}/", self.docs_path));
        }
        for (name, _) in &entries {
            let mut parent = Path::new(name).parent();
            while let Some(dir) = parent.filter(|p| !p.as_os_str().is_empty()) {
                dirs.insert(format!("{}/", to_entry_name(dir)));
                parent = dir.parent();
            }
        }

        let out = ctx.output(&self.output)?;
        let target = out.join(self.file_name(ctx));
        let partial = target.with_extension("jar.part");

        write_archive(&partial, &dirs, &entries).map_err(|e| {
            let _ = fs::remove_file(&partial);
            e
        })?;
        fs::rename(&partial, &target)
            .map_err(|e| StageError::io(format!("Failed to move archive to {}", target.display()), e))?;

        info!(
            task = %ctx.task,
            archive = %target.display(),
            entries = entries.len(),
            "Packaged archive"
        );
        Ok(())
    }
}

/// The plain (non-runnable) archive. It is never produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainArchiveStage;

impl StageAction for PlainArchiveStage {
    fn kind(&self) -> &'static str {
        "plain-archive"
    }

    fn run(&self, _ctx: &StageContext<'_>) -> Result<(), StageError> {
        Err(StageError::Packaging(
            "the plain archive is disabled for this project".to_string(),
        ))
    }
}

fn join_entry(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

fn write_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    source: &EntrySource,
    options: SimpleFileOptions,
) -> Result<(), StageError> {
    zip.start_file(name, options)
        .map_err(|e| StageError::Packaging(format!("failed to add '{}': {}", name, e)))?;

    let bytes = match source {
        EntrySource::Bytes(bytes) => bytes.clone(),
        EntrySource::File(src) => fs::read(src)
            .map_err(|e| StageError::io(format!("Failed to read {}", src.display()), e))?,
    };
    zip.write_all(&bytes)
        .map_err(|e| StageError::io(format!("Failed to write entry '{}'", name), e))?;
    debug!(entry = %name, "Added archive entry");
    Ok(())
}

fn write_archive(
    path: &Path,
    dirs: &BTreeSet<String>,
    entries: &[(String, EntrySource)],
) -> Result<(), StageError> {
    let io_err = |e: std::io::Error| StageError::io(format!("Failed to write {}", path.display()), e);
    let zip_err = |e: zip::result::ZipError| {
        StageError::Packaging(format!("failed to write {}: {}", path.display(), e))
    };

    let file = File::create(path).map_err(io_err)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let base = SimpleFileOptions::default().last_modified_time(DateTime::default());
    let dir_options = base
        .compression_method(CompressionMethod::Stored)
        .unix_permissions(DIR_MODE);
    let file_options = base
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(FILE_MODE);

    // Manifest first so launchers find it without scanning the whole archive
    zip.add_directory("META-INF/", dir_options).map_err(zip_err)?;
    for (name, source) in entries.iter().filter(|(name, _)| name == MANIFEST_ENTRY) {
        write_entry(&mut zip, name, source, file_options)?;
    }

    for dir in dirs.iter().filter(|d| d.as_str() != "META-INF/") {
        zip.add_directory(dir.as_str(), dir_options).map_err(zip_err)?;
    }

    for (name, source) in entries.iter().filter(|(name, _)| name != MANIFEST_ENTRY) {
        write_entry(&mut zip, name, source, file_options)?;
    }

    let mut writer = zip.finish().map_err(zip_err)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
