//! Filesystem helpers shared by the stages and the executor

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Lists every regular file under `root` as a path relative to `root`,
/// sorted so callers see the same order on every platform and run.
/// A missing root yields an empty list.
pub fn walk_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if root.is_dir() {
        walk_into(root, Path::new(""), &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn walk_into(root: &Path, rel: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(root.join(rel))? {
        let entry = entry?;
        let rel_path = rel.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_into(root, &rel_path, files)?;
        } else if file_type.is_file() {
            files.push(rel_path);
        }
    }
    Ok(())
}

/// Copies every file under `src` into `dst`, creating directories as needed
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<usize> {
    let files = walk_files(src)?;
    for rel in &files {
        let target = dst.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src.join(rel), &target)?;
    }
    Ok(files.len())
}

/// Removes a file or directory tree; missing paths are fine
pub fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Converts a relative path to a forward-slash string for archive entries
pub fn to_entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn walk_is_sorted_and_relative() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("b/c/z.txt"), "z").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let files = walk_files(dir.path()).unwrap();
        assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b/c/z.txt")]);
    }

    #[test]
    fn walk_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(walk_files(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn copy_tree_recreates_layout() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("com/example")).unwrap();
        fs::write(src.path().join("com/example/App.java"), "class App {}").unwrap();

        let copied = copy_tree(src.path(), dst.path()).unwrap();

        assert_eq!(copied, 1);
        assert_eq!(
            fs::read_to_string(dst.path().join("com/example/App.java")).unwrap(),
            "class App {}"
        );
    }

    #[test]
    fn remove_path_handles_missing() {
        let dir = TempDir::new().unwrap();
        remove_path(&dir.path().join("missing")).unwrap();

        fs::create_dir_all(dir.path().join("tree/inner")).unwrap();
        remove_path(&dir.path().join("tree")).unwrap();
        assert!(!dir.path().join("tree").exists());
    }

    #[test]
    fn entry_names_use_forward_slashes() {
        let rel = Path::new("com").join("example").join("App.class");
        assert_eq!(to_entry_name(&rel), "com/example/App.class");
    }
}
