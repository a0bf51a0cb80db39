use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;
use std::path::Path;

use crate::github::LocalFile;

/// Read a local folder for upload.
///
/// Paths start with the folder's own name, like a browser folder pick.
/// `.gitignore`d files are left out unless `include_ignored` is set; the
/// `.git` directory is always skipped.
pub fn read_local_folder(dir: &Path, include_ignored: bool) -> Result<Vec<LocalFile>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let root_name = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", dir.display()))?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut walker = WalkBuilder::new(dir);
    walker
        .standard_filters(!include_ignored)
        .hidden(false)
        .parents(false)
        .require_git(false)
        .filter_entry(|entry| entry.file_name() != ".git");

    let mut files = Vec::new();
    for result in walker.build() {
        let entry = result?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let relative_path = if root_name.is_empty() {
            relative
        } else {
            format!("{}/{}", root_name, relative)
        };

        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        files.push(LocalFile {
            relative_path,
            bytes,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, text: &str) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, text).unwrap();
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("site");
        write(&site, "index.html", "<p>hi</p>");
        write(&site, "css/main.css", "body {}");
        write(&site, ".gitignore", "secret.txt\n");
        write(&site, "secret.txt", "token");
        write(&site, ".git/config", "[core]");
        dir
    }

    fn paths(files: &[LocalFile]) -> Vec<String> {
        files.iter().map(|f| f.relative_path.clone()).collect()
    }

    #[test]
    fn test_respects_gitignore() {
        let dir = tree();
        let files = read_local_folder(&dir.path().join("site"), false).unwrap();
        assert_eq!(
            paths(&files),
            vec!["site/.gitignore", "site/css/main.css", "site/index.html"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
        assert_eq!(files[2].bytes, b"<p>hi</p>".to_vec());
    }

    #[test]
    fn test_include_ignored_still_skips_git_dir() {
        let dir = tree();
        let files = read_local_folder(&dir.path().join("site"), true).unwrap();
        let paths = paths(&files);
        assert!(paths.contains(&"site/secret.txt".to_string()));
        assert!(!paths.iter().any(|p| p.contains(".git/")));
    }

    #[test]
    fn test_missing_folder() {
        let dir = TempDir::new().unwrap();
        assert!(read_local_folder(&dir.path().join("nope"), false).is_err());
    }
}
