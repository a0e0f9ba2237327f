use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::DEFAULT_IGNORED_DIRS;
use crate::error::{AibomError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated.
    pub relative: String,
}

pub struct FileScanner {
    ignored_dirs: HashSet<String>,
}

impl FileScanner {
    pub fn new() -> Self {
        Self::with_ignored(DEFAULT_IGNORED_DIRS.iter().map(|d| d.to_string()))
    }

    pub fn with_ignored(dirs: impl IntoIterator<Item = String>) -> Self {
        Self {
            ignored_dirs: dirs.into_iter().collect(),
        }
    }

    /// Python sources under `root_path`, sorted by relative path.
    pub fn scan_directory(&self, root_path: &Path) -> Result<Vec<FileInfo>> {
        if !root_path.is_dir() {
            return Err(AibomError::io(
                root_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "scan root is not a directory"),
            ));
        }

        // Collect all entries first for parallel processing
        let entries: Vec<DirEntry> = WalkDir::new(root_path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_ignored(entry))
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .collect();

        let mut files: Vec<FileInfo> = entries
            .par_iter()
            .filter_map(|entry| {
                let path = entry.path();
                if !is_python_source(path) {
                    return None;
                }
                let relative = path.strip_prefix(root_path).ok()?;
                Some(FileInfo {
                    path: path.to_path_buf(),
                    relative: relative_string(relative),
                })
            })
            .collect();

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(files)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.ignored_dirs.contains(name))
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_python_source(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("py" | "pyi" | "pyw")
    )
}

fn relative_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
