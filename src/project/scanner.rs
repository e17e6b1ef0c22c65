// src/project/scanner.rs

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::models::FileRecord;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to scan project directory '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Walks a project tree, skipping `.git` and the ignored root-relative paths.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    ignores: Vec<String>,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, ignores: Vec<String>) -> Self {
        Self {
            root: root.into(),
            ignores,
        }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if relative == ".git" || relative.starts_with(".git/") {
            return true;
        }
        self.ignores.iter().any(|ignore| {
            relative == *ignore
                || relative
                    .strip_prefix(ignore.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Every regular file under the root, sorted by path. Each call walks the
    /// tree again.
    pub fn scan(&self) -> Result<Vec<FileRecord>, ScanError> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry.path()));

        for entry in walker {
            let entry = entry.map_err(|source| ScanError::Walk {
                path: self.root.clone(),
                source,
            })?;
            if entry.file_type().is_file() {
                files.push(FileRecord::from_path(entry.path()));
            }
        }

        files.sort_by_key(FileRecord::path);
        log::debug!("Scanned {} file(s) under '{}'", files.len(), self.root.display());
        Ok(files)
    }
}
