// src/project/content_hash.rs

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::models::FileRecord;

const HASH_TRUNCATE_LENGTH: usize = 16; // 16 bytes = 32 hex characters

/// Hashes the given files by root-relative path and content.
///
/// Files are visited in path order, so the result does not depend on scan
/// order. Files outside `root` are skipped.
///
/// # Errors
/// Returns an I/O error if a file cannot be read.
pub fn content_hash(root: &Path, files: &[FileRecord]) -> Result<String> {
    let mut entries: Vec<(String, std::path::PathBuf)> = files
        .iter()
        .filter_map(|file| file.relative_to(root).map(|rel| (rel, file.path())))
        .collect();
    entries.sort();

    let mut hasher = blake3::Hasher::new();
    for (relative, path) in &entries {
        let content = fs::read(path)
            .with_context(|| format!("Failed to read content of file '{}'", path.display()))?;
        hasher.update(relative.as_bytes());
        hasher.update(&[0]);
        hasher.update(&(content.len() as u64).to_le_bytes());
        hasher.update(&content);
    }

    let hash = hasher.finalize();
    let hex_hash = hex::encode(&hash.as_bytes()[..HASH_TRUNCATE_LENGTH]);
    log::debug!("Content hash over {} file(s): {}", entries.len(), hex_hash);
    Ok(hex_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, content: &str) -> FileRecord {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        FileRecord::from_path(&path)
    }

    #[test]
    fn test_hash_is_order_independent_and_truncated() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "src/a.tsx", "a");
        let b = write(dir.path(), "src/b.tsx", "b");

        let forward = content_hash(dir.path(), &[a.clone(), b.clone()]).unwrap();
        let backward = content_hash(dir.path(), &[b, a]).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 32);
    }

    #[test]
    fn test_hash_changes_with_content_and_names() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "src/a.tsx", "one");
        let before = content_hash(dir.path(), &[a.clone()]).unwrap();

        write(dir.path(), "src/a.tsx", "two");
        let after = content_hash(dir.path(), &[a]).unwrap();
        assert_ne!(before, after);

        let renamed = write(dir.path(), "src/c.tsx", "two");
        assert_ne!(after, content_hash(dir.path(), &[renamed]).unwrap());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let ghost = FileRecord::from_path(&dir.path().join("ghost.ts"));
        assert!(content_hash(dir.path(), &[ghost]).is_err());
    }
}
