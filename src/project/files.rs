// src/project/files.rs

//! # Ensured Project Files
//!
//! Plugins register [`ProjectFile`]s: a root-relative file name plus a pipe
//! that maps the current content (empty when the file is missing) to the
//! wanted content. Pipes registered for the same file run in registration
//! order, each one seeing the previous pipe's output. A file is only written
//! when the final content differs from what is on disk.

use serde_json::Value;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Maps the previous content of a file to its new content.
pub type Pipe = Arc<dyn Fn(&str) -> anyhow::Result<String> + Send + Sync>;

#[derive(Clone)]
pub struct ProjectFile {
    /// Path relative to the project root, `/`-separated.
    pub file_name: String,
    pub pipe: Pipe,
}

impl ProjectFile {
    pub fn new<F>(file_name: impl Into<String>, pipe: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            file_name: file_name.into(),
            pipe: Arc::new(pipe),
        }
    }

    /// A file whose content is always `content`, whatever was there before.
    pub fn fixed(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self::new(file_name, move |_| Ok(content.clone()))
    }

    /// A JSON file whose content is always `value`, pretty-printed.
    pub fn json(file_name: impl Into<String>, value: Value) -> Self {
        Self::new(file_name, move |_| to_pretty_json(&value))
    }

    /// A JSON file deep-merged with `patch`. A missing or empty file counts as `{}`.
    pub fn merged_json(file_name: impl Into<String>, patch: Value) -> Self {
        Self::new(file_name, move |prev| json_merge_pipe(prev, &patch))
    }
}

impl fmt::Debug for ProjectFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectFile")
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureStatus {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureReport {
    pub file_name: String,
    pub status: EnsureStatus,
}

#[derive(Error, Debug)]
pub enum EnsureError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to compute the content of '{file_name}': {source}")]
    Pipe {
        file_name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ensures every registered file, grouping pipes by file name. Files are
/// processed in the order their name first appeared.
pub fn ensure_files(root: &Path, files: &[ProjectFile]) -> Result<Vec<EnsureReport>, EnsureError> {
    let mut order: Vec<&str> = Vec::new();
    for file in files {
        if !order.contains(&file.file_name.as_str()) {
            order.push(&file.file_name);
        }
    }

    order
        .into_iter()
        .map(|name| {
            let pipes: Vec<&Pipe> = files
                .iter()
                .filter(|f| f.file_name == name)
                .map(|f| &f.pipe)
                .collect();
            ensure_file(root, name, &pipes)
        })
        .collect()
}

/// Runs `pipes` over the current content of `file_name` and writes the
/// result if it changed.
pub fn ensure_file(root: &Path, file_name: &str, pipes: &[&Pipe]) -> Result<EnsureReport, EnsureError> {
    let path = root.join(file_name);
    let previous = match fs::read_to_string(&path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(source) => return Err(EnsureError::Read { path, source }),
    };

    let mut content = previous.clone().unwrap_or_default();
    for pipe in pipes {
        content = pipe(&content).map_err(|source| EnsureError::Pipe {
            file_name: file_name.to_string(),
            source,
        })?;
    }

    let status = match &previous {
        Some(prev) if *prev == content => EnsureStatus::Unchanged,
        Some(_) => EnsureStatus::Updated,
        None => EnsureStatus::Created,
    };
    if status != EnsureStatus::Unchanged {
        write_atomic(&path, &content).map_err(|source| EnsureError::Write {
            path: path.clone(),
            source,
        })?;
    }
    log::debug!("Ensured '{}': {:?}", file_name, status);

    Ok(EnsureReport {
        file_name: file_name.to_string(),
        status,
    })
}

/// Writes through a temporary sibling file, so readers never see a partial file.
pub fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// --- JSON HELPERS ---

pub fn to_pretty_json(value: &Value) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

/// Recursively merges `patch` into `base`. Objects merge key by key; any other
/// patch value replaces the base value.
pub fn merge_json(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(key) {
                    Some(base_value) => merge_json(base_value, patch_value),
                    None => {
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

fn json_merge_pipe(previous: &str, patch: &Value) -> anyhow::Result<String> {
    let mut value = if previous.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(previous)?
    };
    merge_json(&mut value, patch);
    to_pretty_json(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_creates_then_leaves_unchanged() {
        let dir = tempdir().unwrap();
        let files = vec![ProjectFile::fixed(".vscode/settings.json", "{}\n")];

        let first = ensure_files(dir.path(), &files).unwrap();
        assert_eq!(first[0].status, EnsureStatus::Created);
        assert_eq!(
            fs::read_to_string(dir.path().join(".vscode/settings.json")).unwrap(),
            "{}\n"
        );

        let second = ensure_files(dir.path(), &files).unwrap();
        assert_eq!(second[0].status, EnsureStatus::Unchanged);
    }

    #[test]
    fn test_pipes_for_one_file_chain_in_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "a").unwrap();
        let files = vec![
            ProjectFile::new("notes.txt", |prev| Ok(format!("{}b", prev))),
            ProjectFile::fixed("other.txt", "x"),
            ProjectFile::new("notes.txt", |prev| Ok(format!("{}c", prev))),
        ];

        let reports = ensure_files(dir.path(), &files).unwrap();
        let names: Vec<&str> = reports.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["notes.txt", "other.txt"]);
        assert_eq!(reports[0].status, EnsureStatus::Updated);
        assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "abc");
    }

    #[test]
    fn test_merged_json_keeps_existing_keys() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{ "name": "app", "scripts": { "lint": "tslint" } }"#,
        )
        .unwrap();
        let files = vec![ProjectFile::merged_json(
            "package.json",
            json!({ "scripts": { "build": "pri build" } }),
        )];

        ensure_files(dir.path(), &files).unwrap();
        let written: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({ "name": "app", "scripts": { "lint": "tslint", "build": "pri build" } })
        );
    }

    #[test]
    fn test_failing_pipe_reports_the_file() {
        let dir = tempdir().unwrap();
        let files = vec![ProjectFile::new("broken.json", |_| Err(anyhow!("bad template")))];
        let err = ensure_files(dir.path(), &files).unwrap_err();
        assert!(matches!(err, EnsureError::Pipe { ref file_name, .. } if file_name == "broken.json"));
        assert!(!dir.path().join("broken.json").exists());
    }

    #[test]
    fn test_merge_json_replaces_non_objects() {
        let mut base = json!({ "a": [1, 2], "b": { "c": 1 } });
        merge_json(&mut base, &json!({ "a": [3], "b": { "d": 2 } }));
        assert_eq!(base, json!({ "a": [3], "b": { "c": 1, "d": 2 } }));
    }
}
