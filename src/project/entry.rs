// src/project/entry.rs

use std::path::{Path, PathBuf};

use super::files::write_atomic;
use crate::constants::{ENTRY_FILENAME, TEMP_DIR};
use crate::core::lifecycle::EntryFragments;

/// One plugin's contribution to the generated entry file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFragment {
    /// Imports and declarations, placed at the top of the file.
    pub header: String,
    /// Statements placed after every header.
    pub body: String,
}

impl EntryFragment {
    pub fn new(header: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            body: body.into(),
        }
    }

    pub fn header(header: impl Into<String>) -> Self {
        Self::new(header, String::new())
    }

    pub fn body(body: impl Into<String>) -> Self {
        Self::new(String::new(), body)
    }
}

/// Renders every header, then every body, in contribution order.
pub fn render_entry(fragments: &EntryFragments) -> String {
    let headers: Vec<&str> = fragments
        .values()
        .map(|f| f.header.trim())
        .filter(|h| !h.is_empty())
        .collect();
    let bodies: Vec<&str> = fragments
        .values()
        .map(|f| f.body.trim())
        .filter(|b| !b.is_empty())
        .collect();

    let mut out = headers.join("\n");
    if !out.is_empty() && !bodies.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(&bodies.join("\n\n"));
    out.push('\n');
    out
}

pub fn entry_path(root: &Path) -> PathBuf {
    root.join(TEMP_DIR).join(ENTRY_FILENAME)
}

/// Writes `.temp/entry.tsx` and returns its path.
pub fn write_entry(root: &Path, fragments: &EntryFragments) -> std::io::Result<PathBuf> {
    let path = entry_path(root);
    write_atomic(&path, &render_entry(fragments))?;
    log::debug!("Entry written to '{}'", path.display());
    Ok(path)
}
