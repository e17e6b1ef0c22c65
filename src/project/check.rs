// src/project/check.rs

//! White file rules: the project check fails when a scanned file matches none
//! of them.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::constants::{CONFIG_DIR, IGNORE_SCAN_SOURCES, SRC_DIR, TEMP_DIR};
use crate::models::FileRecord;

type Matcher = dyn Fn(&str) -> bool + Send + Sync;

/// Accepts project files by their root-relative, `/`-separated path.
#[derive(Clone)]
pub struct WhiteFileRule {
    name: String,
    matcher: Arc<Matcher>,
}

impl WhiteFileRule {
    pub fn new<F>(name: impl Into<String>, matcher: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher: Arc::new(matcher),
        }
    }

    /// Accepts everything below `dir`.
    pub fn under_dir(dir: &str) -> Self {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Self::new(prefix.clone(), move |relative| relative.starts_with(&prefix))
    }

    /// Accepts exactly one root-level file.
    pub fn root_file(file_name: &str) -> Self {
        let file_name = file_name.to_string();
        Self::new(file_name.clone(), move |relative| relative == file_name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, relative: &str) -> bool {
        (self.matcher)(relative)
    }
}

impl fmt::Debug for WhiteFileRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WhiteFileRule").field(&self.name).finish()
    }
}

/// Rules every project gets: sources, configuration, generated files, and
/// the root-level tool files.
pub fn default_rules() -> Vec<WhiteFileRule> {
    let mut rules = vec![
        WhiteFileRule::under_dir(SRC_DIR),
        WhiteFileRule::under_dir(CONFIG_DIR),
        WhiteFileRule::under_dir(TEMP_DIR),
    ];
    rules.extend(IGNORE_SCAN_SOURCES.iter().map(|name| WhiteFileRule::root_file(name)));
    rules
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Unexpected files found in the project:\n{}", .files.join("\n"))]
    UnexpectedFiles { files: Vec<String> },
}

/// Fails with every file no rule accepts, in scan order.
pub fn check_project_files(
    root: &Path,
    files: &[FileRecord],
    rules: &[&WhiteFileRule],
) -> Result<(), CheckError> {
    let unexpected: Vec<String> = files
        .iter()
        .filter_map(|file| file.relative_to(root))
        .filter(|relative| !rules.iter().any(|rule| rule.matches(relative)))
        .collect();

    if unexpected.is_empty() {
        Ok(())
    } else {
        log::debug!("{} file(s) matched no white file rule", unexpected.len());
        Err(CheckError::UnexpectedFiles { files: unexpected })
    }
}
