// src/project/mod.rs

//! # Project
//!
//! The project a run operates on: its root directory and its configuration,
//! resolved once per environment when the run starts. Everything else in this
//! module is host-side glue that commands use: scanning, ensured files, the
//! white-file check, the generated entry, static HTML and the bundler.

pub mod builder;
pub mod check;
pub mod config;
pub mod content_hash;
pub mod entry;
pub mod files;
pub mod html;
pub mod scanner;
pub mod structure;

use std::path::{Path, PathBuf};

use crate::models::{Env, FileRecord, ProjectConfig};
use config::ConfigError;
use scanner::{ScanError, Scanner};

#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    local: ProjectConfig,
    prod: ProjectConfig,
}

impl Project {
    /// Loads both environment configurations of the project at `root`.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        let local = config::load_config(&root, Env::Local)?;
        let prod = config::load_config(&root, Env::Prod)?;
        Ok(Self { root, local, prod })
    }

    pub fn from_parts(root: PathBuf, local: ProjectConfig, prod: ProjectConfig) -> Self {
        Self { root, local, prod }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self, env: Env) -> &ProjectConfig {
        match env {
            Env::Local => &self.local,
            Env::Prod => &self.prod,
        }
    }

    /// Plugin identifiers to load, taken from the local configuration.
    pub fn plugin_ids(&self) -> &[String] {
        &self.local.plugins
    }

    /// A scanner that skips the paths git ignores under the `env` configuration,
    /// including that environment's `dist_dir`.
    pub fn scanner(&self, env: Env) -> Scanner {
        Scanner::new(&self.root, structure::gitignores(self.config(env)))
    }

    pub fn scan(&self, env: Env) -> Result<Vec<FileRecord>, ScanError> {
        self.scanner(env).scan()
    }
}
