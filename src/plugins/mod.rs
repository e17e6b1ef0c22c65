// src/plugins/mod.rs

//! # Built-in Plugins
//!
//! Everything `pri` does beyond the extension mechanism itself is a plugin:
//! the scaffolding, page analysis and every command. They go through the same
//! [`PluginContext`](crate::core::plugin::PluginContext) as third-party plugins.

pub mod analyse_pages;
pub mod command_build;
pub mod command_dev;
pub mod command_plugin;
pub mod ensure_project_files;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::commands::Invocation;
use crate::core::lifecycle::AnalyseInfo;
use crate::core::plugin::PluginCatalog;
use crate::models::Env;
use crate::project::content_hash::content_hash;
use crate::project::files::{EnsureReport, EnsureStatus};

/// The catalog the binary starts with, in default load order.
pub fn builtin_catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(Arc::new(ensure_project_files::EnsureProjectFilesPlugin))
        .with(Arc::new(analyse_pages::AnalysePagesPlugin))
        .with(Arc::new(command_dev::CommandDevPlugin))
        .with(Arc::new(command_build::CommandBuildPlugin))
        .with(Arc::new(command_test::CommandTestPlugin))
        .with(Arc::new(command_plugin::CommandPluginPlugin))
}

/// Prints one line per file that was written.
pub(crate) fn print_ensure_reports(reports: &[EnsureReport]) {
    for report in reports {
        match report.status {
            EnsureStatus::Created => {
                println!("{} {}", "✔".green(), format_args!(t!("ensure.created"), file = report.file_name))
            }
            EnsureStatus::Updated => {
                println!("{} {}", "✔".green(), format_args!(t!("ensure.updated"), file = report.file_name))
            }
            EnsureStatus::Unchanged => {}
        }
    }
}

/// What every bundler-driven command needs before it starts the bundler.
#[derive(Debug)]
pub(crate) struct Prepared {
    pub analyse_info: AnalyseInfo,
    pub entry_path: PathBuf,
    pub hash: String,
}

/// Ensures project files, analyses the project, writes the entry and hashes
/// the sources, in that order.
pub(crate) fn prepare(invocation: &Invocation, env: Env) -> anyhow::Result<Prepared> {
    let project = &invocation.project;
    let host = &invocation.host;

    print_ensure_reports(&host.ensure_project_files(project)?);
    let analyse_info = host.analyse_project(project, env)?;
    let entry_path = host.create_entry(project, env, &analyse_info)?;
    let hash = content_hash(project.root(), &project.scan(env)?)?;

    Ok(Prepared {
        analyse_info,
        entry_path,
        hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_PLUGINS;

    #[test]
    fn test_builtin_catalog_matches_default_plugin_order() {
        assert_eq!(builtin_catalog().ids(), DEFAULT_PLUGINS);
    }
}
