// src/state.rs

//! The two phases of a run.
//!
//! [`Registry`] is open while plugins load and is only reachable through
//! `&mut`. [`Registry::seal`] consumes it and yields a [`SealedRegistry`]:
//! the resolved command table plus a [`Host`] holding the lifecycle hooks and
//! project file registrations. Nothing in the sealed phase can register.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::commands::{CommandRegistry, CommandTable, Invocation};
use crate::core::dispatcher::Dispatcher;
use crate::core::lifecycle::{AnalyseInfo, EntryContext, EntryFragments, HookRegistry};
use crate::models::Env;
use crate::project::Project;
use crate::project::check::{self, WhiteFileRule};
use crate::project::entry;
use crate::project::files::{self, EnsureError, EnsureReport, ProjectFile};

/// Registration-phase state shared by every plugin initializer.
#[derive(Debug, Default)]
pub struct Registry {
    commands: CommandRegistry,
    hooks: HookRegistry,
    project_files: Vec<ProjectFile>,
    white_rules: Vec<WhiteFileRule>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    pub fn add_project_file(&mut self, file: ProjectFile) {
        self.project_files.push(file);
    }

    pub fn add_white_file_rule(&mut self, rule: WhiteFileRule) {
        self.white_rules.push(rule);
    }

    /// Ends the registration phase and resolves every command chain.
    pub fn seal(self) -> SealedRegistry {
        let commands = self.commands.resolve();
        log::debug!(
            "Registry sealed: {} command(s), {} hook(s), {} project file(s)",
            commands.len(),
            self.hooks.len(),
            self.project_files.len()
        );
        SealedRegistry {
            commands,
            host: Arc::new(Host {
                hooks: self.hooks,
                project_files: self.project_files,
                white_rules: self.white_rules,
            }),
        }
    }
}

/// Execution-phase state. Read-only.
#[derive(Debug)]
pub struct SealedRegistry {
    pub commands: CommandTable,
    pub host: Arc<Host>,
}

impl SealedRegistry {
    /// A fresh dispatcher over the command table.
    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.commands)
    }

    /// An invocation with no options or arguments yet.
    pub fn invocation(&self, project: Arc<Project>) -> Invocation {
        Invocation::new(project, self.host.clone())
    }
}

/// Services the host offers to running commands.
#[derive(Debug, Default)]
pub struct Host {
    hooks: HookRegistry,
    project_files: Vec<ProjectFile>,
    white_rules: Vec<WhiteFileRule>,
}

impl Host {
    /// Scans the project and runs the `onAnalyseProject` hooks over the result.
    pub fn analyse_project(&self, project: &Project, env: Env) -> anyhow::Result<AnalyseInfo> {
        let files = project.scan(env)?;
        log::debug!("Analysing {} project file(s)", files.len());
        Ok(self.hooks.emit_analyse_project(AnalyseInfo::new(), &files)?)
    }

    /// Runs the `onCreateEntry` hooks and writes `.temp/entry.tsx`.
    pub fn create_entry(
        &self,
        project: &Project,
        env: Env,
        analyse_info: &AnalyseInfo,
    ) -> anyhow::Result<PathBuf> {
        let context = EntryContext {
            analyse_info: analyse_info.clone(),
            env,
            config: project.config(env).clone(),
        };
        let fragments = self
            .hooks
            .emit_create_entry(EntryFragments::new(), &context)?;
        Ok(entry::write_entry(project.root(), &fragments)?)
    }

    /// Writes every registered project file whose content changed.
    pub fn ensure_project_files(&self, project: &Project) -> Result<Vec<EnsureReport>, EnsureError> {
        files::ensure_files(project.root(), &self.project_files)
    }

    /// Fails when the project holds files no white file rule accepts. Output
    /// of the `env` build is skipped.
    pub fn check_project_files(&self, project: &Project, env: Env) -> anyhow::Result<()> {
        let files = project.scan(env)?;
        let defaults = check::default_rules();
        let rules: Vec<&WhiteFileRule> = defaults.iter().chain(self.white_rules.iter()).collect();
        check::check_project_files(project.root(), &files, &rules)?;
        Ok(())
    }
}
