// src/core/commands.rs

//! # Command Registry
//!
//! Plugins contribute two kinds of entries:
//!
//! - **Primary commands** (`register_command`): a name, an action, and the
//!   options shown in the help text.
//! - **Expansions** (`expand_command`): before/after steps wrapping a primary
//!   command by name. The target may be registered later, by a plugin loaded
//!   after the one expanding it.
//!
//! Entries are kept in one ordered sequence. [`CommandRegistry::resolve`] runs
//! once, when the registry is sealed, and turns that sequence into a
//! [`CommandTable`] holding the final `[befores.., primary, afters..]` chain of
//! every command.

use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use super::options::{OptionSpec, OptionSpecError, ParsedOptions};
use crate::project::Project;
use crate::state::Host;

/// An async step of a command chain.
pub type Action = Arc<dyn Fn(Invocation) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wraps an async closure into an [`Action`].
pub fn action<F, Fut>(f: F) -> Action
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |invocation| f(invocation).boxed())
}

/// Everything a running step gets to see: the parsed command line, the
/// project, and the host services of the sealed registry.
#[derive(Clone)]
pub struct Invocation {
    /// The resolved command name (the default command's name when none was given).
    pub command: String,
    pub options: ParsedOptions,
    /// Positional arguments following the command.
    pub args: Vec<String>,
    pub project: Arc<Project>,
    pub host: Arc<Host>,
}

impl Invocation {
    pub fn new(project: Arc<Project>, host: Arc<Host>) -> Self {
        Self {
            command: String::new(),
            options: ParsedOptions::default(),
            args: Vec::new(),
            project,
            host,
        }
    }

    pub fn with_options(mut self, options: ParsedOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command", &self.command)
            .field("options", &self.options)
            .field("args", &self.args)
            .field("project", &self.project.root())
            .finish()
    }
}

// --- DESCRIPTORS ---

/// A declared `(flag, description)` pair, as written by the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOption {
    pub flag: String,
    pub description: String,
}

/// A primary command contributed by a plugin.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub action: Action,
    pub is_default: bool,
    /// Declaration order is help-text order.
    pub options: Vec<CommandOption>,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            description: None,
            action,
            is_default: false,
            options: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn option(mut self, flag: impl Into<String>, description: impl Into<String>) -> Self {
        self.options.push(CommandOption {
            flag: flag.into(),
            description: description.into(),
        });
        self
    }

    /// Marks this command as the one run when no command name is given.
    pub fn default_command(mut self) -> Self {
        self.is_default = true;
        self
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("is_default", &self.is_default)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Before/after steps wrapping a primary command.
#[derive(Clone)]
pub struct CommandExpansion {
    pub name: String,
    pub before_action: Option<Action>,
    pub after_action: Option<Action>,
}

impl CommandExpansion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before_action: None,
            after_action: None,
        }
    }

    pub fn before(mut self, action: Action) -> Self {
        self.before_action = Some(action);
        self
    }

    pub fn after(mut self, action: Action) -> Self {
        self.after_action = Some(action);
        self
    }
}

impl fmt::Debug for CommandExpansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExpansion")
            .field("name", &self.name)
            .field("before_action", &self.before_action.is_some())
            .field("after_action", &self.after_action.is_some())
            .finish()
    }
}

// --- ERRORS ---

/// Errors raised while plugins register commands. Any of them makes the command
/// set ambiguous, so they abort plugin loading.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Command '{name}' is already registered by plugin '{owner}'.")]
    DuplicateCommand { name: String, owner: String },
    #[error("Command '{name}' cannot be the default command: '{existing}' already is.")]
    DuplicateDefault { name: String, existing: String },
    #[error("'{name}' is not a valid command name.")]
    InvalidName { name: String },
    #[error("Command '{command}' declares an invalid option: {source}")]
    InvalidOption {
        command: String,
        #[source]
        source: OptionSpecError,
    },
    #[error("Command '{command}' declares option '--{long}' more than once.")]
    DuplicateOption { command: String, long: String },
}

// --- REGISTRY (open phase) ---

/// A single step of a chain, tagged with the plugin that contributed it.
#[derive(Clone)]
pub(crate) struct Step {
    pub(crate) plugin: String,
    pub(crate) action: Action,
}

enum Registration {
    Primary {
        descriptor: CommandDescriptor,
        options: Vec<(OptionSpec, CommandOption)>,
        plugin: String,
    },
    Expansion {
        expansion: CommandExpansion,
        plugin: String,
    },
}

/// The ordered record of everything plugins registered.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<Registration>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a primary command owned by `plugin`.
    ///
    /// # Errors
    /// Fails without touching the registry if the name is taken, if a second
    /// default command is declared, or if an option spec is invalid.
    pub fn register_command(
        &mut self,
        plugin: &str,
        descriptor: CommandDescriptor,
    ) -> Result<(), RegistryError> {
        let name = descriptor.name.as_str();
        if name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace) {
            return Err(RegistryError::InvalidName {
                name: descriptor.name.clone(),
            });
        }

        if let Some(owner) = self.primary_owner(&descriptor.name) {
            return Err(RegistryError::DuplicateCommand {
                name: descriptor.name.clone(),
                owner: owner.to_string(),
            });
        }

        if descriptor.is_default {
            if let Some(existing) = self.default_name() {
                return Err(RegistryError::DuplicateDefault {
                    name: descriptor.name.clone(),
                    existing: existing.to_string(),
                });
            }
        }

        let options = Self::parse_options(&descriptor)?;

        log::debug!(
            "Plugin '{}' registered command '{}'{}",
            plugin,
            descriptor.name,
            if descriptor.is_default { " (default)" } else { "" }
        );
        self.entries.push(Registration::Primary {
            descriptor,
            options,
            plugin: plugin.to_string(),
        });
        Ok(())
    }

    /// Adds before/after steps for `expansion.name`. The target does not need
    /// to exist yet.
    pub fn expand_command(&mut self, plugin: &str, expansion: CommandExpansion) {
        log::debug!(
            "Plugin '{}' expanded command '{}' (before: {}, after: {})",
            plugin,
            expansion.name,
            expansion.before_action.is_some(),
            expansion.after_action.is_some()
        );
        self.entries.push(Registration::Expansion {
            expansion,
            plugin: plugin.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn primary_owner(&self, name: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            Registration::Primary {
                descriptor, plugin, ..
            } if descriptor.name == name => Some(plugin.as_str()),
            _ => None,
        })
    }

    fn default_name(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            Registration::Primary { descriptor, .. } if descriptor.is_default => {
                Some(descriptor.name.as_str())
            }
            _ => None,
        })
    }

    fn parse_options(
        descriptor: &CommandDescriptor,
    ) -> Result<Vec<(OptionSpec, CommandOption)>, RegistryError> {
        let mut seen_long = HashSet::new();
        let mut seen_short = HashSet::new();
        let mut parsed = Vec::with_capacity(descriptor.options.len());

        for option in &descriptor.options {
            let spec =
                OptionSpec::parse(&option.flag).map_err(|source| RegistryError::InvalidOption {
                    command: descriptor.name.clone(),
                    source,
                })?;
            let short_clash = spec.short.is_some_and(|c| !seen_short.insert(c));
            if !seen_long.insert(spec.long.clone()) || short_clash {
                return Err(RegistryError::DuplicateOption {
                    command: descriptor.name.clone(),
                    long: spec.long,
                });
            }
            parsed.push((spec, option.clone()));
        }
        Ok(parsed)
    }

    /// Partitions the entries into primaries and expansions and builds every
    /// command's chain, preserving registration order within each group.
    pub fn resolve(self) -> CommandTable {
        let mut commands: Vec<ResolvedCommand> = Vec::new();
        let mut befores: HashMap<String, Vec<Step>> = HashMap::new();
        let mut afters: HashMap<String, Vec<Step>> = HashMap::new();
        let mut expansion_targets: Vec<String> = Vec::new();

        for entry in self.entries {
            match entry {
                Registration::Primary {
                    descriptor,
                    options,
                    plugin,
                } => commands.push(ResolvedCommand {
                    name: descriptor.name,
                    description: descriptor.description,
                    is_default: descriptor.is_default,
                    options,
                    plugin,
                    before: Vec::new(),
                    primary: descriptor.action,
                    after: Vec::new(),
                }),
                Registration::Expansion { expansion, plugin } => {
                    if !expansion_targets.contains(&expansion.name) {
                        expansion_targets.push(expansion.name.clone());
                    }
                    if let Some(action) = expansion.before_action {
                        befores.entry(expansion.name.clone()).or_default().push(Step {
                            plugin: plugin.clone(),
                            action,
                        });
                    }
                    if let Some(action) = expansion.after_action {
                        afters
                            .entry(expansion.name)
                            .or_default()
                            .push(Step { plugin, action });
                    }
                }
            }
        }

        for command in &mut commands {
            command.before = befores.remove(&command.name).unwrap_or_default();
            command.after = afters.remove(&command.name).unwrap_or_default();
        }

        let dangling: Vec<String> = expansion_targets
            .into_iter()
            .filter(|target| !commands.iter().any(|c| &c.name == target))
            .collect();
        for target in &dangling {
            log::warn!(
                "Command '{}' was expanded by a plugin but never registered.",
                target
            );
        }

        CommandTable { commands, dangling }
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

// --- TABLE (sealed phase) ---

/// A command with its fully resolved chain.
pub struct ResolvedCommand {
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    /// Parsed option specs, in declaration order.
    pub options: Vec<(OptionSpec, CommandOption)>,
    /// Plugin that registered the primary action.
    pub plugin: String,
    pub(crate) before: Vec<Step>,
    pub(crate) primary: Action,
    pub(crate) after: Vec<Step>,
}

impl ResolvedCommand {
    /// Plugins contributing before steps, in execution order.
    pub fn before_plugins(&self) -> Vec<&str> {
        self.before.iter().map(|s| s.plugin.as_str()).collect()
    }

    /// Plugins contributing after steps, in execution order.
    pub fn after_plugins(&self) -> Vec<&str> {
        self.after.iter().map(|s| s.plugin.as_str()).collect()
    }
}

impl fmt::Debug for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCommand")
            .field("name", &self.name)
            .field("plugin", &self.plugin)
            .field("is_default", &self.is_default)
            .field("before", &self.before_plugins())
            .field("after", &self.after_plugins())
            .finish()
    }
}

/// The read-only command set of the execution phase, in plugin-load order.
#[derive(Debug)]
pub struct CommandTable {
    commands: Vec<ResolvedCommand>,
    dangling: Vec<String>,
}

impl CommandTable {
    pub fn get(&self, name: &str) -> Option<&ResolvedCommand> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn default_command(&self) -> Option<&ResolvedCommand> {
        self.commands.iter().find(|c| c.is_default)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedCommand> {
        self.commands.iter()
    }

    /// Expansion targets with no primary command behind them.
    pub fn dangling_expansions(&self) -> &[String] {
        &self.dangling
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
