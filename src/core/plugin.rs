// src/core/plugin.rs

//! # Plugins
//!
//! A plugin is an identifier plus an async initializer. The [`PluginLoader`]
//! resolves the identifiers listed in the project configuration against a
//! [`PluginCatalog`] and awaits each initializer in configuration order. Every
//! initializer receives a [`PluginContext`] over the same open [`Registry`].

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::commands::{CommandDescriptor, CommandExpansion, RegistryError};
use super::lifecycle::{AnalyseInfo, EntryContext, EntryFragments};
use crate::models::{Env, FileRecord, ProjectConfig};
use crate::project::check::WhiteFileRule;
use crate::project::files::ProjectFile;
use crate::project::scanner::ScanError;
use crate::project::Project;
use crate::state::Registry;

/// An extension loaded at startup.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Identifier used in the `plugins` list of the project configuration.
    fn id(&self) -> &str;

    /// Registers the plugin's commands, expansions, hooks and project files.
    /// May inspect the project first and register conditionally.
    async fn init(&self, ctx: &mut PluginContext<'_>) -> anyhow::Result<()>;
}

// --- CONTEXT ---

/// The handle a plugin initializer works through.
pub struct PluginContext<'a> {
    plugin_id: &'a str,
    project: &'a Project,
    registry: &'a mut Registry,
}

impl<'a> PluginContext<'a> {
    pub fn new(plugin_id: &'a str, project: &'a Project, registry: &'a mut Registry) -> Self {
        Self {
            plugin_id,
            project,
            registry,
        }
    }

    pub fn plugin_id(&self) -> &str {
        self.plugin_id
    }

    pub fn project(&self) -> &Project {
        self.project
    }

    pub fn project_root(&self) -> &Path {
        self.project.root()
    }

    pub fn project_config(&self, env: Env) -> &ProjectConfig {
        self.project.config(env)
    }

    /// Scans the project from scratch, skipping the output of `env`.
    pub fn files(&self, env: Env) -> Result<Vec<FileRecord>, ScanError> {
        self.project.scan(env)
    }

    /// Command registration, attributed to this plugin.
    pub fn commands(&mut self) -> CommandRegistrar<'_> {
        CommandRegistrar {
            plugin_id: self.plugin_id,
            registry: self.registry,
        }
    }

    /// Lifecycle hook registration, attributed to this plugin.
    pub fn hooks(&mut self) -> HookRegistrar<'_> {
        HookRegistrar {
            plugin_id: self.plugin_id,
            registry: self.registry,
        }
    }

    pub fn add_project_file(&mut self, file: ProjectFile) {
        log::debug!(
            "Plugin '{}' registered project file '{}'",
            self.plugin_id,
            file.file_name
        );
        self.registry.add_project_file(file);
    }

    pub fn add_white_file_rule(&mut self, rule: WhiteFileRule) {
        log::debug!("Plugin '{}' added a white file rule", self.plugin_id);
        self.registry.add_white_file_rule(rule);
    }
}

/// Narrow view of the command registry handed out by [`PluginContext::commands`].
pub struct CommandRegistrar<'r> {
    plugin_id: &'r str,
    registry: &'r mut Registry,
}

impl CommandRegistrar<'_> {
    pub fn register_command(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        self.registry
            .commands_mut()
            .register_command(self.plugin_id, descriptor)
    }

    pub fn expand_command(&mut self, expansion: CommandExpansion) {
        self.registry
            .commands_mut()
            .expand_command(self.plugin_id, expansion);
    }
}

/// Narrow view of the lifecycle hooks handed out by [`PluginContext::hooks`].
pub struct HookRegistrar<'r> {
    plugin_id: &'r str,
    registry: &'r mut Registry,
}

impl HookRegistrar<'_> {
    pub fn on_analyse_project<F>(&mut self, callback: F)
    where
        F: Fn(&AnalyseInfo, &[FileRecord]) -> anyhow::Result<AnalyseInfo> + Send + Sync + 'static,
    {
        self.registry
            .hooks_mut()
            .on_analyse_project(self.plugin_id, callback);
    }

    pub fn on_create_entry<F>(&mut self, callback: F)
    where
        F: Fn(&EntryFragments, &EntryContext) -> anyhow::Result<EntryFragments>
            + Send
            + Sync
            + 'static,
    {
        self.registry
            .hooks_mut()
            .on_create_entry(self.plugin_id, callback);
    }
}

// --- CLOSURE PLUGINS ---

type InitFn = dyn Fn(&mut PluginContext<'_>) -> anyhow::Result<()> + Send + Sync;

/// A plugin whose initializer is a plain closure.
pub struct FnPlugin {
    id: String,
    init: Box<InitFn>,
}

#[async_trait]
impl Plugin for FnPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    async fn init(&self, ctx: &mut PluginContext<'_>) -> anyhow::Result<()> {
        (self.init)(ctx)
    }
}

/// Builds a plugin from an identifier and a synchronous initializer.
pub fn plugin_fn<F>(id: impl Into<String>, init: F) -> Arc<dyn Plugin>
where
    F: Fn(&mut PluginContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnPlugin {
        id: id.into(),
        init: Box::new(init),
    })
}

// --- CATALOG ---

/// The plugins known to the binary, looked up by identifier.
#[derive(Clone, Default)]
pub struct PluginCatalog {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.register(plugin);
        self
    }

    /// Adds a plugin, replacing any plugin with the same identifier.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        match self.plugins.iter_mut().find(|p| p.id() == plugin.id()) {
            Some(slot) => {
                log::debug!("Plugin '{}' replaced in the catalog", plugin.id());
                *slot = plugin;
            }
            None => self.plugins.push(plugin),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.id() == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.id()).collect()
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("plugins", &self.ids())
            .finish()
    }
}

// --- LOADER ---

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unknown plugin '{plugin_id}'. Known plugins: {known}")]
    UnknownPlugin { plugin_id: String, known: String },
    #[error("Plugin '{plugin_id}' failed to initialize: {source}")]
    PluginInit {
        plugin_id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Runs plugin initializers against an open registry.
#[derive(Debug)]
pub struct PluginLoader<'c> {
    catalog: &'c PluginCatalog,
}

impl<'c> PluginLoader<'c> {
    pub fn new(catalog: &'c PluginCatalog) -> Self {
        Self { catalog }
    }

    /// Loads `ids` in order. Every identifier is resolved before any
    /// initializer runs, so an unknown plugin leaves the registry untouched.
    /// A failing initializer stops the load; plugins after it never run.
    pub async fn load_all(
        &self,
        ids: &[String],
        project: &Project,
        registry: &mut Registry,
    ) -> Result<(), LoadError> {
        let mut seen = HashSet::new();
        let mut plan = Vec::with_capacity(ids.len());
        for id in ids {
            let plugin = self
                .catalog
                .get(id)
                .ok_or_else(|| LoadError::UnknownPlugin {
                    plugin_id: id.clone(),
                    known: self.catalog.ids().join(", "),
                })?;
            if !seen.insert(id.as_str()) {
                log::warn!("Plugin '{}' is listed more than once; loading it once.", id);
                continue;
            }
            plan.push(plugin.clone());
        }

        for plugin in plan {
            let plugin_id = plugin.id().to_string();
            log::debug!("Loading plugin '{}'", plugin_id);
            let mut ctx = PluginContext::new(&plugin_id, project, registry);
            plugin
                .init(&mut ctx)
                .await
                .map_err(|source| LoadError::PluginInit {
                    plugin_id: plugin_id.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commands::action;
    use crate::core::options::ParsedOptions;
    use anyhow::anyhow;
    use std::sync::Mutex;

    fn empty_project() -> Project {
        Project::from_parts(std::env::temp_dir(), ProjectConfig::default(), ProjectConfig::default())
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// A plugin that records its initialization in a shared log.
    fn recording(id: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<dyn Plugin> {
        plugin_fn(id, move |ctx| {
            log.lock().unwrap().push(ctx.plugin_id().to_string());
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_plugins_load_in_configuration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = PluginCatalog::new()
            .with(recording("a", log.clone()))
            .with(recording("b", log.clone()))
            .with(recording("c", log.clone()));

        let project = empty_project();
        let mut registry = Registry::new();
        PluginLoader::new(&catalog)
            .load_all(&ids(&["c", "a", "b"]), &project, &mut registry)
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_unknown_plugin_fails_before_any_init() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = PluginCatalog::new().with(recording("a", log.clone()));

        let project = empty_project();
        let mut registry = Registry::new();
        let err = PluginLoader::new(&catalog)
            .load_all(&ids(&["a", "ghost"]), &project, &mut registry)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::UnknownPlugin { ref plugin_id, .. } if plugin_id == "ghost"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_init_stops_remaining_plugins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = PluginCatalog::new()
            .with(recording("a", log.clone()))
            .with(plugin_fn("broken", |_| Err(anyhow!("missing dependency"))))
            .with(recording("c", log.clone()));

        let project = empty_project();
        let mut registry = Registry::new();
        let err = PluginLoader::new(&catalog)
            .load_all(&ids(&["a", "broken", "c"]), &project, &mut registry)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::PluginInit { ref plugin_id, .. } if plugin_id == "broken"));
        assert!(err.to_string().contains("missing dependency"));
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_registry_errors_surface_as_init_failures() {
        let catalog = PluginCatalog::new()
            .with(plugin_fn("first", |ctx| {
                ctx.commands()
                    .register_command(CommandDescriptor::new("build", action(|_| async { Ok(()) })))?;
                Ok(())
            }))
            .with(plugin_fn("second", |ctx| {
                ctx.commands()
                    .register_command(CommandDescriptor::new("build", action(|_| async { Ok(()) })))?;
                Ok(())
            }));

        let project = empty_project();
        let mut registry = Registry::new();
        let err = PluginLoader::new(&catalog)
            .load_all(&ids(&["first", "second"]), &project, &mut registry)
            .await
            .unwrap_err();

        let LoadError::PluginInit { plugin_id, source } = err else {
            panic!("expected a PluginInit error");
        };
        assert_eq!(plugin_id, "second");
        assert!(matches!(
            source.downcast_ref::<RegistryError>(),
            Some(RegistryError::DuplicateCommand { .. })
        ));
    }

    #[tokio::test]
    async fn test_later_plugin_expands_earlier_command() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let x_log = order.clone();
        let a = plugin_fn("a", move |ctx| {
            let x_log = x_log.clone();
            ctx.commands().register_command(CommandDescriptor::new(
                "build",
                action(move |_| {
                    let x_log = x_log.clone();
                    async move {
                        x_log.lock().unwrap().push("X");
                        Ok(())
                    }
                }),
            ))?;
            Ok(())
        });
        let y_log = order.clone();
        let b = plugin_fn("b", move |ctx| {
            let y_log = y_log.clone();
            ctx.commands().expand_command(CommandExpansion::new("build").before(action(
                move |_| {
                    let y_log = y_log.clone();
                    async move {
                        tokio::task::yield_now().await;
                        y_log.lock().unwrap().push("Y");
                        Ok(())
                    }
                },
            )));
            Ok(())
        });

        let catalog = PluginCatalog::new().with(a).with(b);
        let project = Arc::new(empty_project());
        let mut registry = Registry::new();
        PluginLoader::new(&catalog)
            .load_all(&ids(&["a", "b"]), &project, &mut registry)
            .await
            .unwrap();

        let sealed = registry.seal();
        let build = sealed.commands.get("build").unwrap();
        assert_eq!(build.plugin, "a");
        assert_eq!(build.before_plugins(), vec!["b"]);

        let invocation = sealed.invocation(project).with_options(ParsedOptions::new());
        sealed.dispatcher().dispatch(Some("build"), invocation).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["Y", "X"]);
    }

    #[tokio::test]
    async fn test_duplicate_ids_load_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = PluginCatalog::new().with(recording("a", log.clone()));

        let project = empty_project();
        let mut registry = Registry::new();
        PluginLoader::new(&catalog)
            .load_all(&ids(&["a", "a"]), &project, &mut registry)
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_catalog_register_replaces_same_id() {
        let mut catalog = PluginCatalog::new()
            .with(plugin_fn("a", |_| Ok(())))
            .with(plugin_fn("b", |_| Ok(())));
        catalog.register(plugin_fn("a", |_| Err(anyhow!("replaced"))));
        assert_eq!(catalog.ids(), vec!["a", "b"]);
    }
}
