// src/core/lifecycle.rs

//! # Lifecycle Hooks
//!
//! Named extension points the host runs at fixed places in its own flow.
//! Every event threads an [`Accumulator`] through its callbacks in
//! registration order: a callback sees everything merged so far and returns a
//! partial accumulator, which is merged key by key before the next callback runs.
//!
//! Each event fixes its value and context types, so a callback for
//! `onCreateEntry` can only return entry fragments, and so on.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

use crate::models::{Env, FileRecord, ProjectConfig};
use crate::project::entry::EntryFragment;

/// Key that owns an accumulator entry before any callback ran.
const INITIAL_OWNER: &str = "<initial value>";

// --- ACCUMULATOR ---

/// An insertion-ordered map of namespaced contributions.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for Accumulator<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> Accumulator<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces `key`, keeping its original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> IntoIterator for Accumulator<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Accumulator<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut acc = Self::new();
        for (k, v) in iter {
            acc.insert(k, v);
        }
        acc
    }
}

/// Result of project analysis: JSON sections namespaced by contributing plugin.
pub type AnalyseInfo = Accumulator<serde_json::Value>;

impl Accumulator<serde_json::Value> {
    /// Reads a section back into its typed form.
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    /// Builder-style insert of a typed section.
    pub fn with_section<T: Serialize>(
        mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        self.insert(key, serde_json::to_value(value)?);
        Ok(self)
    }
}

/// Fragments of the generated entry file, namespaced by contributing plugin.
pub type EntryFragments = Accumulator<EntryFragment>;

// --- EVENTS ---

/// A lifecycle extension point and the types its callbacks exchange.
pub trait LifecycleEvent: 'static {
    /// Name shown in logs and errors.
    const NAME: &'static str;
    /// Value type of the threaded accumulator.
    type Value: Clone + fmt::Debug + Send + Sync + 'static;
    /// Extra, read-only input handed to every callback.
    type Context: ?Sized + Sync;
}

/// Runs once the project files have been scanned.
#[derive(Debug)]
pub enum AnalyseProject {}

impl LifecycleEvent for AnalyseProject {
    const NAME: &'static str = "onAnalyseProject";
    type Value = serde_json::Value;
    type Context = [FileRecord];
}

/// Runs while the entry file is generated.
#[derive(Debug)]
pub enum CreateEntry {}

impl LifecycleEvent for CreateEntry {
    const NAME: &'static str = "onCreateEntry";
    type Value = EntryFragment;
    type Context = EntryContext;
}

/// What `onCreateEntry` callbacks get to read.
#[derive(Debug, Clone)]
pub struct EntryContext {
    pub analyse_info: AnalyseInfo,
    pub env: Env,
    pub config: ProjectConfig,
}

/// Signature of a callback for event `E`.
pub type Callback<E> = Box<
    dyn Fn(
            &Accumulator<<E as LifecycleEvent>::Value>,
            &<E as LifecycleEvent>::Context,
        ) -> anyhow::Result<Accumulator<<E as LifecycleEvent>::Value>>
        + Send
        + Sync,
>;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Lifecycle hook '{event}' registered by plugin '{plugin}' failed: {source}")]
    Callback {
        event: &'static str,
        plugin: String,
        #[source]
        source: anyhow::Error,
    },
}

struct Registration<E: LifecycleEvent> {
    plugin: String,
    callback: Callback<E>,
}

/// A key one plugin replaced after another plugin (or the initial value)
/// had contributed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overwrite {
    pub key: String,
    /// Previous owner, or `<initial value>`.
    pub previous: String,
    pub plugin: String,
}

/// The merged accumulator of one event plus the overwrites that happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission<V> {
    pub value: Accumulator<V>,
    pub overwrites: Vec<Overwrite>,
}

/// The callbacks of one event, in registration order.
pub struct HookList<E: LifecycleEvent> {
    registrations: Vec<Registration<E>>,
    _event: PhantomData<fn() -> E>,
}

impl<E: LifecycleEvent> Default for HookList<E> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
            _event: PhantomData,
        }
    }
}

impl<E: LifecycleEvent> HookList<E> {
    pub fn register(&mut self, plugin: &str, callback: Callback<E>) {
        log::debug!("Plugin '{}' registered a '{}' hook", plugin, E::NAME);
        self.registrations.push(Registration {
            plugin: plugin.to_string(),
            callback,
        });
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Runs every callback in registration order, threading the accumulator.
    ///
    /// A key contributed by one plugin and then returned by another is
    /// overwritten, logged as a warning and listed in the emission. The first
    /// failing callback aborts the event.
    pub(crate) fn emit(
        &self,
        initial: Accumulator<E::Value>,
        context: &E::Context,
    ) -> Result<Emission<E::Value>, HookError> {
        let mut acc = initial;
        let mut overwrites = Vec::new();
        let mut owners: HashMap<String, String> = acc
            .keys()
            .map(|k| (k.to_string(), INITIAL_OWNER.to_string()))
            .collect();

        for registration in &self.registrations {
            log::trace!("Running '{}' hook of plugin '{}'", E::NAME, registration.plugin);
            let partial = (registration.callback)(&acc, context).map_err(|source| {
                HookError::Callback {
                    event: E::NAME,
                    plugin: registration.plugin.clone(),
                    source,
                }
            })?;

            for (key, value) in partial {
                if let Some(previous) = owners.get(&key) {
                    if *previous != registration.plugin {
                        log::warn!(
                            "'{}' hook of plugin '{}' overwrote key '{}' contributed by '{}'.",
                            E::NAME,
                            registration.plugin,
                            key,
                            previous
                        );
                        overwrites.push(Overwrite {
                            key: key.clone(),
                            previous: previous.clone(),
                            plugin: registration.plugin.clone(),
                        });
                    }
                }
                owners.insert(key.clone(), registration.plugin.clone());
                acc.insert(key, value);
            }
        }

        Ok(Emission {
            value: acc,
            overwrites,
        })
    }
}

impl<E: LifecycleEvent> fmt::Debug for HookList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.registrations.iter().map(|r| r.plugin.as_str()).collect();
        f.debug_struct("HookList")
            .field("event", &E::NAME)
            .field("plugins", &plugins)
            .finish()
    }
}

// --- REGISTRY ---

/// Every lifecycle event the host knows about.
#[derive(Debug, Default)]
pub struct HookRegistry {
    analyse_project: HookList<AnalyseProject>,
    create_entry: HookList<CreateEntry>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_analyse_project<F>(&mut self, plugin: &str, callback: F)
    where
        F: Fn(&AnalyseInfo, &[FileRecord]) -> anyhow::Result<AnalyseInfo> + Send + Sync + 'static,
    {
        self.analyse_project.register(plugin, Box::new(callback));
    }

    pub fn on_create_entry<F>(&mut self, plugin: &str, callback: F)
    where
        F: Fn(&EntryFragments, &EntryContext) -> anyhow::Result<EntryFragments>
            + Send
            + Sync
            + 'static,
    {
        self.create_entry.register(plugin, Box::new(callback));
    }

    pub(crate) fn emit_analyse_project(
        &self,
        initial: AnalyseInfo,
        files: &[FileRecord],
    ) -> Result<AnalyseInfo, HookError> {
        self.analyse_project.emit(initial, files).map(|e| e.value)
    }

    pub(crate) fn emit_create_entry(
        &self,
        initial: EntryFragments,
        context: &EntryContext,
    ) -> Result<EntryFragments, HookError> {
        self.create_entry.emit(initial, context).map(|e| e.value)
    }

    /// Number of callbacks registered across all events.
    pub fn len(&self) -> usize {
        self.analyse_project.len() + self.create_entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_accumulator_threads_through_hooks() {
        let mut hooks = HookRegistry::new();
        hooks.on_analyse_project("a", |_, _| Ok(AnalyseInfo::new().with("a", json!(1))));
        hooks.on_analyse_project("b", |_, _| Ok(AnalyseInfo::new().with("b", json!(2))));
        hooks.on_analyse_project("c", |_, _| Ok(AnalyseInfo::new().with("c", json!(3))));

        let result = hooks.emit_analyse_project(AnalyseInfo::new(), &[]).unwrap();

        let expected: AnalyseInfo = [("a", json!(1)), ("b", json!(2)), ("c", json!(3))]
            .into_iter()
            .collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_later_hooks_see_earlier_contributions() {
        let mut hooks = HookRegistry::new();
        hooks.on_analyse_project("pages", |_, files| {
            Ok(AnalyseInfo::new().with("pages", json!(files.len())))
        });
        hooks.on_analyse_project("stats", |acc, _| {
            let pages = acc.section::<usize>("pages")?.unwrap_or(0);
            Ok(AnalyseInfo::new().with("stats", json!({ "double": pages * 2 })))
        });

        let files = vec![
            FileRecord::from_path(std::path::Path::new("/p/src/a.tsx")),
            FileRecord::from_path(std::path::Path::new("/p/src/b.tsx")),
        ];
        let result = hooks.emit_analyse_project(AnalyseInfo::new(), &files).unwrap();
        assert_eq!(result.get("stats"), Some(&json!({ "double": 4 })));
    }

    #[test]
    fn test_initial_value_is_kept_and_overwrite_is_not_fatal() {
        let mut hooks = HookRegistry::new();
        hooks.on_analyse_project("a", |_, _| Ok(AnalyseInfo::new().with("shared", json!("a"))));
        hooks.on_analyse_project("b", |_, _| Ok(AnalyseInfo::new().with("shared", json!("b"))));

        let initial = AnalyseInfo::new().with("seed", json!(true));
        let emission = hooks.analyse_project.emit(initial, &[]).unwrap();

        let keys: Vec<&str> = emission.value.keys().collect();
        assert_eq!(keys, vec!["seed", "shared"]);
        assert_eq!(emission.value.get("shared"), Some(&json!("b")));
        assert_eq!(
            emission.overwrites,
            vec![Overwrite {
                key: "shared".to_string(),
                previous: "a".to_string(),
                plugin: "b".to_string(),
            }]
        );
    }

    #[test]
    fn test_overwrite_of_own_key_is_not_reported() {
        let mut hooks = HookRegistry::new();
        hooks.on_analyse_project("a", |_, _| Ok(AnalyseInfo::new().with("count", json!(1))));
        hooks.on_analyse_project("a", |_, _| Ok(AnalyseInfo::new().with("count", json!(2))));

        let emission = hooks.analyse_project.emit(AnalyseInfo::new(), &[]).unwrap();
        assert_eq!(emission.value.get("count"), Some(&json!(2)));
        assert!(emission.overwrites.is_empty());
    }

    #[test]
    fn test_overwrite_of_initial_value_is_reported() {
        let mut hooks = HookRegistry::new();
        hooks.on_analyse_project("a", |_, _| Ok(AnalyseInfo::new().with("seed", json!(false))));

        let initial = AnalyseInfo::new().with("seed", json!(true));
        let emission = hooks.analyse_project.emit(initial, &[]).unwrap();
        assert_eq!(emission.overwrites.len(), 1);
        assert_eq!(emission.overwrites[0].previous, INITIAL_OWNER);
        assert_eq!(emission.overwrites[0].plugin, "a");
    }

    #[test]
    fn test_failing_hook_stops_the_event() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookRegistry::new();

        let log = calls.clone();
        hooks.on_analyse_project("ok", move |_, _| {
            log.lock().unwrap().push("ok");
            Ok(AnalyseInfo::new())
        });
        hooks.on_analyse_project("broken", |_, _| Err(anyhow!("cannot read pages")));
        let log = calls.clone();
        hooks.on_analyse_project("never", move |_, _| {
            log.lock().unwrap().push("never");
            Ok(AnalyseInfo::new())
        });

        let err = hooks.emit_analyse_project(AnalyseInfo::new(), &[]).unwrap_err();
        let HookError::Callback { event, plugin, .. } = &err;
        assert_eq!(*event, "onAnalyseProject");
        assert_eq!(plugin, "broken");
        assert!(err.to_string().contains("cannot read pages"));
        assert_eq!(*calls.lock().unwrap(), vec!["ok"]);
    }

    #[test]
    fn test_create_entry_fragments_keep_contribution_order() {
        let mut hooks = HookRegistry::new();
        hooks.on_create_entry("router", |_, ctx| {
            Ok(EntryFragments::new().with(
                "router",
                EntryFragment::body(format!("// env {}", ctx.env)),
            ))
        });
        hooks.on_create_entry("theme", |_, _| {
            Ok(EntryFragments::new().with("theme", EntryFragment::header("import './theme'")))
        });

        let context = EntryContext {
            analyse_info: AnalyseInfo::new(),
            env: Env::Prod,
            config: ProjectConfig::default(),
        };
        let result = hooks.emit_create_entry(EntryFragments::new(), &context).unwrap();
        let keys: Vec<&str> = result.keys().collect();
        assert_eq!(keys, vec!["router", "theme"]);
        assert_eq!(result.get("router").map(|f| f.body.as_str()), Some("// env prod"));
    }

    #[test]
    fn test_section_round_trip_is_typed() {
        #[derive(Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Components {
            has_components: bool,
        }

        let info = AnalyseInfo::new()
            .with_section("customPlugin", &Components { has_components: true })
            .unwrap();
        let section: Option<Components> = info.section("customPlugin").unwrap();
        assert_eq!(section, Some(Components { has_components: true }));
        assert!(info.section::<Components>("missing").unwrap().is_none());
        assert!(info.section::<Vec<u32>>("customPlugin").is_err());
    }
}
