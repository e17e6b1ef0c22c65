// src/project/config.rs

//! Layered project configuration.
//!
//! `config/config.default.toml` is the base layer. `config/config.<env>.toml`
//! is merged on top of it table by table, so an environment file only needs
//! the keys it changes. Missing files are empty layers.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{CONFIG_DIR, DEFAULT_CONFIG_FILENAME};
use crate::models::{Env, ProjectConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML file at '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid '{env}' configuration: {source}")]
    Invalid {
        env: Env,
        #[source]
        source: toml::de::Error,
    },
}

/// Path of the layer for `env`, or of the default layer when `env` is `None`.
pub fn layer_path(root: &Path, env: Option<Env>) -> PathBuf {
    let file_name = match env {
        Some(env) => format!("config.{}.toml", env),
        None => DEFAULT_CONFIG_FILENAME.to_string(),
    };
    root.join(CONFIG_DIR).join(file_name)
}

/// Resolves the configuration of `env` for the project at `root`.
pub fn load_config(root: &Path, env: Env) -> Result<ProjectConfig, ConfigError> {
    let mut merged = read_layer(&layer_path(root, None))?;
    let overlay = read_layer(&layer_path(root, Some(env)))?;
    merge_tables(&mut merged, overlay);

    toml::Value::Table(merged)
        .try_into::<ProjectConfig>()
        .map_err(|source| ConfigError::Invalid { env, source })
}

fn read_layer(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No configuration layer at '{}'", path.display());
            return Ok(toml::Table::new());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    log::debug!("Loading configuration layer '{}'", path.display());
    toml::from_str::<toml::Table>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Deep-merges `overlay` into `base`. Nested tables merge key by key; any
/// other value (arrays included) replaces the base value.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(overlay_table) => match base.get_mut(&key) {
                Some(toml::Value::Table(base_table)) => merge_tables(base_table, overlay_table),
                _ => {
                    base.insert(key, toml::Value::Table(overlay_table));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_layer(root: &Path, name: &str, content: &str) {
        let dir = root.join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(dir.path(), Env::Local).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_env_layer_overrides_default_layer() {
        let dir = tempdir().unwrap();
        write_layer(
            dir.path(),
            "config.default.toml",
            "title = \"Docs\"\ndist_dir = \"out\"\n\n[bundler]\ndev = \"vite\"\n",
        );
        write_layer(
            dir.path(),
            "config.prod.toml",
            "public_path = \"https://cdn.example.com/app/\"\n\n[bundler]\nbuild = \"vite build\"\n",
        );

        let prod = load_config(dir.path(), Env::Prod).unwrap();
        assert_eq!(prod.title, "Docs");
        assert_eq!(prod.dist_dir, "out");
        assert_eq!(prod.public_path.as_deref(), Some("https://cdn.example.com/app/"));
        assert_eq!(prod.bundler.dev, "vite");
        assert_eq!(prod.bundler.build, "vite build");

        let local = load_config(dir.path(), Env::Local).unwrap();
        assert_eq!(local.public_path, None);
        assert_eq!(local.bundler.build, ProjectConfig::default().bundler.build);
    }

    #[test]
    fn test_plugin_list_is_replaced_not_merged() {
        let dir = tempdir().unwrap();
        write_layer(dir.path(), "config.default.toml", "plugins = [\"a\", \"b\"]\n");
        write_layer(dir.path(), "config.local.toml", "plugins = [\"c\"]\n");

        let config = load_config(dir.path(), Env::Local).unwrap();
        assert_eq!(config.plugins, vec!["c".to_string()]);
    }

    #[test]
    fn test_parse_and_validation_errors() {
        let dir = tempdir().unwrap();
        write_layer(dir.path(), "config.default.toml", "title = \n");
        assert!(matches!(
            load_config(dir.path(), Env::Local),
            Err(ConfigError::Parse { .. })
        ));

        write_layer(dir.path(), "config.default.toml", "use_https = \"yes\"\n");
        assert!(matches!(
            load_config(dir.path(), Env::Local),
            Err(ConfigError::Invalid { env: Env::Local, .. })
        ));
    }
}
