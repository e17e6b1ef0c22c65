// src/models.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_PLUGINS;

// --- ENVIRONMENT ---

/// The environment a project configuration is resolved for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    /// Development on the local machine.
    Local,
    /// Production builds.
    Prod,
}

impl Env {
    /// The lowercase name used in file names and environment variables.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- `config/*.toml` MODELS ---

/// Command lines used to drive the external bundler and test runner.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BundlerConfig {
    /// Long-running development server.
    pub dev: String,
    /// One-shot production build.
    pub build: String,
    /// Test runner.
    pub test: String,
    /// Linter run before the tests. Empty disables linting.
    pub lint: String,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            dev: "npx webpack serve --mode development".to_string(),
            build: "npx webpack --mode production".to_string(),
            test: "npx ava".to_string(),
            lint: "npx tslint -p .".to_string(),
        }
    }
}

/// The resolved configuration of a project for one environment.
///
/// Built once per invocation from `config/config.default.toml` overlaid with
/// `config/config.<env>.toml`; never mutated afterwards.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Output directory, relative to the project root. May be nested (`a/b/c`).
    pub dist_dir: String,
    /// Prefix for emitted assets: an absolute path or a URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,
    /// Base path the application is served under.
    pub base_href: String,
    /// Serve the development server over HTTPS.
    pub use_https: bool,
    /// Document title of the generated HTML shells.
    pub title: String,
    /// Plugin identifiers, in load order.
    pub plugins: Vec<String>,
    /// External tool command lines.
    pub bundler: BundlerConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            dist_dir: "dist".to_string(),
            public_path: None,
            base_href: "/".to_string(),
            use_https: false,
            title: "pri".to_string(),
            plugins: DEFAULT_PLUGINS.iter().map(|id| id.to_string()).collect(),
            bundler: BundlerConfig::default(),
        }
    }
}

// --- SCANNING & ANALYSIS MODELS ---

/// A parsed file path, as produced by the project scanner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileRecord {
    /// Absolute directory containing the file.
    pub dir: PathBuf,
    /// File name without its extension.
    pub name: String,
    /// Extension including the leading dot, or empty.
    pub ext: String,
}

impl FileRecord {
    /// Splits an absolute path into its record form.
    pub fn from_path(path: &Path) -> Self {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self { dir, name, ext }
    }

    /// The full absolute path of the file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}{}", self.name, self.ext))
    }

    /// The path relative to `root`, with `/` separators.
    pub fn relative_to(&self, root: &Path) -> Option<String> {
        let full = self.path();
        let relative = full.strip_prefix(root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

/// A page discovered during project analysis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Route the page is served under, always starting with `/`.
    pub router_path: String,
    /// Page source, relative to the project root.
    pub file: String,
}

/// The `projectAnalysePages` / `projectAnalyseMarkdownPages` analysis sections.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysePages {
    /// Pages in route order.
    pub pages: Vec<PageInfo>,
}

// --- BUILD MODELS ---

/// What a bundler run reports back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Content hash embedded in the emitted asset names.
    pub hash: String,
    /// Whether the bundler finished without errors.
    pub success: bool,
    /// Absolute output directory.
    pub dist_dir: PathBuf,
}
