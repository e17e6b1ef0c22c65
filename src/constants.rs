// src/constants.rs

/// Source directory of a project.
pub const SRC_DIR: &str = "src";

/// Scratch directory for generated files (entry, declarations).
pub const TEMP_DIR: &str = ".temp";

/// Directory holding the project's tests.
pub const TESTS_DIR: &str = "tests";

/// Output directory of the TypeScript compiler.
pub const BUILT_DIR: &str = "built";

/// Directory whose files become routes.
pub const PAGES_DIR: &str = "src/pages";

/// Directory holding the layered project configuration.
pub const CONFIG_DIR: &str = "config";

/// Base configuration layer, shared by every environment.
pub const DEFAULT_CONFIG_FILENAME: &str = "config.default.toml";

/// The generated entry file (inside `.temp/`).
pub const ENTRY_FILENAME: &str = "entry.tsx";

/// Analysis section holding the routes of `.tsx` pages.
pub const ANALYSE_PAGES_KEY: &str = "projectAnalysePages";

/// Analysis section holding the routes of markdown pages.
pub const ANALYSE_MARKDOWN_PAGES_KEY: &str = "projectAnalyseMarkdownPages";

/// Root-level tool files that are always accepted by the project file check.
pub const IGNORE_SCAN_SOURCES: &[&str] = &[
    ".gitignore",
    ".npmignore",
    ".prettierrc",
    ".git",
    "package-lock.json",
    "package.json",
    "tsconfig.json",
    "tslint.json",
];

/// Plugins loaded when a project does not list its own, in load order.
pub const DEFAULT_PLUGINS: &[&str] = &[
    "ensure-project-files",
    "analyse-pages",
    "command-dev",
    "command-build",
    "command-test",
    "command-plugin",
];
