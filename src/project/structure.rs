// src/project/structure.rs

//! Paths a project keeps out of version control and out of its npm package.

use crate::constants::{BUILT_DIR, TEMP_DIR, TESTS_DIR};
use crate::models::ProjectConfig;

/// Root-relative paths for `.gitignore`. Every prefix of a nested `dist_dir`
/// is listed, so `a/b/c` yields `a`, `a/b` and `a/b/c`.
pub fn gitignores(config: &ProjectConfig) -> Vec<String> {
    let mut ignores: Vec<String> = [
        "node_modules",
        ".cache",
        ".vscode",
        TEMP_DIR,
        BUILT_DIR,
        ".DS_Store",
        "coverage",
        ".nyc_output",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut prefix = String::new();
    for part in config.dist_dir.trim_end_matches('/').split('/') {
        if part.is_empty() {
            continue;
        }
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(part);
        ignores.push(prefix.clone());
    }
    ignores
}

/// Like [`gitignores`], but ships the compiled output and drops the tests.
pub fn npmignores(config: &ProjectConfig) -> Vec<String> {
    let mut ignores = gitignores(config);
    ignores.push(TESTS_DIR.to_string());
    ignores.retain(|name| name != BUILT_DIR);
    ignores
}

/// Renders an ignore list as file content, one root-anchored entry per line.
pub fn render_ignore_file(entries: &[String]) -> String {
    entries
        .iter()
        .map(|name| format!("/{}", name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_dist(dist_dir: &str) -> ProjectConfig {
        ProjectConfig {
            dist_dir: dist_dir.to_string(),
            ..ProjectConfig::default()
        }
    }

    #[test]
    fn test_gitignores_list_every_dist_prefix() {
        let ignores = gitignores(&config_with_dist("a/b/c/"));
        assert_eq!(&ignores[..8], [
            "node_modules", ".cache", ".vscode", ".temp", "built", ".DS_Store", "coverage", ".nyc_output"
        ]);
        assert_eq!(&ignores[8..], ["a", "a/b", "a/b/c"]);
    }

    #[test]
    fn test_npmignores_swap_built_for_tests() {
        let ignores = npmignores(&config_with_dist("dist"));
        assert!(!ignores.iter().any(|i| i == "built"));
        assert_eq!(ignores.last().map(String::as_str), Some("tests"));
        assert!(ignores.iter().any(|i| i == "dist"));
    }

    #[test]
    fn test_render_ignore_file() {
        let rendered = render_ignore_file(&["node_modules".to_string(), "dist".to_string()]);
        assert_eq!(rendered, "/node_modules\n/dist");
    }
}
