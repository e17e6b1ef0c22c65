// src/project/html.rs

//! Static HTML shells, one per route, written next to the bundler output.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{ANALYSE_MARKDOWN_PAGES_KEY, ANALYSE_PAGES_KEY};
use crate::core::lifecycle::AnalyseInfo;
use crate::models::{AnalysePages, BuildOutcome, ProjectConfig};

pub fn ensure_end_with_slash(s: &str) -> String {
    if s.ends_with('/') {
        s.to_string()
    } else {
        format!("{}/", s)
    }
}

/// Joins URL path segments with exactly one `/` between them.
fn join_url_path(base: &str, file: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), file.trim_start_matches('/'))
}

/// Resolves `file` against `base` the way a relative URL reference is
/// resolved: everything after the last `/` of the base path is replaced.
fn resolve_url(base: &str, file: &str) -> String {
    let path_start = match base.find("://") {
        Some(i) => i + 3,
        None if base.starts_with("//") => 2,
        None => 0,
    };
    let (origin, path) = if path_start == 0 {
        ("", base)
    } else {
        match base[path_start..].find('/') {
            Some(i) => base.split_at(path_start + i),
            None => return format!("{}/{}", base, file),
        }
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let dir = match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    };
    format!("{}{}{}", origin, dir, file)
}

/// Public URL of an emitted asset, honouring `public_path`.
pub fn entry_path(config: &ProjectConfig, file_name: &str) -> String {
    match config.public_path.as_deref() {
        Some(public_path) if public_path.starts_with('/') && !public_path.starts_with("//") => {
            join_url_path(public_path, file_name)
        }
        Some(public_path) if !public_path.is_empty() => resolve_url(public_path, file_name),
        _ => format!("/{}", file_name),
    }
}

pub fn js_file_name(hash: &str) -> String {
    format!("main.{}.js", hash)
}

pub fn css_file_name(hash: &str) -> String {
    format!("main.{}.css", hash)
}

/// Renders the shell of one route.
pub fn render_html(config: &ProjectConfig, hash: &str, has_css: bool) -> String {
    let css_link = if has_css {
        format!(
            "\n    <link rel=\"stylesheet\" type=\"text/css\" href=\"{}\"/>",
            entry_path(config, &css_file_name(hash))
        )
    } else {
        String::new()
    };

    format!(
        r#"<html>
  <head>
    <title>{title}</title>{css_link}
    <style>
      html,
      body {{
        margin: 0;
        padding: 0;
      }}
    </style>
  </head>
  <body>
    <div id="root"></div>
    <script>
      if (navigator.serviceWorker) {{
        navigator.serviceWorker.register("{sw}", {{scope: "{scope}"}})
      }}
    </script>
    <script src="{script}"></script>
  </body>
</html>
"#,
        title = config.title,
        css_link = css_link,
        sw = join_url_path(&config.base_href, "sw.js"),
        scope = ensure_end_with_slash(&config.base_href),
        script = entry_path(config, &js_file_name(hash)),
    )
}

/// Writes `<dist>/<route>/index.html` for every page found by analysis, tsx
/// pages first, then markdown pages. Returns the written paths.
pub fn generate_static_html(
    project_root: &Path,
    config: &ProjectConfig,
    analyse_info: &AnalyseInfo,
    outcome: &BuildOutcome,
) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for key in [ANALYSE_PAGES_KEY, ANALYSE_MARKDOWN_PAGES_KEY] {
        let section: Option<AnalysePages> = analyse_info
            .section(key)
            .with_context(|| format!("Analysis section '{}' is malformed", key))?;
        pages.extend(section.unwrap_or_default().pages);
    }

    let dist_dir = project_root.join(&config.dist_dir);
    let has_css = dist_dir.join(css_file_name(&outcome.hash)).exists();
    let html = render_html(config, &outcome.hash, has_css);

    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let route = page.router_path.trim_start_matches('/');
        let html_path = dist_dir.join(route).join("index.html");
        if let Some(parent) = html_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
        }
        fs::write(&html_path, &html)
            .with_context(|| format!("Failed to write '{}'", html_path.display()))?;
        log::debug!("Static HTML for '{}' at '{}'", page.router_path, html_path.display());
        written.push(html_path);
    }
    Ok(written)
}
