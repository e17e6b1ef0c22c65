// src/plugins/analyse_pages.rs

//! Turns `src/pages` into routes.
//!
//! - `src/pages/**/index.tsx` is a page routed at its directory.
//! - `src/pages/**/*.md` is a markdown page; `index.md` is routed at its
//!   directory, any other file at `<dir>/<name>`.

use async_trait::async_trait;
use std::path::Path;

use crate::constants::{ANALYSE_MARKDOWN_PAGES_KEY, ANALYSE_PAGES_KEY, PAGES_DIR, TEMP_DIR};
use crate::core::lifecycle::{AnalyseInfo, EntryFragments};
use crate::core::plugin::{Plugin, PluginContext};
use crate::models::{AnalysePages, FileRecord, PageInfo};
use crate::project::entry::EntryFragment;

pub struct AnalysePagesPlugin;

#[async_trait]
impl Plugin for AnalysePagesPlugin {
    fn id(&self) -> &str {
        "analyse-pages"
    }

    async fn init(&self, ctx: &mut PluginContext<'_>) -> anyhow::Result<()> {
        let root = ctx.project_root().to_path_buf();

        let analyse_root = root.clone();
        ctx.hooks().on_analyse_project(move |_, files| {
            let (pages, markdown_pages) = collect_pages(&analyse_root, files);
            AnalyseInfo::new()
                .with_section(ANALYSE_PAGES_KEY, &pages)?
                .with_section(ANALYSE_MARKDOWN_PAGES_KEY, &markdown_pages)
                .map_err(Into::into)
        });

        ctx.hooks().on_create_entry(|_, context| {
            let mut pages = Vec::new();
            for key in [ANALYSE_PAGES_KEY, ANALYSE_MARKDOWN_PAGES_KEY] {
                let section: Option<AnalysePages> = context.analyse_info.section(key)?;
                pages.extend(section.unwrap_or_default().pages);
            }
            Ok(EntryFragments::new().with("analyse-pages", route_table(&pages)))
        });
        Ok(())
    }
}

fn router_path(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

/// Splits scanned files into tsx pages and markdown pages, each sorted by route.
pub fn collect_pages(root: &Path, files: &[FileRecord]) -> (AnalysePages, AnalysePages) {
    let prefix = format!("{}/", PAGES_DIR);
    let mut pages = Vec::new();
    let mut markdown_pages = Vec::new();

    for file in files {
        let Some(relative) = file.relative_to(root) else {
            continue;
        };
        let Some(inside) = relative.strip_prefix(&prefix) else {
            continue;
        };
        let mut segments: Vec<&str> = inside.split('/').collect();
        segments.pop();

        if file.name == "index" && file.ext == ".tsx" {
            pages.push(PageInfo {
                router_path: router_path(&segments),
                file: relative.clone(),
            });
        } else if file.ext == ".md" {
            if file.name != "index" {
                segments.push(&file.name);
            }
            markdown_pages.push(PageInfo {
                router_path: router_path(&segments),
                file: relative.clone(),
            });
        }
    }

    pages.sort_by(|a, b| a.router_path.cmp(&b.router_path));
    markdown_pages.sort_by(|a, b| a.router_path.cmp(&b.router_path));
    (
        AnalysePages { pages },
        AnalysePages {
            pages: markdown_pages,
        },
    )
}

/// The route table the entry file renders from.
pub fn route_table(pages: &[PageInfo]) -> EntryFragment {
    let routes: Vec<String> = pages
        .iter()
        .map(|page| {
            // Imports are relative to the entry file inside the temp dir.
            let depth = TEMP_DIR.split('/').count();
            let import_path = format!("{}{}", "../".repeat(depth), page.file);
            format!(
                "  {{ path: \"{}\", component: lazy(() => import(\"{}\")) }},",
                page.router_path, import_path
            )
        })
        .collect();

    EntryFragment::new(
        "import { lazy } from \"react\"",
        format!("export const routes = [\n{}\n]", routes.join("\n")),
    )
}
