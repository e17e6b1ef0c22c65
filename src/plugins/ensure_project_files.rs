// src/plugins/ensure_project_files.rs

//! Tooling files every project carries, and the `init` command that writes them.

use anyhow::Context;
use async_trait::async_trait;
use colored::Colorize;
use dialoguer::{Input, theme::ColorfulTheme};
use serde_json::json;
use std::path::Path;

use crate::constants::{BUILT_DIR, PAGES_DIR, TESTS_DIR};
use crate::core::commands::{CommandDescriptor, Invocation, action};
use crate::core::plugin::{Plugin, PluginContext};
use crate::models::{Env, ProjectConfig};
use crate::project::config::layer_path;
use crate::project::files::{ProjectFile, write_atomic};
use crate::project::structure::{gitignores, render_ignore_file};

pub struct EnsureProjectFilesPlugin;

#[async_trait]
impl Plugin for EnsureProjectFilesPlugin {
    fn id(&self) -> &str {
        "ensure-project-files"
    }

    async fn init(&self, ctx: &mut PluginContext<'_>) -> anyhow::Result<()> {
        let config = ctx.project_config(Env::Local).clone();
        for file in project_files(ctx.project_root(), &config) {
            ctx.add_project_file(file);
        }

        ctx.commands().register_command(
            CommandDescriptor::new("init", action(run_init))
                .description(t!("cmd.init.description"))
                .option("-y, --yes", t!("cmd.init.opt.yes"))
                .option("-t, --title <title>", t!("cmd.init.opt.title")),
        )?;
        Ok(())
    }
}

/// Files this plugin keeps in shape. The home page is only added when the
/// project has neither an `index.tsx` nor an `index.md` page.
pub fn project_files(root: &Path, config: &ProjectConfig) -> Vec<ProjectFile> {
    let mut files = vec![
        ProjectFile::fixed(".gitignore", render_ignore_file(&gitignores(config))),
        ProjectFile::json(
            "tsconfig.json",
            json!({
                "compilerOptions": {
                    "module": "esnext",
                    "moduleResolution": "node",
                    "strict": true,
                    "strictNullChecks": false,
                    "jsx": "react",
                    "target": "esnext",
                    "experimentalDecorators": true,
                    "skipLibCheck": true,
                    "outDir": BUILT_DIR,
                    "rootDir": "./",
                    "lib": ["dom", "es5", "es6", "scripthost"]
                },
                "include": [".temp/**/*", "src/**/*", "config/**/*", "tests/**/*"],
                "exclude": ["node_modules", BUILT_DIR, "lib"]
            }),
        ),
        ProjectFile::json(
            ".vscode/settings.json",
            json!({
                "editor.formatOnPaste": true,
                "editor.formatOnType": true,
                "editor.formatOnSave": true,
                "typescript.tsdk": "node_modules/typescript/lib"
            }),
        ),
        ProjectFile::json(
            ".prettierrc",
            json!({
                "bracketSpacing": true,
                "printWidth": 120,
                "proseWrap": "never",
                "requirePragma": false,
                "semi": true,
                "singleQuote": true,
                "tabWidth": 2,
                "trailingComma": "none",
                "useTabs": false,
                "overrides": [{ "files": "*.json", "options": { "printWidth": 200 } }]
            }),
        ),
        ProjectFile::json(
            "tslint.json",
            json!({
                "extends": ["tslint:latest", "tslint-config-prettier"],
                "defaultSeverity": "error",
                "rules": {
                    "object-literal-sort-keys": false,
                    "max-classes-per-file": [true, 5],
                    "no-implicit-dependencies": false,
                    "no-submodule-imports": false,
                    "no-empty": false
                }
            }),
        ),
        ProjectFile::merged_json(
            "package.json",
            json!({
                "scripts": {
                    "start": "pri",
                    "build": "pri build",
                    "test": "pri test"
                }
            }),
        ),
        ProjectFile::new(format!("{}/index.ts", TESTS_DIR), |prev| {
            Ok(if prev.is_empty() {
                EXAMPLE_TEST.to_string()
            } else {
                prev.to_string()
            })
        }),
    ];

    let pages = root.join(PAGES_DIR);
    if !pages.join("index.tsx").exists() && !pages.join("index.md").exists() {
        files.push(ProjectFile::fixed(format!("{}/index.tsx", PAGES_DIR), HOME_PAGE));
    }
    files
}

async fn run_init(invocation: Invocation) -> anyhow::Result<()> {
    let project = &invocation.project;
    println!("{}", format_args!(t!("init.start"), path = project.root().display()));

    super::print_ensure_reports(&invocation.host.ensure_project_files(project)?);

    let config_path = layer_path(project.root(), None);
    if config_path.exists() {
        println!(
            "{}",
            format_args!(t!("init.config_exists"), path = config_path.display()).to_string().yellow()
        );
    } else {
        let title = resolve_title(&invocation, project.root())?;
        let config = ProjectConfig {
            title,
            ..ProjectConfig::default()
        };
        let content = toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
        write_atomic(&config_path, &content)
            .with_context(|| format!("Failed to write '{}'", config_path.display()))?;
    }

    println!("\n{} {}", t!("common.success").green().bold(), t!("init.done"));
    Ok(())
}

fn resolve_title(invocation: &Invocation, root: &Path) -> anyhow::Result<String> {
    if let Some(title) = invocation.options.value("title") {
        return Ok(title.to_string());
    }

    let suggested = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ProjectConfig::default().title);
    if invocation.options.is_set("yes") {
        return Ok(suggested);
    }

    Input::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("init.prompt.title"))
        .default(suggested)
        .interact_text()
        .context("Failed to read the project title")
}

const EXAMPLE_TEST: &str = r#"import test from "ava";

test("Example", t => {
  t.true(true);
});
"#;

const HOME_PAGE: &str = r#"import { env } from "pri/client";
import * as React from "react";

export default class Page extends React.PureComponent {
  public render() {
    return (
      <div>
        <h1 style={{ display: "flex", alignItems: "center", justifyContent: "center" }}>
          Welcome to pri!
        </h1>
        <p style={{ padding: "10 50px" }}>
          Current env: {env.isLocal && "local"}{env.isProd && "prod"}
        </p>
      </div>
    );
  }
}
"#;
