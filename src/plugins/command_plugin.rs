// src/plugins/command_plugin.rs

//! `plugin-init`: scaffolds a plugin package in the current project.

use async_trait::async_trait;
use colored::Colorize;
use serde_json::json;
use std::path::Path;

use crate::constants::BUILT_DIR;
use crate::core::commands::{CommandDescriptor, Invocation, action};
use crate::core::plugin::{Plugin, PluginContext};
use crate::models::{Env, ProjectConfig};
use crate::project::files::{EnsureReport, EnsureStatus, ProjectFile, ensure_files};
use crate::project::structure::{npmignores, render_ignore_file};

pub struct CommandPluginPlugin;

#[async_trait]
impl Plugin for CommandPluginPlugin {
    fn id(&self) -> &str {
        "command-plugin"
    }

    async fn init(&self, ctx: &mut PluginContext<'_>) -> anyhow::Result<()> {
        ctx.commands().register_command(
            CommandDescriptor::new("plugin-init", action(run_plugin_init))
                .description(t!("cmd.plugin.description")),
        )?;
        Ok(())
    }
}

async fn run_plugin_init(invocation: Invocation) -> anyhow::Result<()> {
    let root = invocation.project.root();
    let reports = scaffold_plugin(root, invocation.project.config(Env::Local))?;
    super::print_ensure_reports(&reports);
    println!(
        "\n{} {}",
        t!("common.success").green().bold(),
        format_args!(t!("plugin.done"), path = root.display())
    );
    Ok(())
}

/// Writes the plugin package files. The entry, methods and test files are
/// only created when missing.
pub fn scaffold_plugin(root: &Path, config: &ProjectConfig) -> anyhow::Result<Vec<EnsureReport>> {
    let mut files = vec![
        ProjectFile::fixed(".npmignore", render_ignore_file(&npmignores(config))),
        ProjectFile::merged_json(
            "package.json",
            json!({
                "types": "src/index.ts",
                "main": format!("{}/src/index.js", BUILT_DIR),
                "scripts": {
                    "start": "pri plugin-watch",
                    "prepublishOnly": "pri plugin-build",
                    "release": "npm publish",
                    "test": "pri plugin-test"
                },
                "devDependencies": { "pri": "*" }
            }),
        ),
    ];

    let mut skipped = Vec::new();
    for (file_name, template) in [
        ("src/index.tsx", PLUGIN_ENTRY),
        ("src/methods.ts", PLUGIN_METHODS),
        ("tests/index.ts", PLUGIN_TEST),
    ] {
        if root.join(file_name).exists() {
            println!("{} {}", "✔".green(), format_args!(t!("plugin.exists"), file = file_name));
            skipped.push(EnsureReport {
                file_name: file_name.to_string(),
                status: EnsureStatus::Unchanged,
            });
        } else {
            files.push(ProjectFile::fixed(file_name, template));
        }
    }

    let mut reports = ensure_files(root, &files)?;
    reports.extend(skipped);
    Ok(reports)
}

const PLUGIN_ENTRY: &str = r#"import { pri } from "pri";
import { judgeHasComponents } from "./methods";

export default async (instance: typeof pri) => {
  const projectRootPath = instance.project.getProjectRootPath();

  instance.commands.registerCommand({
    name: "deploy",
    action: async () => {
      //
    }
  });

  instance.project.onAnalyseProject(files => {
    return { customPlugin: { hasComponents: judgeHasComponents(projectRootPath, files) } };
  });
};
"#;

const PLUGIN_METHODS: &str = r#"import * as path from "path";

export function judgeHasComponents(projectRootPath: string, files: path.ParsedPath[]) {
  return files.some(file => {
    const relativePath = path.relative(projectRootPath, path.join(file.dir, file.name));
    return relativePath.startsWith("src/components");
  });
}
"#;

const PLUGIN_TEST: &str = r#"import test from "ava";
import { judgeHasComponents } from "../src/methods";

test("hasn't components", t => {
  t.false(judgeHasComponents("/workspace", []));
});
"#;
