// src/plugins/command_build.rs

use anyhow::bail;
use async_trait::async_trait;
use colored::Colorize;

use super::prepare;
use crate::core::commands::{CommandDescriptor, Invocation, action};
use crate::core::plugin::{Plugin, PluginContext};
use crate::models::Env;
use crate::project::builder::{BuildRequest, Bundler, ProcessBundler};
use crate::project::html::generate_static_html;

pub struct CommandBuildPlugin;

#[async_trait]
impl Plugin for CommandBuildPlugin {
    fn id(&self) -> &str {
        "command-build"
    }

    async fn init(&self, ctx: &mut PluginContext<'_>) -> anyhow::Result<()> {
        ctx.commands().register_command(
            CommandDescriptor::new("build", action(run_build))
                .description(t!("cmd.build.description")),
        )?;
        Ok(())
    }
}

async fn run_build(invocation: Invocation) -> anyhow::Result<()> {
    build_with(&ProcessBundler, &invocation).await
}

/// Production build through `bundler`, followed by the static HTML shells.
pub async fn build_with(bundler: &dyn Bundler, invocation: &Invocation) -> anyhow::Result<()> {
    let env = Env::Prod;
    let prepared = prepare(invocation, env)?;
    let config = invocation.project.config(env).clone();

    let request = BuildRequest {
        project_root: invocation.project.root().to_path_buf(),
        env,
        command_line: config.bundler.build.clone(),
        config,
        entry_path: prepared.entry_path,
        hash: prepared.hash,
        port: None,
    };
    println!(
        "{}",
        format_args!(
            t!("build.starting"),
            command = request.command_line.cyan(),
            hash = request.hash
        )
    );

    let outcome = bundler.build(&request).await?;
    if !outcome.success {
        bail!(t!("build.failed"));
    }

    let written = generate_static_html(
        invocation.project.root(),
        &request.config,
        &prepared.analyse_info,
        &outcome,
    )?;
    println!(
        "{} {}",
        t!("common.success").green().bold(),
        format_args!(t!("build.done"), count = written.len(), dist = outcome.dist_dir.display())
    );
    Ok(())
}
