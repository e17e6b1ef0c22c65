// src/plugins/command_dev.rs

use anyhow::{Context, bail};
use async_trait::async_trait;
use colored::Colorize;

use super::prepare;
use crate::core::commands::{CommandDescriptor, Invocation, action};
use crate::core::plugin::{Plugin, PluginContext};
use crate::models::Env;
use crate::project::builder::{BuildRequest, Bundler, ProcessBundler};

pub struct CommandDevPlugin;

#[async_trait]
impl Plugin for CommandDevPlugin {
    fn id(&self) -> &str {
        "command-dev"
    }

    async fn init(&self, ctx: &mut PluginContext<'_>) -> anyhow::Result<()> {
        ctx.commands().register_command(
            CommandDescriptor::new("dev", action(run_dev))
                .description(t!("cmd.dev.description"))
                .option("-p, --port <port>", t!("cmd.dev.opt.port"))
                .default_command(),
        )?;
        Ok(())
    }
}

/// Parses the `--port` option, if given.
pub fn port_option(invocation: &Invocation) -> anyhow::Result<Option<u16>> {
    invocation
        .options
        .value("port")
        .map(|raw| {
            raw.parse::<u16>()
                .with_context(|| format!("Invalid port '{}'", raw))
        })
        .transpose()
}

async fn run_dev(invocation: Invocation) -> anyhow::Result<()> {
    let env = Env::Local;
    let port = port_option(&invocation)?;
    let prepared = prepare(&invocation, env)?;
    let config = invocation.project.config(env).clone();

    let request = BuildRequest {
        project_root: invocation.project.root().to_path_buf(),
        env,
        command_line: config.bundler.dev.clone(),
        config,
        entry_path: prepared.entry_path,
        hash: prepared.hash,
        port,
    };
    println!(
        "{}",
        format_args!(t!("dev.starting"), command = request.command_line.cyan())
    );

    let outcome = ProcessBundler.build(&request).await?;
    if !outcome.success {
        bail!(t!("dev.failed"));
    }
    Ok(())
}
