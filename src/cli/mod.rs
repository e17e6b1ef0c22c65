// src/cli/mod.rs

//! The `pri` command line: loads the project's plugins, then builds the
//! clap command tree from whatever they registered and dispatches into it.

use clap::error::ErrorKind;
use clap::{Arg, ArgMatches, Command, CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::core::commands::CommandTable;
use crate::core::dispatcher::DispatchError;
use crate::core::plugin::{PluginCatalog, PluginLoader};
use crate::core::options::ParsedOptions;
use crate::project::Project;
use crate::state::Registry;
use crate::system::executor::ExecutionError;

pub mod args;

/// Arguments known before any plugin is loaded.
///
/// Everything after `--cwd` is collected verbatim and parsed a second time
/// once the plugin commands exist.
#[derive(Parser, Debug)]
#[command(
    name = "pri",
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Project root. Defaults to the current directory.
    #[arg(long)]
    pub cwd: Option<String>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Usage(#[from] clap::Error),
    #[error("Cannot resolve project root '{path}'")]
    ProjectRoot {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn styles() -> clap::builder::Styles {
    use clap::builder::styling::AnsiColor;
    clap::builder::Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Yellow.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Green.on_default())
}

/// Expands `~` and environment variables, then canonicalizes.
fn resolve_root(cwd: Option<&str>) -> Result<PathBuf, CliError> {
    let raw = cwd.unwrap_or(".");
    let expanded = shellexpand::full(raw).map_or_else(|_| raw.to_string(), |e| e.into_owned());
    dunce::canonicalize(&expanded).map_err(|source| CliError::ProjectRoot {
        path: raw.to_string(),
        source,
    })
}

/// Rejects `--cwd` after the command name. It is only honoured before the
/// command, where it is known before the project's plugins load.
fn reject_late_cwd(cli: &Cli) -> Result<(), CliError> {
    let late = cli
        .args
        .iter()
        .take_while(|arg| *arg != "--")
        .any(|arg| arg == "--cwd" || arg.starts_with("--cwd="));
    if late {
        return Err(CliError::Usage(
            Cli::command().error(ErrorKind::ArgumentConflict, t!("cli.cwd_after_command")),
        ));
    }
    Ok(())
}

/// The full clap tree for the sealed command table.
pub fn build_command(table: &CommandTable) -> Command {
    let mut command = Command::new("pri")
        .about(t!("cli.about"))
        .version(env!("CARGO_PKG_VERSION"))
        .styles(styles())
        .disable_help_subcommand(true)
        .allow_external_subcommands(true)
        .external_subcommand_value_parser(clap::value_parser!(String))
        .arg(
            Arg::new("cwd")
                .long("cwd")
                .value_name("path")
                .help(t!("cli.opt.cwd")),
        );

    for (order, resolved) in table.iter().enumerate() {
        let mut about = resolved.description.clone().unwrap_or_default();
        if resolved.is_default {
            about = format!("{} {}", about, t!("cli.default_marker")).trim().to_string();
        }
        let mut sub = Command::new(resolved.name.clone())
            .about(about)
            .display_order(order);
        for (spec, option) in &resolved.options {
            sub = sub.arg(args::to_arg(spec, option));
        }
        command = command.subcommand(sub.arg(args::positional_arg()));
    }
    command
}

/// What the second parse produced: a command name (or none), its options
/// and its positional arguments.
fn invocation_parts(
    table: &CommandTable,
    matches: &ArgMatches,
) -> (Option<String>, ParsedOptions, Vec<String>) {
    match matches.subcommand() {
        Some((name, sub)) => match table.get(name) {
            Some(resolved) => (
                Some(name.to_string()),
                args::parsed_options(resolved, sub),
                args::positional(sub),
            ),
            // External subcommand: the dispatcher reports it as unknown.
            None => (Some(name.to_string()), ParsedOptions::new(), Vec::new()),
        },
        None => (None, ParsedOptions::new(), Vec::new()),
    }
}

/// Runs `pri` with `argv` (including the binary name) against `catalog`.
pub async fn run<I, T>(argv: I, catalog: &PluginCatalog) -> anyhow::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
    let cli = Cli::try_parse_from(&argv).map_err(CliError::Usage)?;
    log::debug!("Bootstrap arguments: {:?}", cli);
    reject_late_cwd(&cli)?;

    let root = resolve_root(cli.cwd.as_deref())?;
    let project = Arc::new(Project::load(&root)?);

    let mut registry = Registry::new();
    PluginLoader::new(catalog)
        .load_all(project.plugin_ids(), &project, &mut registry)
        .await?;
    let sealed = registry.seal();

    let mut command = build_command(&sealed.commands);
    let matches = match command.try_get_matches_from_mut(&argv) {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(());
        }
        Err(e) => return Err(CliError::Usage(e).into()),
    };

    let (name, options, positional) = invocation_parts(&sealed.commands, &matches);
    let invocation = sealed
        .invocation(project)
        .with_options(options)
        .with_args(positional);

    let mut dispatcher = sealed.dispatcher();
    match dispatcher.dispatch(name.as_deref(), invocation).await {
        Err(DispatchError::NoDefaultCommand) => {
            command.print_help()?;
            Err(DispatchError::NoDefaultCommand.into())
        }
        other => other.map_err(Into::into),
    }
}

/// Process exit code for an error returned by [`run`].
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    let interrupted = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ExecutionError>(),
            Some(ExecutionError::Interrupted { .. })
        )
    });
    if interrupted {
        return 130;
    }
    if let Some(dispatch) = err.downcast_ref::<DispatchError>() {
        return dispatch.exit_code();
    }
    if err.downcast_ref::<CliError>().is_some_and(|e| matches!(e, CliError::Usage(_))) {
        return 2;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commands::{CommandDescriptor, CommandExpansion, action};
    use crate::core::plugin::plugin_fn;
    use crate::plugins::builtin_catalog;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn project_with_plugins(plugins: &[&str]) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let list = plugins
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect::<Vec<_>>()
            .join(", ");
        let path = crate::project::config::layer_path(dir.path(), None);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("plugins = [{}]\n", list)).unwrap();
        dir
    }

    fn recording_catalog(log: Arc<Mutex<Vec<String>>>) -> PluginCatalog {
        let primary_log = log.clone();
        let after_log = log.clone();
        PluginCatalog::new()
            .with(plugin_fn("greeter", move |ctx| {
                let log = primary_log.clone();
                ctx.commands().register_command(
                    CommandDescriptor::new(
                        "greet",
                        action(move |inv| {
                            let log = log.clone();
                            async move {
                                let name = inv.options.value("name").unwrap_or("world").to_string();
                                log.lock().unwrap().push(format!("greet {} {:?}", name, inv.args));
                                Ok(())
                            }
                        }),
                    )
                    .option("-n, --name <name>", "who to greet")
                    .default_command(),
                )?;
                Ok(())
            }))
            .with(plugin_fn("farewell", move |ctx| {
                let log = after_log.clone();
                ctx.commands().expand_command(CommandExpansion::new("greet").after(action(
                    move |_| {
                        let log = log.clone();
                        async move {
                            log.lock().unwrap().push("bye".to_string());
                            Ok(())
                        }
                    },
                )));
                Ok(())
            }))
    }

    #[tokio::test]
    async fn test_run_dispatches_plugin_command_with_options() {
        let dir = project_with_plugins(&["greeter", "farewell"]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = recording_catalog(log.clone());
        let cwd = dir.path().to_string_lossy().to_string();

        run(["pri", "--cwd", &cwd, "greet", "-n", "ada", "extra"], &catalog)
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["greet ada [\"extra\"]".to_string(), "bye".to_string()]
        );
    }

    #[tokio::test]
    async fn test_run_without_command_uses_default() {
        let dir = project_with_plugins(&["greeter"]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = recording_catalog(log.clone());
        let cwd = dir.path().to_string_lossy().to_string();

        run(["pri", "--cwd", &cwd], &catalog).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["greet world []".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_command_exits_with_usage_code() {
        let dir = project_with_plugins(&["greeter"]);
        let catalog = recording_catalog(Arc::new(Mutex::new(Vec::new())));
        let cwd = dir.path().to_string_lossy().to_string();

        let err = run(["pri", "--cwd", &cwd, "deploy"], &catalog)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::UnknownCommand { .. })
        ));
        assert_eq!(exit_code_for(&err), 2);
    }

    #[tokio::test]
    async fn test_missing_required_value_is_a_usage_error() {
        let dir = project_with_plugins(&["greeter"]);
        let catalog = recording_catalog(Arc::new(Mutex::new(Vec::new())));
        let cwd = dir.path().to_string_lossy().to_string();

        let err = run(["pri", "--cwd", &cwd, "greet", "--name"], &catalog)
            .await
            .unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }

    #[tokio::test]
    async fn test_unknown_plugin_fails_before_dispatch() {
        let dir = project_with_plugins(&["greeter", "missing"]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = recording_catalog(log.clone());
        let cwd = dir.path().to_string_lossy().to_string();

        let err = run(["pri", "--cwd", &cwd, "greet"], &catalog).await.unwrap_err();
        assert!(format!("{:#}", err).contains("missing"));
        assert_eq!(exit_code_for(&err), 1);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cwd_after_command_is_rejected_before_loading() {
        let dir = project_with_plugins(&["greeter"]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = recording_catalog(log.clone());
        let cwd = dir.path().to_string_lossy().to_string();

        let err = run(["pri", "greet", "--cwd", &cwd], &catalog).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::Usage(_))));
        assert_eq!(exit_code_for(&err), 2);

        let err = run(["pri", "greet", &format!("--cwd={}", cwd)], &catalog)
            .await
            .unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_builtin_commands_in_help_tree() {
        let dir = tempdir().unwrap();
        let catalog = builtin_catalog();
        let mut registry = Registry::new();
        let project = Project::from_parts(
            dir.path().to_path_buf(),
            Default::default(),
            Default::default(),
        );
        let ids: Vec<String> = catalog.ids().into_iter().map(String::from).collect();
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(PluginLoader::new(&catalog).load_all(&ids, &project, &mut registry))
            .unwrap();

        let command = build_command(&registry.seal().commands);
        let names: Vec<&str> = command.get_subcommands().map(|c| c.get_name()).collect();
        for expected in ["init", "dev", "build", "test", "plugin-init"] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_interrupt_maps_to_130() {
        let err = anyhow::Error::new(ExecutionError::Interrupted {
            command: "sleep 10".to_string(),
        })
        .context("dev failed");
        assert_eq!(exit_code_for(&err), 130);
    }
}
