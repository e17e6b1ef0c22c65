// src/system/executor.rs

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::{Child, Command};

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{command}' exited with a non-zero error code{}.", .code.map(|c| format!(" ({})", c)).unwrap_or_default())]
    NonZeroExitStatus { command: String, code: Option<i32> },
    #[error("Command '{command}' was interrupted.")]
    Interrupted { command: String },
}

/// Runs an external command line to completion, inheriting stdio.
///
/// A leading `-` ignores a non-zero exit status. Ctrl+C kills the child and
/// yields [`ExecutionError::Interrupted`].
pub async fn execute_command(
    command_line: &str,
    cwd: &Path,
    env_vars: &HashMap<String, String>,
) -> Result<(), ExecutionError> {
    let trimmed_command = command_line.trim();
    let (final_command_line, ignore_errors) = match trimmed_command.strip_prefix('-') {
        Some(rest) => (rest.trim(), true),
        None => (trimmed_command, false),
    };
    if final_command_line.is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }

    let parts = shlex::split(final_command_line)
        .ok_or_else(|| ExecutionError::CommandParse(final_command_line.to_string()))?;
    let Some((program, args)) = parts.split_first() else {
        return Err(ExecutionError::EmptyCommand);
    };
    let clean_cwd = dunce::simplified(cwd);

    log::debug!("Executing '{}' in '{}'", final_command_line, clean_cwd.display());
    let mut child = match spawn(Command::new(program).args(args), clean_cwd, env_vars) {
        Ok(child) => child,
        // Windows built-ins like `echo` only exist inside `cmd`.
        Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") => {
            log::debug!("Command '{}' not found. Retrying with cmd /C.", program);
            spawn(
                Command::new("cmd").arg("/C").arg(final_command_line),
                clean_cwd,
                env_vars,
            )
            .map_err(|e| ExecutionError::CommandFailed(final_command_line.to_string(), e))?
        }
        Err(e) => {
            return Err(ExecutionError::CommandFailed(final_command_line.to_string(), e));
        }
    };

    let status = wait_or_interrupt(&mut child, final_command_line).await?;
    if !status.success() && !ignore_errors {
        return Err(ExecutionError::NonZeroExitStatus {
            command: final_command_line.to_string(),
            code: status.code(),
        });
    }
    Ok(())
}

fn spawn(
    command: &mut Command,
    cwd: &Path,
    env_vars: &HashMap<String, String>,
) -> std::io::Result<Child> {
    command
        .current_dir(cwd)
        .envs(env_vars)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
}

async fn wait_or_interrupt(child: &mut Child, command_line: &str) -> Result<ExitStatus, ExecutionError> {
    tokio::select! {
        status = child.wait() => {
            status.map_err(|e| ExecutionError::CommandFailed(command_line.to_string(), e))
        }
        _ = tokio::signal::ctrl_c() => {
            log::debug!("Ctrl+C received, killing child process {:?}...", child.id());
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill child process {:?}: {}", child.id(), e);
            }
            Err(ExecutionError::Interrupted {
                command: command_line.to_string(),
            })
        }
    }
}
