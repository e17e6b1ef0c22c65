// src/core/dispatcher.rs

//! Runs a resolved command chain: before steps, primary action, after steps.
//!
//! Every step is awaited before the next one starts. The first failing step
//! terminates the run; nothing after it executes.

use std::fmt;
use thiserror::Error;

use super::commands::{CommandTable, ResolvedCommand, Step};
use super::commands::Invocation;

/// Which part of a chain a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Before,
    Primary,
    After,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "before",
            Self::Primary => "primary",
            Self::After => "after",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Where a dispatch currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Resolving,
    Running(Stage),
    Terminated(Outcome),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown command '{name}'.")]
    UnknownCommand { name: String },
    #[error("No command given and no default command is registered.")]
    NoDefaultCommand,
    #[error("Command '{command}' failed in a {stage} step of plugin '{plugin}': {source}")]
    CommandStep {
        command: String,
        stage: Stage,
        plugin: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// Process exit code for this failure: `2` for usage errors, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownCommand { .. } | Self::NoDefaultCommand => 2,
            Self::CommandStep { .. } => 1,
        }
    }
}

/// Resolves and runs commands from a sealed [`CommandTable`].
#[derive(Debug)]
pub struct Dispatcher<'t> {
    commands: &'t CommandTable,
    state: DispatchState,
    history: Vec<DispatchState>,
}

impl<'t> Dispatcher<'t> {
    pub fn new(commands: &'t CommandTable) -> Self {
        Self {
            commands,
            state: DispatchState::Idle,
            history: vec![DispatchState::Idle],
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[DispatchState] {
        &self.history
    }

    fn transition(&mut self, next: DispatchState) {
        log::debug!("Dispatch: {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Runs `name`, or the default command when `name` is `None`.
    pub async fn dispatch(
        &mut self,
        name: Option<&str>,
        mut invocation: Invocation,
    ) -> Result<(), DispatchError> {
        self.transition(DispatchState::Resolving);
        let command = match self.resolve(name) {
            Ok(command) => command,
            Err(e) => {
                self.transition(DispatchState::Terminated(Outcome::Failure));
                return Err(e);
            }
        };
        invocation.command = command.name.clone();

        let result = self.run_chain(command, &invocation).await;
        let outcome = if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        self.transition(DispatchState::Terminated(outcome));
        result
    }

    fn resolve(&self, name: Option<&str>) -> Result<&'t ResolvedCommand, DispatchError> {
        match name {
            Some(name) => self
                .commands
                .get(name)
                .ok_or_else(|| DispatchError::UnknownCommand {
                    name: name.to_string(),
                }),
            None => self
                .commands
                .default_command()
                .ok_or(DispatchError::NoDefaultCommand),
        }
    }

    async fn run_chain(
        &mut self,
        command: &ResolvedCommand,
        invocation: &Invocation,
    ) -> Result<(), DispatchError> {
        self.transition(DispatchState::Running(Stage::Before));
        for step in &command.before {
            run_step(command, Stage::Before, step, invocation).await?;
        }

        self.transition(DispatchState::Running(Stage::Primary));
        let primary = Step {
            plugin: command.plugin.clone(),
            action: command.primary.clone(),
        };
        run_step(command, Stage::Primary, &primary, invocation).await?;

        self.transition(DispatchState::Running(Stage::After));
        for step in &command.after {
            run_step(command, Stage::After, step, invocation).await?;
        }
        Ok(())
    }
}

async fn run_step(
    command: &ResolvedCommand,
    stage: Stage,
    step: &Step,
    invocation: &Invocation,
) -> Result<(), DispatchError> {
    log::debug!(
        "Running {} step of '{}' from plugin '{}'",
        stage,
        command.name,
        step.plugin
    );
    (step.action)(invocation.clone())
        .await
        .map_err(|source| DispatchError::CommandStep {
            command: command.name.clone(),
            stage,
            plugin: step.plugin.clone(),
            source,
        })
}
