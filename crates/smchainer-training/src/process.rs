//! Child processes: the hostname script, the SSH daemon, mpirun and the
//! training entry command. Exit codes are the only signal read back.

use crate::error::{TrainingError, TrainingResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::ExitStatus;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// A program and its arguments, without any shell interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build from a non-empty argv; `None` when `argv` is empty.
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A process left running in the background.
#[derive(Debug)]
pub struct BackgroundProcess {
    program: String,
    child: Option<Child>,
}

impl BackgroundProcess {
    /// A handle with no child attached, for launchers that do not own the process.
    #[must_use]
    pub fn detached(program: String) -> Self {
        Self { program, child: None }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Exit status if the process has already terminated.
    pub fn try_exit_status(&mut self) -> TrainingResult<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => Ok(child.try_wait()?),
            None => Ok(None),
        }
    }
}

#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run to completion, inheriting stdio.
    async fn run(&self, command: &CommandSpec) -> TrainingResult<ExitStatus>;

    /// Start without waiting; the process is not supervised afterwards.
    async fn spawn_background(&self, command: &CommandSpec) -> TrainingResult<BackgroundProcess>;
}

/// Launcher backed by `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct TokioLauncher;

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn run(&self, command: &CommandSpec) -> TrainingResult<ExitStatus> {
        info!(command = %command, "Running");
        let status = Command::new(&command.program).args(&command.args).status().await.map_err(|e| {
            TrainingError::Other(anyhow::anyhow!("failed to start {}: {}", command.program, e))
        })?;
        Ok(status)
    }

    async fn spawn_background(&self, command: &CommandSpec) -> TrainingResult<BackgroundProcess> {
        info!(command = %command, "Starting in background");
        let child = Command::new(&command.program).args(&command.args).spawn().map_err(|e| {
            TrainingError::Other(anyhow::anyhow!("failed to start {}: {}", command.program, e))
        })?;
        Ok(BackgroundProcess { program: command.program.clone(), child: Some(child) })
    }
}

/// Run a command and turn a non-zero exit into `ChildProcessFailure`.
pub async fn run_checked(launcher: &dyn ProcessLauncher, command: &CommandSpec) -> TrainingResult<()> {
    let status = launcher.run(command).await?;
    if status.success() {
        Ok(())
    } else {
        warn!(command = %command, status = %status, "Child process failed");
        Err(TrainingError::ChildProcessFailure { program: command.program.clone(), status })
    }
}
