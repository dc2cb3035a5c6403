use crate::error::{TrainingError, TrainingResult};
use crate::process::{CommandSpec, ProcessLauncher};
use async_trait::async_trait;
use smchainer_core::TrainingEnvironment;
use std::path::{Path, PathBuf};
use tracing::info;

/// File the default `save` hook writes into the model directory.
pub const DEFAULT_MODEL_FILE: &str = "model.npz";

/// Serialized model returned by a training procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainedModel {
    pub bytes: Vec<u8>,
}

/// A user training procedure.
///
/// `train` may hand back a model; when it does, `save` persists it. Override
/// `save` to control persistence; the default writes `model.npz` into the
/// model directory.
#[async_trait]
pub trait Trainer: Send + Sync {
    fn id(&self) -> &'static str;

    async fn train(&self, env: &TrainingEnvironment) -> TrainingResult<Option<TrainedModel>>;

    async fn save(&self, model: &TrainedModel, model_dir: &Path) -> TrainingResult<PathBuf> {
        let path = model_dir.join(DEFAULT_MODEL_FILE);
        tokio::fs::write(&path, &model.bytes).await?;
        Ok(path)
    }
}

/// Runs the training entry command as a child process.
///
/// The script reads the container layout itself and writes its own model, so
/// there is nothing for `save` to persist.
#[derive(Debug, Clone)]
pub struct CommandTrainer<L> {
    command: CommandSpec,
    launcher: L,
}

impl<L: ProcessLauncher> CommandTrainer<L> {
    #[must_use]
    pub fn new(command: CommandSpec, launcher: L) -> Self {
        Self { command, launcher }
    }
}

#[async_trait]
impl<L: ProcessLauncher> Trainer for CommandTrainer<L> {
    fn id(&self) -> &'static str {
        "command"
    }

    async fn train(&self, env: &TrainingEnvironment) -> TrainingResult<Option<TrainedModel>> {
        info!(host = %env.current_host, command = %self.command, "Invoking training script");
        let status = self.launcher.run(&self.command).await?;
        if !status.success() {
            return Err(TrainingError::ChildProcessFailure { program: self.command.program.clone(), status });
        }
        Ok(None)
    }
}
