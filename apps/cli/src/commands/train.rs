//! Train command implementation.

use anyhow::Context;
use smchainer_core::{CoordinationConfig, TrainingEnvironment};
use smchainer_training::{
    CommandSpec, CommandTrainer, NodeContext, TcpProber, TokioLauncher, TracingEventSink, run_training,
};
use tracing::info;

/// Execute the train command.
///
/// Runs the entry command directly on a single node, or takes part in the
/// MPI protocol when the job spans several hosts.
pub async fn execute(env: &TrainingEnvironment, config: &CoordinationConfig) -> anyhow::Result<()> {
    env.layout.ensure_output_dirs().context("preparing output directories")?;

    let entry = CommandSpec::from_argv(&config.entry_command).context("entry command is empty")?;
    let launcher = TokioLauncher::default();
    let prober = TcpProber::new(config.probe_timeout());
    let trainer = CommandTrainer::new(entry, launcher.clone());
    let ctx = NodeContext::new(env, config, &prober, &launcher, &TracingEventSink);

    info!(
        host = %env.current_host,
        hosts = ?env.host_names(),
        gpus = env.available_gpus,
        "Starting training"
    );
    let outcome = run_training(ctx, &trainer).await.context("training failed")?;
    info!(outcome = ?outcome, "Training finished");
    Ok(())
}
