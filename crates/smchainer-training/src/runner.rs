//! Training entry point: run the user's procedure directly on one node, or
//! take part in the MPI protocol as master or worker.

use crate::context::NodeContext;
use crate::error::TrainingResult;
use crate::events::CoordinationEvent;
use crate::master::MasterCoordinator;
use crate::mpi::use_mpi;
use crate::process::{run_checked, CommandSpec};
use crate::role::{resolve_role, NodeRole};
use crate::trainer::Trainer;
use crate::worker::WorkerCoordinator;
use serde::{Deserialize, Serialize};
use smchainer_core::TrainingEnvironment;
use tracing::info;

/// Which path a node took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum TrainingOutcome {
    SingleNode { model_saved: bool },
    Master,
    Worker,
}

pub async fn run_training(ctx: NodeContext<'_>, trainer: &dyn Trainer) -> TrainingResult<TrainingOutcome> {
    let env = ctx.env;

    if !use_mpi(&env.hyperparameters, env.host_count())? {
        ctx.emit(CoordinationEvent::SingleNode { host: env.current_host.clone() });
        return run_single_node(env, trainer).await;
    }

    let role = resolve_role(&env.current_host, &env.hosts)?;
    info!(host = %env.current_host, role = %role, hosts = ?env.host_names(), "Starting distributed training");
    change_hostname(ctx).await?;

    match role {
        NodeRole::Master => {
            MasterCoordinator::new(ctx).run().await?;
            Ok(TrainingOutcome::Master)
        }
        NodeRole::Worker => {
            WorkerCoordinator::new(ctx).run().await?;
            Ok(TrainingOutcome::Worker)
        }
    }
}

/// Invoke the trainer in-process and persist whatever model it returns.
pub async fn run_single_node(env: &TrainingEnvironment, trainer: &dyn Trainer) -> TrainingResult<TrainingOutcome> {
    info!(trainer = trainer.id(), host = %env.current_host, "Running training on a single node");
    let Some(model) = trainer.train(env).await? else {
        return Ok(TrainingOutcome::SingleNode { model_saved: false });
    };

    let model_dir = env.layout.model_dir();
    tokio::fs::create_dir_all(&model_dir).await?;
    let path = trainer.save(&model, &model_dir).await?;
    info!(path = %path.display(), "Model saved");
    Ok(TrainingOutcome::SingleNode { model_saved: true })
}

/// Rewrite this machine's hostname to its host identifier; MPI resolves ranks by it.
async fn change_hostname(ctx: NodeContext<'_>) -> TrainingResult<()> {
    let command = CommandSpec::new(ctx.config.change_hostname_program.clone()).arg(ctx.env.current_host.as_str());
    run_checked(ctx.launcher, &command).await
}
