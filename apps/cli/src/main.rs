//! smchainer CLI - entry point of the Chainer training container
//!
//! Every node of a training job runs `smchainer train`. The same binary can
//! print the MPI command line or the elected role for debugging a cluster.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use smchainer_core::{ContainerLayout, CoordinationConfig, TrainingEnvironment};
use smchainer_training::TrainingError;
use std::path::PathBuf;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

/// Environment variable naming the container's base directory.
const BASE_DIR_ENV: &str = "SM_BASE_DIR";

/// Distributed training bootstrap for Chainer on SageMaker
#[derive(Parser, Debug)]
#[command(
    name = "smchainer",
    author,
    version,
    about = "Chainer training container entry point",
    long_about = "Runs the user's training script on one node, or coordinates a multi-node MPI job:\nthe first host alphabetically launches mpirun, every other host serves SSH until MPI finishes."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Container base directory (overrides SM_BASE_DIR, defaults to /opt/ml)
    #[arg(short, long, global = true)]
    base_dir: Option<PathBuf>,

    /// Coordination settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run training on this node (default)
    Train,

    /// Print the mpirun command line the master would launch
    MpiCommand {
        /// Print the argv as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Print this node's role and the elected master
    Role {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so `mpi-command` and `role` output stays parseable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let base_dir = args.base_dir.clone().or_else(|| std::env::var_os(BASE_DIR_ENV).map(PathBuf::from));
    let layout = base_dir.map(ContainerLayout::new).unwrap_or_default();
    let command = args.command.unwrap_or(Command::Train);

    if let Err(e) = run(command, &args, layout.clone()).await {
        let reason = format!("{e:#}");
        error!(error = %reason, "smchainer failed");
        if command == Command::Train {
            if let Err(write_err) = layout.write_failure(&reason) {
                error!(path = %layout.failure_path().display(), error = %write_err, "Could not write failure file");
            }
        }
        let code = e.downcast_ref::<TrainingError>().and_then(TrainingError::child_exit_code).unwrap_or(1);
        std::process::exit(if code == 0 { 1 } else { code });
    }

    Ok(())
}

async fn run(command: Command, args: &Args, layout: ContainerLayout) -> anyhow::Result<()> {
    let config = CoordinationConfig::load(args.config.as_deref()).context("loading coordination settings")?;
    let env = TrainingEnvironment::load(layout).context("loading training environment")?;

    match command {
        Command::Train => commands::train::execute(&env, &config).await,
        Command::MpiCommand { json } => commands::mpi_command::execute(&env, &config, json),
        Command::Role { json } => commands::role::execute(&env, json),
    }
}
