//! Worker node: start sshd so mpirun can reach this host, then follow the
//! master's rendezvous socket: reachable means MPI started, unreachable again
//! means MPI finished.

use crate::context::NodeContext;
use crate::error::{TrainingError, TrainingResult};
use crate::events::CoordinationEvent;
use crate::poller::{endpoint_timeout, poll_until, wait_until_unreachable, RetryPolicy};
use crate::process::{BackgroundProcess, CommandSpec};
use crate::role::master_of;
use serde::{Deserialize, Serialize};
use smchainer_core::Host;
use std::process::ExitStatus;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPhase {
    StartSshd,
    WaitMpiStart,
    WaitMpiStop,
    Done,
}

#[derive(Debug)]
pub struct WorkerCoordinator<'a> {
    ctx: NodeContext<'a>,
}

impl<'a> WorkerCoordinator<'a> {
    #[must_use]
    pub fn new(ctx: NodeContext<'a>) -> Self {
        Self { ctx }
    }

    fn enter(&self, phase: WorkerPhase) {
        self.ctx.emit(CoordinationEvent::Worker { host: self.ctx.env.current_host.clone(), phase });
    }

    pub async fn run(&self) -> TrainingResult<()> {
        let env = self.ctx.env;
        let config = self.ctx.config;
        let master = master_of(&env.hosts)?.clone();

        self.enter(WorkerPhase::StartSshd);
        let sshd = CommandSpec::new(config.sshd_program.clone()).arg("-D");
        let mut daemon = self.ctx.launcher.spawn_background(&sshd).await?;

        self.enter(WorkerPhase::WaitMpiStart);
        debug!(host = %env.current_host, master = %master, "Worker is waiting for MPI to start");
        self.wait_for_mpi_start(&master, &mut daemon).await?;
        info!(host = %env.current_host, "MPI started training process on worker node");

        self.enter(WorkerPhase::WaitMpiStop);
        let stop_policy = RetryPolicy::forever(config.mpi_stop_interval());
        wait_until_unreachable(
            self.ctx.prober,
            &master,
            config.rendezvous_port,
            &stop_policy,
            "waiting for MPI to finish on the master",
        )
        .await?;
        info!(host = %env.current_host, "Training process started by MPI on worker node stopped");

        match daemon.try_exit_status() {
            Ok(Some(status)) if !status.success() => {
                warn!(program = daemon.program(), status = %status, "SSH daemon exited with failure during training");
            }
            Ok(_) => {}
            Err(e) => warn!(program = daemon.program(), error = %e, "Could not check SSH daemon status"),
        }

        self.enter(WorkerPhase::Done);
        Ok(())
    }

    /// Poll the master's rendezvous port until it opens, failing fast if the
    /// SSH daemon dies first: without it mpirun can never reach this host.
    async fn wait_for_mpi_start(&self, master: &Host, daemon: &mut BackgroundProcess) -> TrainingResult<()> {
        let config = self.ctx.config;
        let prober = self.ctx.prober;
        let port = config.rendezvous_port;
        let policy = RetryPolicy::bounded(config.mpi_start_interval(), config.mpi_start_timeout());
        let phase = "waiting for MPI to start on the master";

        let outcome = poll_until(
            || {
                let daemon_failure = match daemon.try_exit_status() {
                    Ok(Some(status)) if !status.success() => Some(status),
                    Ok(_) => None,
                    Err(e) => {
                        warn!(program = daemon.program(), error = %e, "Could not check SSH daemon status");
                        None
                    }
                };
                async move {
                    if let Some(status) = daemon_failure {
                        return DaemonWatch::Exited(status);
                    }
                    if prober.can_connect(master.as_str(), port).await {
                        DaemonWatch::MpiStarted
                    } else {
                        DaemonWatch::Waiting
                    }
                }
            },
            |watch| !matches!(watch, DaemonWatch::Waiting),
            &policy,
        )
        .await
        .map_err(|timeout| endpoint_timeout(phase, master, port, &timeout))?;

        match outcome {
            DaemonWatch::Exited(status) => {
                error!(program = daemon.program(), status = %status, "SSH daemon exited before MPI started");
                Err(TrainingError::ChildProcessFailure { program: daemon.program().to_string(), status })
            }
            DaemonWatch::MpiStarted | DaemonWatch::Waiting => Ok(()),
        }
    }
}

/// One observation while waiting for MPI to start.
enum DaemonWatch {
    Waiting,
    MpiStarted,
    Exited(ExitStatus),
}
