//! Master node: wait for every worker's SSH daemon, open the rendezvous
//! socket, run mpirun to completion.

use crate::context::NodeContext;
use crate::error::TrainingResult;
use crate::events::CoordinationEvent;
use crate::mpi::MpiCommand;
use crate::poller::{wait_for_hosts, RetryPolicy};
use crate::process::run_checked;
use crate::rendezvous::RendezvousListener;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterPhase {
    WaitForWorkers,
    OpenRendezvous,
    LaunchMpi,
    Done,
}

#[derive(Debug)]
pub struct MasterCoordinator<'a> {
    ctx: NodeContext<'a>,
}

impl<'a> MasterCoordinator<'a> {
    #[must_use]
    pub fn new(ctx: NodeContext<'a>) -> Self {
        Self { ctx }
    }

    fn enter(&self, phase: MasterPhase) {
        self.ctx.emit(CoordinationEvent::Master { host: self.ctx.env.current_host.clone(), phase });
    }

    pub async fn run(&self) -> TrainingResult<()> {
        let env = self.ctx.env;
        let config = self.ctx.config;

        // Build first: a bad hyperparameter must fail before workers see MPI start.
        let command = MpiCommand::for_environment(env, config)?;

        self.enter(MasterPhase::WaitForWorkers);
        let workers = env.other_hosts();
        let policy = RetryPolicy::bounded(config.ssh_wait_interval(), config.ssh_wait_timeout());
        wait_for_hosts(self.ctx.prober, &workers, config.ssh_port, &policy, "waiting for worker SSH daemons")
            .await?;

        self.enter(MasterPhase::OpenRendezvous);
        let rendezvous = RendezvousListener::open(&env.current_host, config.rendezvous_port).await?;

        self.enter(MasterPhase::LaunchMpi);
        info!(mpi_command = %command, "Launching MPI");
        let result = run_checked(self.ctx.launcher, &command.command_spec()).await;
        rendezvous.close().await;

        match result {
            Ok(()) => {
                self.enter(MasterPhase::Done);
                info!(host = %env.current_host, "MPI finished on all nodes");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "MPI run failed");
                Err(e)
            }
        }
    }
}
