//! Distributed training bootstrap for the Chainer container.
//!
//! Every node runs the same program. With one host (or `use_mpi` off) the
//! training procedure runs in-process. Otherwise the lexicographically
//! smallest host becomes master and launches `mpirun`; every other host starts
//! an SSH daemon and follows the master's rendezvous socket until MPI exits.
//!
//! ```text
//! master                          worker
//! ------                          ------
//! wait for sshd on workers  <---  start sshd
//! open rendezvous socket    --->  wait until reachable
//! run mpirun to completion
//! close rendezvous socket   --->  wait until unreachable
//! ```

pub mod context;
pub mod error;
pub mod events;
pub mod master;
pub mod mpi;
pub mod poller;
pub mod probe;
pub mod process;
pub mod rendezvous;
pub mod role;
pub mod runner;
pub mod trainer;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use context::NodeContext;
pub use error::{TrainingError, TrainingResult};
pub use events::{CoordinationEvent, EventSink, TracingEventSink};
pub use master::{MasterCoordinator, MasterPhase};
pub use mpi::{use_mpi, MpiCommand, ProcessLayout};
pub use poller::{poll_until, wait_for_hosts, wait_until_reachable, wait_until_unreachable, PollTimeout, RetryPolicy};
pub use probe::{can_connect, Prober, TcpProber};
pub use process::{run_checked, BackgroundProcess, CommandSpec, ProcessLauncher, TokioLauncher};
pub use rendezvous::RendezvousListener;
pub use role::{master_of, resolve_role, NodeRole};
pub use runner::{run_single_node, run_training, TrainingOutcome};
pub use trainer::{CommandTrainer, TrainedModel, Trainer, DEFAULT_MODEL_FILE};
pub use worker::{WorkerCoordinator, WorkerPhase};
