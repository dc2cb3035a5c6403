//! mpirun invocation for a distributed job.
//!
//! Pure: the same environment and settings always produce the same command.

use crate::error::{TrainingError, TrainingResult};
use crate::process::CommandSpec;
use smchainer_core::{CoordinationConfig, Host, Hyperparameters, TrainingEnvironment};

pub const USE_MPI: &str = "use_mpi";
pub const PROCESS_SLOTS_PER_HOST: &str = "process_slots_per_host";
pub const NUM_PROCESSES: &str = "num_processes";

/// Preloaded into every rank so MPI sees the rewritten hostname.
const CHANGE_HOSTNAME_LIBRARY: &str = "/libchangehostname.so";

/// Whether the job runs under MPI; defaults to "more than one host".
pub fn use_mpi(hyperparameters: &Hyperparameters, host_count: usize) -> TrainingResult<bool> {
    Ok(hyperparameters.get_bool(USE_MPI)?.unwrap_or(host_count > 1))
}

/// Process layout across the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessLayout {
    pub process_slots_per_host: usize,
    pub num_processes: usize,
}

impl ProcessLayout {
    /// Slots default to one per GPU (or one on CPU hosts); processes default
    /// to filling every slot on every host.
    pub fn resolve(
        hyperparameters: &Hyperparameters,
        available_gpus: usize,
        host_count: usize,
    ) -> TrainingResult<Self> {
        let process_slots_per_host = hyperparameters
            .get_usize(PROCESS_SLOTS_PER_HOST)?
            .unwrap_or(if available_gpus > 0 { available_gpus } else { 1 });
        if process_slots_per_host == 0 {
            return Err(TrainingError::Config(format!("{PROCESS_SLOTS_PER_HOST} must be >= 1")));
        }

        let num_processes = hyperparameters
            .get_usize(NUM_PROCESSES)?
            .unwrap_or(process_slots_per_host * host_count);
        if num_processes == 0 {
            return Err(TrainingError::Config(format!("{NUM_PROCESSES} must be >= 1")));
        }

        Ok(Self { process_slots_per_host, num_processes })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpiCommand {
    mpirun_program: String,
    hosts: Vec<Host>,
    layout: ProcessLayout,
    network_interface_name: String,
    entry_command: Vec<String>,
}

impl MpiCommand {
    pub fn new(
        mpirun_program: impl Into<String>,
        hosts: &[Host],
        layout: ProcessLayout,
        network_interface_name: impl Into<String>,
        entry_command: &[String],
    ) -> TrainingResult<Self> {
        if hosts.is_empty() {
            return Err(TrainingError::EmptyHostSet);
        }
        if entry_command.is_empty() {
            return Err(TrainingError::Config("entry command must not be empty".to_string()));
        }
        Ok(Self {
            mpirun_program: mpirun_program.into(),
            hosts: hosts.to_vec(),
            layout,
            network_interface_name: network_interface_name.into(),
            entry_command: entry_command.to_vec(),
        })
    }

    /// The command the master launches for this environment.
    pub fn for_environment(env: &TrainingEnvironment, config: &CoordinationConfig) -> TrainingResult<Self> {
        let layout = ProcessLayout::resolve(&env.hyperparameters, env.available_gpus, env.host_count())?;
        Self::new(
            config.mpirun_program.clone(),
            &env.hosts,
            layout,
            env.network_interface_name.clone(),
            &config.entry_command,
        )
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.mpirun_program
    }

    /// `algo-1,algo-2`, or `algo-1:2,algo-2:2` with more than one slot per host.
    #[must_use]
    pub fn host_list(&self) -> String {
        let slots = self.layout.process_slots_per_host;
        self.hosts
            .iter()
            .map(|host| if slots == 1 { host.to_string() } else { format!("{host}:{slots}") })
            .collect::<Vec<_>>()
            .join(",")
    }

    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let iface = &self.network_interface_name;
        let mut args: Vec<String> = vec![
            "--allow-run-as-root".into(),
            "--host".into(),
            self.host_list(),
            "-mca".into(),
            "btl_tcp_if_include".into(),
            iface.clone(),
            "-mca".into(),
            "oob_tcp_if_include".into(),
            iface.clone(),
            "-mca".into(),
            "btl".into(),
            "^openib".into(),
            "-x".into(),
            "PATH".into(),
            "-x".into(),
            "LD_LIBRARY_PATH".into(),
            "-x".into(),
            format!("LD_PRELOAD={CHANGE_HOSTNAME_LIBRARY}"),
            "-mca".into(),
            "orte_abort_on_non_zero_status".into(),
            "1".into(),
            "-x".into(),
            "NCCL_DEBUG=INFO".into(),
            "-x".into(),
            format!("NCCL_SOCKET_IFNAME={iface}"),
            "-np".into(),
            self.layout.num_processes.to_string(),
        ];
        args.extend(self.entry_command.iter().cloned());
        args
    }

    #[must_use]
    pub fn command_spec(&self) -> CommandSpec {
        CommandSpec::new(self.mpirun_program.clone()).args(self.args())
    }
}

impl std::fmt::Display for MpiCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command_spec())
    }
}
