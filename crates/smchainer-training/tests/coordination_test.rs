//! Master and worker running the full protocol against each other over
//! loopback TCP. Child processes are faked; sockets and timing are real.

use async_trait::async_trait;
use smchainer_core::{ContainerLayout, CoordinationConfig, Host, Hyperparameters, TrainingEnvironment};
use smchainer_training::{
    run_training, BackgroundProcess, CommandSpec, NodeContext, ProcessLauncher, TcpProber, TracingEventSink,
    TrainedModel, Trainer, TrainingOutcome, TrainingResult,
};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Mutex;
use std::time::Duration;

const MASTER: &str = "127.0.0.1";
const WORKER: &str = "localhost";

/// Stands in for sshd and mpirun: "sshd" binds the SSH port, "mpirun"
/// sleeps for a while.
struct FakeLauncher {
    ssh_port: u16,
    mpirun_duration: Duration,
    sshd: Mutex<Option<std::net::TcpListener>>,
    runs: Mutex<Vec<CommandSpec>>,
}

impl FakeLauncher {
    fn new(ssh_port: u16) -> Self {
        Self {
            ssh_port,
            mpirun_duration: Duration::from_millis(2500),
            sshd: Mutex::new(None),
            runs: Mutex::new(Vec::new()),
        }
    }

    fn programs(&self) -> Vec<String> {
        self.runs.lock().unwrap().iter().map(|c| c.program.clone()).collect()
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn run(&self, command: &CommandSpec) -> TrainingResult<ExitStatus> {
        self.runs.lock().unwrap().push(command.clone());
        if command.program == "mpirun" {
            tokio::time::sleep(self.mpirun_duration).await;
        }
        Ok(ExitStatus::from_raw(0))
    }

    async fn spawn_background(&self, command: &CommandSpec) -> TrainingResult<BackgroundProcess> {
        let listener = std::net::TcpListener::bind((MASTER, self.ssh_port))?;
        *self.sshd.lock().unwrap() = Some(listener);
        Ok(BackgroundProcess::detached(command.program.clone()))
    }
}

struct NeverCalled;

#[async_trait]
impl Trainer for NeverCalled {
    fn id(&self) -> &'static str {
        "never-called"
    }

    async fn train(&self, _env: &TrainingEnvironment) -> TrainingResult<Option<TrainedModel>> {
        panic!("distributed nodes must not train in-process");
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind((MASTER, 0)).unwrap().local_addr().unwrap().port()
}

fn environment(current: &str) -> TrainingEnvironment {
    TrainingEnvironment {
        current_host: Host::from(current),
        hosts: vec![Host::from(WORKER), Host::from(MASTER)],
        hyperparameters: Hyperparameters::new(),
        available_gpus: 0,
        network_interface_name: "lo".to_string(),
        layout: ContainerLayout::default(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_master_and_worker_complete_the_protocol() {
    let config = CoordinationConfig {
        ssh_port: free_port(),
        rendezvous_port: free_port(),
        mpi_stop_interval_secs: 1,
        ssh_wait_timeout_secs: 20,
        mpi_start_timeout_secs: 20,
        ..Default::default()
    };
    let master_env = environment(MASTER);
    let worker_env = environment(WORKER);
    let prober = TcpProber::default();
    let master_launcher = FakeLauncher::new(config.ssh_port);
    let worker_launcher = FakeLauncher::new(config.ssh_port);

    let master_ctx = NodeContext::new(&master_env, &config, &prober, &master_launcher, &TracingEventSink);
    let worker_ctx = NodeContext::new(&worker_env, &config, &prober, &worker_launcher, &TracingEventSink);

    let (master, worker) = tokio::time::timeout(Duration::from_secs(60), async {
        tokio::join!(run_training(master_ctx, &NeverCalled), run_training(worker_ctx, &NeverCalled))
    })
    .await
    .expect("protocol did not finish");

    assert_eq!(master.unwrap(), TrainingOutcome::Master);
    assert_eq!(worker.unwrap(), TrainingOutcome::Worker);
    assert_eq!(master_launcher.programs(), vec!["change-hostname.sh", "mpirun"]);
    assert_eq!(worker_launcher.programs(), vec!["change-hostname.sh"]);
    assert!(worker_launcher.sshd.lock().unwrap().is_some());
}

#[tokio::test]
async fn test_worker_times_out_without_master() {
    let config = CoordinationConfig {
        rendezvous_port: free_port(),
        mpi_start_timeout_secs: 2,
        ..Default::default()
    };
    let worker_env = environment(WORKER);
    let prober = TcpProber::new(Duration::from_millis(200));
    let launcher = FakeLauncher::new(free_port());
    let ctx = NodeContext::new(&worker_env, &config, &prober, &launcher, &TracingEventSink);

    let err = run_training(ctx, &NeverCalled).await.unwrap_err();

    assert!(err.to_string().contains(&format!("127.0.0.1:{}", config.rendezvous_port)));
}
