//! Training environment read from the container filesystem.
//!
//! Built once at process start and passed by reference to every component.

use crate::error::{CoreError, CoreResult};
use crate::hyperparameters::Hyperparameters;
use crate::layout::ContainerLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Interface name SageMaker uses when `resourceconfig.json` does not name one.
pub const DEFAULT_NETWORK_INTERFACE: &str = "ethwe";

/// Host assumed when no resource config is mounted (local, single-node runs).
pub const DEFAULT_HOST: &str = "algo-1";

/// Environment variable that overrides GPU detection.
pub const NUM_GPUS_ENV: &str = "SM_NUM_GPUS";

/// Identifier of a node in the training cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(pub String);

impl Host {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Host {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Host {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Shape of `input/config/resourceconfig.json`.
#[derive(Debug, Clone, Deserialize)]
struct ResourceConfig {
    current_host: Host,
    hosts: Vec<Host>,
    #[serde(default)]
    network_interface_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TrainingEnvironment {
    pub current_host: Host,
    /// Hosts in the order the platform supplied them.
    pub hosts: Vec<Host>,
    pub hyperparameters: Hyperparameters,
    pub available_gpus: usize,
    pub network_interface_name: String,
    pub layout: ContainerLayout,
}

impl TrainingEnvironment {
    /// Load the environment from a container layout, detecting GPUs on this machine.
    pub fn load(layout: ContainerLayout) -> CoreResult<Self> {
        let gpus = detect_available_gpus();
        Self::load_with_gpus(layout, gpus)
    }

    /// Load the environment from a container layout with a known GPU count.
    pub fn load_with_gpus(layout: ContainerLayout, available_gpus: usize) -> CoreResult<Self> {
        let resource = read_resource_config(&layout.resource_config_path())?;
        let hyperparameters = read_hyperparameters(&layout.hyperparameters_path())?;

        let (current_host, hosts, network_interface_name) = match resource {
            Some(rc) => (
                rc.current_host,
                rc.hosts,
                rc.network_interface_name
                    .unwrap_or_else(|| DEFAULT_NETWORK_INTERFACE.to_string()),
            ),
            None => {
                debug!("No resource config found, assuming a single-node job");
                (Host::from(DEFAULT_HOST), vec![Host::from(DEFAULT_HOST)], DEFAULT_NETWORK_INTERFACE.to_string())
            }
        };

        let env = Self {
            current_host,
            hosts,
            hyperparameters,
            available_gpus,
            network_interface_name,
            layout,
        };
        env.validate()?;
        Ok(env)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.current_host.as_str().trim().is_empty() {
            return Err(CoreError::Environment("current_host is required".to_string()));
        }
        if !self.hosts.is_empty() && !self.hosts.contains(&self.current_host) {
            return Err(CoreError::Environment(format!(
                "current_host {} is not one of the hosts {:?}",
                self.current_host,
                self.host_names()
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    #[must_use]
    pub fn host_names(&self) -> Vec<&str> {
        self.hosts.iter().map(Host::as_str).collect()
    }

    /// Every host except this one.
    #[must_use]
    pub fn other_hosts(&self) -> Vec<Host> {
        self.hosts.iter().filter(|h| **h != self.current_host).cloned().collect()
    }
}

fn read_resource_config(path: &Path) -> CoreResult<Option<ResourceConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let rc = serde_json::from_str(&content)
        .map_err(|e| CoreError::Environment(format!("{}: {}", path.display(), e)))?;
    Ok(Some(rc))
}

fn read_hyperparameters(path: &Path) -> CoreResult<Hyperparameters> {
    if !path.exists() {
        return Ok(Hyperparameters::new());
    }
    let content = std::fs::read_to_string(path)?;
    Hyperparameters::from_json_str(&content)
        .map_err(|e| CoreError::Environment(format!("{}: {}", path.display(), e)))
}

/// Number of GPUs visible on this machine.
///
/// `SM_NUM_GPUS` wins when set; otherwise counts the lines printed by
/// `nvidia-smi --list-gpus`. A missing or failing tool means no GPUs.
#[must_use]
pub fn detect_available_gpus() -> usize {
    if let Ok(value) = std::env::var(NUM_GPUS_ENV) {
        match value.trim().parse::<usize>() {
            Ok(n) => return n,
            Err(_) => warn!(value = %value, "Ignoring unparsable {}", NUM_GPUS_ENV),
        }
    }

    match std::process::Command::new("nvidia-smi").arg("--list-gpus").output() {
        Ok(output) if output.status.success() => {
            count_gpu_lines(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            debug!(status = %output.status, "nvidia-smi failed, assuming no GPUs");
            0
        }
        Err(e) => {
            debug!(error = %e, "nvidia-smi not available, assuming no GPUs");
            0
        }
    }
}

fn count_gpu_lines(listing: &str) -> usize {
    listing.lines().filter(|line| line.trim_start().starts_with("GPU ")).count()
}
