//! Coordination settings.
//!
//! Every field has a default matching the container's conventions, so an empty
//! file (or no file at all) is a valid configuration.
//!
//! Precedence:
//! 1. Environment variables (`SMCHAINER_*`)
//! 2. TOML file passed with `--config`
//! 3. Defaults

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix of environment variables that override config values.
pub const ENV_PREFIX: &str = "SMCHAINER_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Port the SSH daemon listens on; probed by the master before launching MPI.
    pub ssh_port: u16,
    /// Port of the master's rendezvous socket.
    pub rendezvous_port: u16,
    /// Connect timeout for a single reachability probe.
    pub probe_timeout_ms: u64,
    pub ssh_wait_interval_secs: u64,
    pub ssh_wait_timeout_secs: u64,
    pub mpi_start_interval_secs: u64,
    pub mpi_start_timeout_secs: u64,
    /// Interval between probes while waiting for MPI to finish (no timeout).
    pub mpi_stop_interval_secs: u64,
    pub sshd_program: String,
    pub change_hostname_program: String,
    pub mpirun_program: String,
    /// Command MPI starts on every slot, and the one run directly on a single node.
    pub entry_command: Vec<String>,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            ssh_port: 22,
            rendezvous_port: 7777,
            probe_timeout_ms: 1000,
            ssh_wait_interval_secs: 1,
            ssh_wait_timeout_secs: 180,
            mpi_start_interval_secs: 1,
            mpi_start_timeout_secs: 30,
            mpi_stop_interval_secs: 10,
            sshd_program: "/usr/sbin/sshd".to_string(),
            change_hostname_program: "change-hostname.sh".to_string(),
            mpirun_program: "mpirun".to_string(),
            entry_command: ["python", "-m", "chainer_framework.run_training"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl CoordinationConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::Config(format!("file not found: {}", path.display())));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Defaults, then the optional file, then `SMCHAINER_*` environment overrides.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (usually the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        override_number(&mut self.ssh_port, "SSH_PORT", var("SSH_PORT"))?;
        override_number(&mut self.rendezvous_port, "RENDEZVOUS_PORT", var("RENDEZVOUS_PORT"))?;
        override_number(&mut self.probe_timeout_ms, "PROBE_TIMEOUT_MS", var("PROBE_TIMEOUT_MS"))?;
        override_number(&mut self.ssh_wait_interval_secs, "SSH_WAIT_INTERVAL_SECS", var("SSH_WAIT_INTERVAL_SECS"))?;
        override_number(&mut self.ssh_wait_timeout_secs, "SSH_WAIT_TIMEOUT_SECS", var("SSH_WAIT_TIMEOUT_SECS"))?;
        override_number(&mut self.mpi_start_interval_secs, "MPI_START_INTERVAL_SECS", var("MPI_START_INTERVAL_SECS"))?;
        override_number(&mut self.mpi_start_timeout_secs, "MPI_START_TIMEOUT_SECS", var("MPI_START_TIMEOUT_SECS"))?;
        override_number(&mut self.mpi_stop_interval_secs, "MPI_STOP_INTERVAL_SECS", var("MPI_STOP_INTERVAL_SECS"))?;

        if let Some(program) = var("SSHD_PROGRAM") {
            self.sshd_program = program;
        }
        if let Some(program) = var("CHANGE_HOSTNAME_PROGRAM") {
            self.change_hostname_program = program;
        }
        if let Some(program) = var("MPIRUN_PROGRAM") {
            self.mpirun_program = program;
        }
        if let Some(command) = var("ENTRY_COMMAND") {
            self.entry_command = command.split_whitespace().map(ToString::to_string).collect();
        }
        Ok(())
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.entry_command.is_empty() {
            return Err(CoreError::Config("entry_command must not be empty".to_string()));
        }
        if self.ssh_wait_interval_secs == 0 || self.mpi_start_interval_secs == 0 || self.mpi_stop_interval_secs == 0 {
            return Err(CoreError::Config("poll intervals must be >= 1 second".to_string()));
        }
        if self.rendezvous_port == 0 {
            return Err(CoreError::Config("rendezvous_port must be a fixed, non-zero port".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    #[must_use]
    pub fn ssh_wait_interval(&self) -> Duration {
        Duration::from_secs(self.ssh_wait_interval_secs)
    }

    #[must_use]
    pub fn ssh_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_wait_timeout_secs)
    }

    #[must_use]
    pub fn mpi_start_interval(&self) -> Duration {
        Duration::from_secs(self.mpi_start_interval_secs)
    }

    #[must_use]
    pub fn mpi_start_timeout(&self) -> Duration {
        Duration::from_secs(self.mpi_start_timeout_secs)
    }

    #[must_use]
    pub fn mpi_stop_interval(&self) -> Duration {
        Duration::from_secs(self.mpi_stop_interval_secs)
    }
}

fn override_number<T>(field: &mut T, name: &str, value: Option<String>) -> CoreResult<()>
where
    T: std::str::FromStr,
{
    if let Some(raw) = value {
        *field = raw.trim().parse().map_err(|_| {
            CoreError::Config(format!("{ENV_PREFIX}{name}: expected a number, got \"{raw}\""))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CoordinationConfig::default();
        assert_eq!(config.ssh_port, 22);
        assert_eq!(config.rendezvous_port, 7777);
        assert_eq!(config.ssh_wait_timeout(), Duration::from_secs(180));
        assert_eq!(config.mpi_start_timeout(), Duration::from_secs(30));
        assert_eq!(config.mpi_stop_interval(), Duration::from_secs(10));
        assert_eq!(config.entry_command.join(" "), "python -m chainer_framework.run_training");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_partial() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("smchainer.toml");
        std::fs::write(&path, "rendezvous_port = 8888\nmpirun_program = \"/usr/local/bin/mpirun\"\n").unwrap();

        let config = CoordinationConfig::load_from_file(&path).unwrap();
        assert_eq!(config.rendezvous_port, 8888);
        assert_eq!(config.mpirun_program, "/usr/local/bin/mpirun");
        assert_eq!(config.ssh_port, 22);
    }

    #[test]
    fn test_load_from_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = CoordinationConfig::load_from_file(&temp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "ssh_port = \"twenty-two\"").unwrap();
        assert!(matches!(CoordinationConfig::load_from_file(&path), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<String, String> = [
            ("SMCHAINER_RENDEZVOUS_PORT", "9999"),
            ("SMCHAINER_MPI_START_TIMEOUT_SECS", "5"),
            ("SMCHAINER_ENTRY_COMMAND", "python train.py --fast"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut config = CoordinationConfig::default();
        config.apply_overrides(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.rendezvous_port, 9999);
        assert_eq!(config.mpi_start_timeout(), Duration::from_secs(5));
        assert_eq!(config.entry_command, vec!["python", "train.py", "--fast"]);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = CoordinationConfig::default();
        let err = config
            .apply_overrides(|key| (key == "SMCHAINER_SSH_PORT").then(|| "ssh".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("SMCHAINER_SSH_PORT"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = CoordinationConfig { mpi_stop_interval_secs: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
