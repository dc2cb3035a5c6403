use crate::error::CoreResult;
use std::path::{Path, PathBuf};

/// Default root of the container filesystem contract.
pub const DEFAULT_BASE_DIR: &str = "/opt/ml";

/// Filesystem layout of a SageMaker training container.
///
/// Default layout is rooted at `/opt/ml`:
/// `input/config/{hyperparameters,resourceconfig}.json`, `model/`, `output/`.
#[derive(Debug, Clone)]
pub struct ContainerLayout {
    root: PathBuf,
}

impl Default for ContainerLayout {
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_BASE_DIR))
    }
}

impl ContainerLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.root.join("input").join("config")
    }

    #[must_use]
    pub fn hyperparameters_path(&self) -> PathBuf {
        self.config_dir().join("hyperparameters.json")
    }

    #[must_use]
    pub fn resource_config_path(&self) -> PathBuf {
        self.config_dir().join("resourceconfig.json")
    }

    #[must_use]
    pub fn model_dir(&self) -> PathBuf {
        self.root.join("model")
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    #[must_use]
    pub fn output_data_dir(&self) -> PathBuf {
        self.output_dir().join("data")
    }

    /// File SageMaker reads the failure reason from when a job fails.
    #[must_use]
    pub fn failure_path(&self) -> PathBuf {
        self.output_dir().join("failure")
    }

    pub fn ensure_output_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(self.model_dir())?;
        std::fs::create_dir_all(self.output_data_dir())?;
        Ok(())
    }

    /// Write the failure reason, creating `output/` if needed.
    pub fn write_failure(&self, reason: &str) -> CoreResult<()> {
        std::fs::create_dir_all(self.output_dir())?;
        std::fs::write(self.failure_path(), reason)?;
        Ok(())
    }
}
