//! smchainer Core
//!
//! Ambient layer shared by the training coordinator and the CLI:
//! - Coordination settings (`CoordinationConfig`)
//! - The SageMaker `/opt/ml` filesystem layout (`ContainerLayout`)
//! - The training environment read from that layout (`TrainingEnvironment`)

pub mod config;
pub mod environment;
pub mod error;
pub mod hyperparameters;
pub mod layout;

pub use config::CoordinationConfig;
pub use environment::{Host, TrainingEnvironment, DEFAULT_NETWORK_INTERFACE};
pub use error::{CoreError, CoreResult};
pub use hyperparameters::Hyperparameters;
pub use layout::ContainerLayout;
