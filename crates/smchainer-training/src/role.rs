//! Master election.
//!
//! Every node runs the same election over the same host set and must reach the
//! same answer without talking to the others, so the result depends only on the
//! contents of the set, never on its order.

use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use smchainer_core::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Master,
    Worker,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Master => f.write_str("master"),
            Self::Worker => f.write_str("worker"),
        }
    }
}

/// The lexicographically smallest host.
pub fn master_of(hosts: &[Host]) -> TrainingResult<&Host> {
    hosts.iter().min().ok_or(TrainingError::EmptyHostSet)
}

pub fn is_master(current_host: &Host, hosts: &[Host]) -> TrainingResult<bool> {
    Ok(master_of(hosts)? == current_host)
}

pub fn resolve_role(current_host: &Host, hosts: &[Host]) -> TrainingResult<NodeRole> {
    if is_master(current_host, hosts)? { Ok(NodeRole::Master) } else { Ok(NodeRole::Worker) }
}
