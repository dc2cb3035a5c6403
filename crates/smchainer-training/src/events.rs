use crate::master::MasterPhase;
use crate::worker::WorkerPhase;
use serde::{Deserialize, Serialize};
use smchainer_core::Host;
use tracing::info;

/// Progress of a node through the coordination protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinationEvent {
    Master { host: Host, phase: MasterPhase },
    Worker { host: Host, phase: WorkerPhase },
    SingleNode { host: Host },
}

pub trait EventSink: Send + Sync {
    fn on_event(&self, event: CoordinationEvent);
}

/// Reports events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn on_event(&self, event: CoordinationEvent) {
        match event {
            CoordinationEvent::Master { host, phase } => info!(host = %host, phase = ?phase, "[master] entering phase"),
            CoordinationEvent::Worker { host, phase } => info!(host = %host, phase = ?phase, "[worker] entering phase"),
            CoordinationEvent::SingleNode { host } => info!(host = %host, "Running single-node training"),
        }
    }
}
