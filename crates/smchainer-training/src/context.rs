use crate::events::{CoordinationEvent, EventSink};
use crate::probe::Prober;
use crate::process::ProcessLauncher;
use smchainer_core::{CoordinationConfig, TrainingEnvironment};

/// Everything a node needs to take part in the protocol, built once at startup.
#[derive(Clone, Copy)]
pub struct NodeContext<'a> {
    pub env: &'a TrainingEnvironment,
    pub config: &'a CoordinationConfig,
    pub prober: &'a dyn Prober,
    pub launcher: &'a dyn ProcessLauncher,
    pub events: &'a dyn EventSink,
}

impl<'a> NodeContext<'a> {
    #[must_use]
    pub fn new(
        env: &'a TrainingEnvironment,
        config: &'a CoordinationConfig,
        prober: &'a dyn Prober,
        launcher: &'a dyn ProcessLauncher,
        events: &'a dyn EventSink,
    ) -> Self {
        Self { env, config, prober, launcher, events }
    }

    pub(crate) fn emit(&self, event: CoordinationEvent) {
        self.events.on_event(event);
    }
}

impl std::fmt::Debug for NodeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("current_host", &self.env.current_host)
            .field("hosts", &self.env.hosts)
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}
