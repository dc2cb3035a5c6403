//! Fakes shared by the unit tests.

use crate::events::{CoordinationEvent, EventSink};
use crate::probe::Prober;
use crate::process::{BackgroundProcess, CommandSpec, ProcessLauncher};
use crate::error::TrainingResult;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Mutex;

/// Prober answering from a per-endpoint script. The last answer repeats once
/// the script runs out; unscripted endpoints are unreachable.
#[derive(Debug, Default)]
pub struct ScriptedProber {
    scripts: Mutex<HashMap<(String, u16), VecDeque<bool>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, host: &str, port: u16, answers: &[bool]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert((host.to_string(), port), answers.iter().copied().collect());
        self
    }

    /// Hosts probed, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn can_connect(&self, host: &str, port: u16) -> bool {
        self.calls.lock().unwrap().push(host.to_string());
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&(host.to_string(), port)) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap_or(false),
            Some(script) => script.front().copied().unwrap_or(false),
            None => false,
        }
    }
}

/// Launcher that records commands and reports a fixed exit code.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    pub runs: Mutex<Vec<CommandSpec>>,
    pub spawned: Mutex<Vec<CommandSpec>>,
    exit_codes: Mutex<HashMap<String, i32>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(self, program: &str, code: i32) -> Self {
        self.exit_codes.lock().unwrap().insert(program.to_string(), code);
        self
    }

    pub fn run_programs(&self) -> Vec<String> {
        self.runs.lock().unwrap().iter().map(|c| c.program.clone()).collect()
    }

    fn status_for(&self, program: &str) -> ExitStatus {
        let code = self.exit_codes.lock().unwrap().get(program).copied().unwrap_or(0);
        ExitStatus::from_raw(code << 8)
    }
}

#[async_trait]
impl ProcessLauncher for RecordingLauncher {
    async fn run(&self, command: &CommandSpec) -> TrainingResult<ExitStatus> {
        self.runs.lock().unwrap().push(command.clone());
        Ok(self.status_for(&command.program))
    }

    async fn spawn_background(&self, command: &CommandSpec) -> TrainingResult<BackgroundProcess> {
        self.spawned.lock().unwrap().push(command.clone());
        Ok(BackgroundProcess::detached(command.program.clone()))
    }
}

/// Sink that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CoordinationEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<CoordinationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: CoordinationEvent) {
        self.events.lock().unwrap().push(event);
    }
}
