//! Polling with a fixed interval and an optional deadline.
//!
//! A `RetryPolicy` is a plain value: bounded policies fail once the deadline
//! would be overrun, unbounded ones poll until the success condition holds.
//! A bounded deadline is a wall-clock instant: a probe still in flight when it
//! passes is abandoned. Time is read from tokio's clock so tests can run on
//! paused time.

use crate::error::{TrainingError, TrainingResult};
use crate::probe::Prober;
use smchainer_core::Host;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between two attempts.
    pub interval: Duration,
    /// Total time budget; `None` polls forever.
    pub deadline: Option<Duration>,
}

impl RetryPolicy {
    #[must_use]
    pub fn bounded(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline: Some(deadline) }
    }

    #[must_use]
    pub fn forever(interval: Duration) -> Self {
        Self { interval, deadline: None }
    }

    /// Instant at which a poll started at `start` must give up.
    fn deadline_from(&self, start: Instant) -> Option<Instant> {
        self.deadline.map(|deadline| start + deadline)
    }

    /// Whether another attempt fits in the budget after `elapsed`.
    fn allows_another_attempt(&self, elapsed: Duration) -> bool {
        self.deadline.is_none_or(|deadline| elapsed + self.interval <= deadline)
    }
}

/// A bounded poll ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("gave up after {attempts} attempts in {elapsed:?}")]
pub struct PollTimeout {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Call `probe` until `succeed_when` accepts its result, sleeping `policy.interval`
/// between attempts. The probe always runs at least once.
pub async fn poll_until<T, F, Fut, P>(
    mut probe: F,
    succeed_when: P,
    policy: &RetryPolicy,
) -> Result<T, PollTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    let start = Instant::now();
    let deadline_at = policy.deadline_from(start);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let Some(result) = within(deadline_at, probe()).await else {
            return Err(PollTimeout { attempts, elapsed: start.elapsed() });
        };
        if succeed_when(&result) {
            return Ok(result);
        }

        let elapsed = start.elapsed();
        if !policy.allows_another_attempt(elapsed) {
            return Err(PollTimeout { attempts, elapsed });
        }
        debug!(attempts, elapsed_ms = elapsed.as_millis() as u64, "Condition not met yet, retrying");
        sleep(policy.interval).await;
    }
}

/// Await `future`, giving up once `deadline_at` passes.
async fn within<T>(deadline_at: Option<Instant>, future: impl Future<Output = T>) -> Option<T> {
    match deadline_at {
        Some(at) => timeout_at(at, future).await.ok(),
        None => Some(future.await),
    }
}

/// The error for a single endpoint that never reached the expected state.
pub(crate) fn endpoint_timeout(phase: &str, host: &Host, port: u16, timeout: &PollTimeout) -> TrainingError {
    TrainingError::CoordinationTimeout {
        phase: phase.to_string(),
        pending: vec![format!("{host}:{port}")],
        waited: timeout.elapsed,
    }
}

/// Block until `host:port` accepts connections.
pub async fn wait_until_reachable(
    prober: &dyn Prober,
    host: &Host,
    port: u16,
    policy: &RetryPolicy,
    phase: &str,
) -> TrainingResult<()> {
    poll_until(|| prober.can_connect(host.as_str(), port), |reachable| *reachable, policy)
        .await
        .map(|_| ())
        .map_err(|timeout| endpoint_timeout(phase, host, port, &timeout))
}

/// Block until `host:port` stops accepting connections.
pub async fn wait_until_unreachable(
    prober: &dyn Prober,
    host: &Host,
    port: u16,
    policy: &RetryPolicy,
    phase: &str,
) -> TrainingResult<()> {
    poll_until(|| prober.can_connect(host.as_str(), port), |reachable| !*reachable, policy)
        .await
        .map(|_| ())
        .map_err(|timeout| endpoint_timeout(phase, host, port, &timeout))
}

/// Block until every host accepts connections on `port`.
///
/// Hosts drop out of the pending set as soon as they answer and are not probed
/// again; each round only probes what is still pending.
pub async fn wait_for_hosts(
    prober: &dyn Prober,
    hosts: &[Host],
    port: u16,
    policy: &RetryPolicy,
    phase: &str,
) -> TrainingResult<()> {
    let start = Instant::now();
    let deadline_at = policy.deadline_from(start);
    let mut pending: Vec<Host> = hosts.to_vec();
    pending.sort();
    pending.dedup();

    while !pending.is_empty() {
        info!(port, pending = ?pending.iter().map(Host::as_str).collect::<Vec<_>>(), "Hosts that aren't reachable yet");

        let mut still_pending = Vec::with_capacity(pending.len());
        let mut expired = false;
        let mut round = pending.into_iter();
        while let Some(host) = round.next() {
            match within(deadline_at, prober.can_connect(host.as_str(), port)).await {
                Some(true) => debug!(host = %host, port, "Host is reachable"),
                Some(false) => still_pending.push(host),
                None => {
                    // Out of time mid-round: this host and the unprobed rest stay pending.
                    still_pending.push(host);
                    still_pending.extend(round.by_ref());
                    expired = true;
                }
            }
        }
        pending = still_pending;

        if pending.is_empty() {
            break;
        }

        let elapsed = start.elapsed();
        if expired || !policy.allows_another_attempt(elapsed) {
            return Err(TrainingError::CoordinationTimeout {
                phase: phase.to_string(),
                pending: pending.iter().map(ToString::to_string).collect(),
                waited: elapsed,
            });
        }
        sleep(policy.interval).await;
    }

    info!(port, elapsed_ms = start.elapsed().as_millis() as u64, "All hosts are reachable");
    Ok(())
}
