//! Status poller
//!
//! One spawned task per tracked job. The task queries the job service, waits a
//! fixed interval while the job reports running, and hands the finished status
//! to the orchestrator on the completion edge. Failed polls follow the
//! configured [`PollErrorPolicy`].
//!
//! The task owns a child of the orchestrator's shutdown token; a cancelled
//! poll returns without touching state or notifying.

use crate::config::PollErrorPolicy;
use crate::orchestrator::Shared;
use crate::service::PollResult;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What the poll loop does next
#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// Poll again after the delay
    Again(Duration),
    /// Polling is over
    Stop,
}

/// Handle to a running poll task
#[derive(Debug)]
pub(crate) struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Spawns the poll loop; the first status query runs after `first_delay`
    pub(crate) fn spawn(shared: Arc<Shared>, first_delay: Duration) -> Self {
        let cancel = shared.shutdown.child_token();
        let task = tokio::spawn(run(shared, cancel.clone(), first_delay));
        Self { cancel, task }
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to exit
    pub(crate) async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!("Status poll task ended abnormally: {}", e);
        }
    }
}

async fn run(shared: Arc<Shared>, cancel: CancellationToken, first_delay: Duration) {
    let mut failures = 0u32;
    let mut delay = first_delay;

    loop {
        if !delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            status = shared.service.status() => status,
        };

        match poll_step(&shared, status, &mut failures) {
            Step::Again(next) => delay = next,
            Step::Stop => return,
        }
    }

    tracing::debug!("Status polling cancelled");
}

/// Applies one status query result
fn poll_step(shared: &Shared, status: Result<PollResult>, failures: &mut u32) -> Step {
    match status {
        Ok(result) if result.is_running => {
            *failures = 0;
            tracing::debug!(
                "Job still running, next poll in {}ms",
                shared.polling.interval_ms
            );
            Step::Again(shared.polling.interval())
        }
        Ok(result) => {
            *failures = 0;
            shared.complete(&result);
            Step::Stop
        }
        Err(e) => match shared.polling.on_error {
            PollErrorPolicy::Halt => {
                tracing::error!("Status poll failed, polling stopped: {}", e);
                shared.halt();
                Step::Stop
            }
            PollErrorPolicy::Retry => {
                *failures += 1;
                if *failures >= shared.polling.max_consecutive_failures {
                    tracing::error!(
                        attempt = *failures,
                        "Status poll failed, giving up: {}",
                        e
                    );
                    shared.give_up(&e);
                    return Step::Stop;
                }

                let delay = shared.polling.backoff_delay(*failures);
                tracing::warn!(
                    attempt = *failures,
                    delay_ms = delay.as_millis() as u64,
                    "Status poll failed, retrying: {}",
                    e
                );
                Step::Again(delay)
            }
        },
    }
}
