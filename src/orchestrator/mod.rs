//! Crawl job orchestration
//!
//! [`CrawlOrchestrator`] tracks at most one remote crawl job at a time:
//! - `submit` sends the trigger request and arms the status poller
//! - the poller detects the running → finished edge
//! - the completion notification and the completion callback fire once per edge
//!
//! State is published through a `watch` channel and notifications through a
//! `broadcast` channel, so any number of UI collaborators can observe both.

mod notifier;
mod poller;
mod state;

pub use notifier::{completion_notification, Notification, NotificationKind};
pub use state::{OrchestratorState, Phase};

use crate::config::{Config, PollingConfig};
use crate::request::{JobKind, JobRequest};
use crate::service::{CrawlService, HttpCrawlService, PollResult, TriggerAck};
use crate::{CrawlError, Result};
use notifier::Notifier;
use poller::PollHandle;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

/// Callback invoked once per finished job
pub type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

/// Result of a submit call
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The service acknowledged the request; the status poller is armed
    Started(TriggerAck),

    /// A job is already running; nothing was sent
    Busy,

    /// The trigger request failed; the orchestrator is idle again
    Failed(CrawlError),

    /// The orchestrator was shut down; nothing was sent
    ShutDown,
}

impl SubmitOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

/// State shared between the orchestrator and its poll task
pub(crate) struct Shared {
    service: Arc<dyn CrawlService>,
    polling: PollingConfig,
    state: watch::Sender<OrchestratorState>,
    notifier: Notifier,
    on_complete: Mutex<Option<CompletionCallback>>,
    shutdown: CancellationToken,
}

impl Shared {
    fn current_job(&self) -> Option<JobKind> {
        self.state
            .borrow()
            .pending_request
            .as_ref()
            .map(JobRequest::kind)
    }

    /// Handles a poll that found the job service idle
    fn complete(&self, result: &PollResult) {
        let was_running = self.state.borrow().running;

        if was_running {
            self.notifier.notify(result, self.current_job());
            self.fire_on_complete();
        } else {
            tracing::debug!("Job service idle, nothing to report");
        }

        self.state.send_if_modified(OrchestratorState::release);
    }

    /// Enters the status-unknown state after repeated poll failures
    fn give_up(&self, error: &CrawlError) {
        self.notifier.emit(
            NotificationKind::StatusUnknown {
                error: error.to_string(),
            },
            self.current_job(),
        );
        self.state.send_modify(OrchestratorState::give_up);
    }

    /// Records that polling stopped while the job stays marked as running
    fn halt(&self) {
        self.state.send_modify(OrchestratorState::halt);
    }

    fn fire_on_complete(&self) {
        let callback = self
            .on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Releases the running claim unless disarmed
struct RunningClaim<'a> {
    state: &'a watch::Sender<OrchestratorState>,
    armed: bool,
}

impl RunningClaim<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunningClaim<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_if_modified(OrchestratorState::release);
        }
    }
}

/// Triggers and tracks crawl jobs on a remote job service
pub struct CrawlOrchestrator {
    shared: Arc<Shared>,
    poller: Mutex<Option<PollHandle>>,
}

impl CrawlOrchestrator {
    /// Creates an idle orchestrator for `service`
    pub fn new(service: Arc<dyn CrawlService>, polling: PollingConfig) -> Self {
        let (state, _) = watch::channel(OrchestratorState::default());

        Self {
            shared: Arc::new(Shared {
                service,
                polling,
                state,
                notifier: Notifier::new(),
                on_complete: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
            poller: Mutex::new(None),
        }
    }

    /// Creates an orchestrator talking HTTP to the service named in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let service = HttpCrawlService::new(&config.service)?;
        Ok(Self::new(Arc::new(service), config.polling.clone()))
    }

    /// Registers the callback invoked once per finished job, replacing any previous one
    pub fn on_complete<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: CompletionCallback = Arc::new(callback);
        *self
            .shared
            .on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Starts a job unless one is already running
    ///
    /// The orchestrator is marked as running before the trigger request is
    /// sent, so concurrent submits send at most one request. On
    /// acknowledgement the service message is published and the status poller
    /// is armed; only the poller marks the job finished. If the trigger request
    /// fails (or this future is dropped before it resolves) the orchestrator
    /// becomes idle again and no poll is scheduled.
    pub async fn submit(&self, request: impl Into<JobRequest>) -> SubmitOutcome {
        let request = request.into();
        let job = request.kind();

        if self.shared.shutdown.is_cancelled() {
            tracing::warn!(job = %job, "Orchestrator shut down, submit ignored");
            return SubmitOutcome::ShutDown;
        }

        if !self
            .shared
            .state
            .send_if_modified(|state| state.claim(Some(&request)))
        {
            tracing::debug!(job = %job, "A job is already running, submit ignored");
            return SubmitOutcome::Busy;
        }

        let mut claim = RunningClaim {
            state: &self.shared.state,
            armed: true,
        };

        tracing::info!(job = %job, "Triggering {}", request);

        match self.shared.service.trigger(&request).await {
            Ok(ack) => {
                claim.disarm();
                self.shared.notifier.emit(
                    NotificationKind::Acknowledged {
                        message: ack.message.clone(),
                    },
                    Some(job),
                );
                self.start_polling(Duration::ZERO);
                SubmitOutcome::Started(ack)
            }
            Err(error) => {
                drop(claim);
                self.shared.notifier.emit(
                    NotificationKind::TriggerFailed {
                        error: error.to_string(),
                    },
                    Some(job),
                );
                SubmitOutcome::Failed(error)
            }
        }
    }

    /// Queries the job service once
    ///
    /// If the service is running a job while this orchestrator is idle (e.g.
    /// a job started before this process), the job is adopted: the
    /// orchestrator is marked as running and polling starts, so its
    /// completion is notified like any submitted job. Nothing is notified by
    /// this call itself.
    pub async fn refresh_status(&self) -> Result<PollResult> {
        let result = self.shared.service.status().await?;

        if result.is_running
            && !self.shared.shutdown.is_cancelled()
            && self.shared.state.send_if_modified(|state| state.claim(None))
        {
            tracing::info!("Adopting crawl job already running on the job service");
            self.start_polling(self.shared.polling.interval());
        }

        Ok(result)
    }

    fn start_polling(&self, first_delay: Duration) {
        let handle = PollHandle::spawn(Arc::clone(&self.shared), first_delay);

        let mut slot = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            if !previous.is_finished() {
                tracing::warn!("Replacing an active status poller");
                previous.cancel();
            }
        }
    }

    /// Cancels any pending poll and refuses further submits
    ///
    /// A cancelled poll never notifies. Returns once the poll task has exited.
    pub async fn shutdown(&self) {
        self.shared.shutdown.cancel();

        let handle = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle.join().await;
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> OrchestratorState {
        self.shared.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.borrow().running
    }

    /// Subscribes to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<OrchestratorState> {
        self.shared.state.subscribe()
    }

    /// Subscribes to notifications published from now on
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.shared.notifier.subscribe()
    }

    pub fn polling_config(&self) -> &PollingConfig {
        &self.shared.polling
    }

    /// Waits until no job is running or polling has halted
    pub async fn wait_until_settled(&self) -> OrchestratorState {
        let mut rx = self.shared.state.subscribe();
        let settled = rx
            .wait_for(OrchestratorState::is_settled)
            .await
            .map(|state| state.clone());

        settled.unwrap_or_else(|_| self.state())
    }
}

impl Drop for CrawlOrchestrator {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}
