//! User-facing notifications
//!
//! Every event the host UI should show (trigger acknowledgement, trigger
//! failure, job completion) is published as a [`Notification`] on a broadcast
//! channel. Completion messages are chosen by [`completion_notification`].

use crate::request::JobKind;
use crate::service::PollResult;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::broadcast;

/// Capacity of the notification channel
const CHANNEL_CAPACITY: usize = 64;

/// What happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    /// The service answered a trigger request with `message`
    Acknowledged { message: String },

    /// The trigger request could not be sent or its answer could not be read
    TriggerFailed { error: String },

    /// The job finished successfully
    Succeeded { count: Option<u64> },

    /// The job finished and the service reported an error
    RemoteError { error: String },

    /// The job finished without a recorded outcome
    Finished,

    /// Polling gave up; whether the job finished is unknown
    StatusUnknown { error: String },
}

impl NotificationKind {
    /// Returns true for the once-per-job completion events
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::RemoteError { .. } | Self::Finished
        )
    }

    /// Returns true if the notification reports a failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::TriggerFailed { .. } | Self::RemoteError { .. } | Self::StatusUnknown { .. }
        )
    }

    /// Human-readable message for the UI
    pub fn message(&self) -> String {
        match self {
            Self::Acknowledged { message } if message.is_empty() => {
                "Crawl request acknowledged".to_string()
            }
            Self::Acknowledged { message } => message.clone(),
            Self::TriggerFailed { error } => format!("Failed to start crawl: {}", error),
            Self::Succeeded { count: Some(count) } => {
                format!("Crawl completed: {} postings collected", count)
            }
            Self::Succeeded { count: None } => "Crawl completed".to_string(),
            Self::RemoteError { error } => format!("Crawl failed: {}", error),
            Self::Finished => "Crawl finished".to_string(),
            Self::StatusUnknown { error } => {
                format!("Crawl status unknown, polling stopped: {}", error)
            }
        }
    }
}

/// A notification event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,

    /// Kind of job the event belongs to, when known
    pub job: Option<JobKind>,

    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, job: Option<JobKind>) -> Self {
        Self {
            kind,
            job,
            at: Utc::now(),
        }
    }

    pub fn message(&self) -> String {
        self.kind.message()
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.message())
    }
}

/// Chooses the completion notification for a finished job
///
/// First match wins: a successful result, then a reported error, then the
/// generic fallback.
pub fn completion_notification(result: &PollResult) -> NotificationKind {
    if let Some(last) = result.success() {
        return NotificationKind::Succeeded { count: last.count };
    }

    if let Some(error) = result.error_text() {
        return NotificationKind::RemoteError {
            error: error.to_string(),
        };
    }

    NotificationKind::Finished
}

/// Publishes notifications to every subscriber
#[derive(Debug, Clone)]
pub(crate) struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Logs and publishes one notification
    ///
    /// Having no subscriber is not an error.
    pub(crate) fn emit(&self, kind: NotificationKind, job: Option<JobKind>) {
        let job_label = job.map(|j| j.as_str()).unwrap_or("unknown");
        let message = kind.message();

        match &kind {
            NotificationKind::TriggerFailed { .. } => {
                tracing::error!(job = job_label, "{}", message)
            }
            NotificationKind::RemoteError { .. } | NotificationKind::StatusUnknown { .. } => {
                tracing::warn!(job = job_label, "{}", message)
            }
            _ => tracing::info!(job = job_label, "{}", message),
        }

        let _ = self.tx.send(Notification::new(kind, job));
    }

    /// Raises the completion notification for `result`
    pub(crate) fn notify(&self, result: &PollResult, job: Option<JobKind>) -> NotificationKind {
        let kind = completion_notification(result);
        self.emit(kind.clone(), job);
        kind
    }
}
