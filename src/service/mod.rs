//! Remote job execution service
//!
//! The orchestrator talks to the service only through the [`CrawlService`]
//! trait; [`HttpCrawlService`] is the HTTP/JSON implementation.

mod http;
mod types;

pub use http::{build_http_client, HttpCrawlService, STATUS_PATH};
pub use types::{LastResult, PollResult, TriggerAck};

use crate::request::JobRequest;
use crate::Result;
use async_trait::async_trait;

/// Operations of the remote job execution service
#[async_trait]
pub trait CrawlService: Send + Sync {
    /// Queries the status of the current (or last) job
    async fn status(&self) -> Result<PollResult>;

    /// Asks the service to start the job described by `request`
    ///
    /// Any response carrying a JSON acknowledgement is `Ok`, including a
    /// refusal because another job is already running.
    async fn trigger(&self, request: &JobRequest) -> Result<TriggerAck>;
}
