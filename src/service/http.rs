//! HTTP implementation of the job service client
//!
//! Every request body that comes back as JSON is decoded regardless of the
//! HTTP status code: the service explains refusals in the same `message`
//! field it uses for acknowledgements. Send failures and undecodable bodies
//! are reported as [`CrawlError::Transport`].

use crate::config::ServiceConfig;
use crate::request::JobRequest;
use crate::service::{CrawlService, PollResult, TriggerAck};
use crate::{CrawlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Path of the status endpoint
pub const STATUS_PATH: &str = "/api/crawl/status";

/// Builds an HTTP client for the job service
///
/// # Example
///
/// ```no_run
/// use crawl_orchestrator::config::ServiceConfig;
/// use crawl_orchestrator::service::build_http_client;
///
/// let client = build_http_client(&ServiceConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ServiceConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Job service client over HTTP/JSON
#[derive(Debug, Clone)]
pub struct HttpCrawlService {
    client: Client,
    base_url: Url,
}

impl HttpCrawlService {
    /// Creates a client for the service described by `config`
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = build_http_client(config)?;
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self { client, base_url })
    }

    /// Creates a client for `base_url` reusing an existing HTTP client
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }
}

fn transport(url: &Url) -> impl FnOnce(reqwest::Error) -> CrawlError + '_ {
    move |source| CrawlError::Transport {
        endpoint: url.to_string(),
        source,
    }
}

#[async_trait]
impl CrawlService for HttpCrawlService {
    async fn status(&self) -> Result<PollResult> {
        let url = self.endpoint(STATUS_PATH)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport(&url))?;

        let http_status = response.status();
        let result: PollResult = response.json().await.map_err(transport(&url))?;

        tracing::trace!(
            status = http_status.as_u16(),
            is_running = result.is_running,
            "Status response"
        );

        Ok(result)
    }

    async fn trigger(&self, request: &JobRequest) -> Result<TriggerAck> {
        let url = self.endpoint(request.endpoint())?;
        tracing::debug!(job = %request.kind(), url = %url, "Sending trigger request");

        let response = self
            .client
            .post(url.clone())
            .json(&request.body())
            .send()
            .await
            .map_err(transport(&url))?;

        let http_status = response.status();
        let mut ack: TriggerAck = response.json().await.map_err(transport(&url))?;
        ack.http_status = Some(http_status.as_u16());

        if !http_status.is_success() {
            tracing::warn!(
                status = http_status.as_u16(),
                message = %ack.message,
                "Job service declined trigger request"
            );
        }

        Ok(ack)
    }
}
