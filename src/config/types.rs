use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Crawl-Orchestrator
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default, rename = "region-crawl")]
    pub region_crawl: RegionCrawlDefaults,
    #[serde(default, rename = "external-crawl")]
    pub external_crawl: ExternalCrawlDefaults,
}

/// Remote job execution service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the job service (e.g., "http://127.0.0.1:5000")
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Total timeout of a single request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connection establishment timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms", default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

/// What the status poller does when a status request fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollErrorPolicy {
    /// Retry with exponential backoff, then give up into the "status unknown" state
    Retry,
    /// Log the failure and stop polling; the job stays marked as running
    Halt,
}

/// Status polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Fixed delay between two status polls while the job is running (milliseconds)
    #[serde(rename = "interval-ms", default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Behavior on a failed status poll
    #[serde(rename = "on-error", default = "default_on_error")]
    pub on_error: PollErrorPolicy,

    /// Consecutive failed polls tolerated before giving up (retry policy only)
    #[serde(
        rename = "max-consecutive-failures",
        default = "default_max_consecutive_failures"
    )]
    pub max_consecutive_failures: u32,

    /// Upper bound of the backoff delay after failed polls (milliseconds)
    #[serde(rename = "backoff-max-ms", default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl PollingConfig {
    /// Delay between polls while the remote job is running
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Delay before the next poll after `failures` consecutive failed polls
    ///
    /// Doubles from the poll interval on every failure, capped at `backoff_max_ms`.
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        let delay_ms = self.interval_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay_ms.min(self.backoff_max_ms))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            on_error: default_on_error(),
            max_consecutive_failures: default_max_consecutive_failures(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

/// Form defaults for a region crawl
#[derive(Debug, Clone, Deserialize)]
pub struct RegionCrawlDefaults {
    /// Prefecture selected by default
    #[serde(default = "default_region_prefecture")]
    pub prefecture: String,

    #[serde(rename = "max-pages", default = "default_region_max_pages")]
    pub max_pages: u32,

    /// Re-collect postings that are already stored
    #[serde(default)]
    pub force: bool,

    #[serde(default)]
    pub keyword: String,
}

impl Default for RegionCrawlDefaults {
    fn default() -> Self {
        Self {
            prefecture: default_region_prefecture(),
            max_pages: default_region_max_pages(),
            force: false,
            keyword: String::new(),
        }
    }
}

/// Form defaults for an external-site crawl
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalCrawlDefaults {
    #[serde(default)]
    pub keyword: String,

    #[serde(default = "default_external_location")]
    pub location: String,

    #[serde(rename = "max-pages", default = "default_external_max_pages")]
    pub max_pages: u32,
}

impl Default for ExternalCrawlDefaults {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            location: default_external_location(),
            max_pages: default_external_max_pages(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("crawl-orchestrator/{}", env!("CARGO_PKG_VERSION"))
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_on_error() -> PollErrorPolicy {
    PollErrorPolicy::Retry
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_region_prefecture() -> String {
    "北海道".to_string()
}

fn default_region_max_pages() -> u32 {
    10
}

fn default_external_location() -> String {
    "東京都".to_string()
}

fn default_external_max_pages() -> u32 {
    3
}
