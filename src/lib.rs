//! Crawl-Orchestrator: client-side control of a remote job-collection crawler
//!
//! This crate triggers crawl jobs on a remote job execution service, tracks
//! them by polling the service status, and surfaces each job's outcome exactly
//! once as a structured notification.

pub mod config;
pub mod orchestrator;
pub mod request;
pub mod service;

use thiserror::Error;

/// Main error type for Crawl-Orchestrator operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid job request: {0}")]
    Request(#[from] RequestError),

    #[error("Transport error for {endpoint}: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Returns true if the request never completed or its response was unreadable
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while building a job request
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("max_pages must be >= 1, got {0}")]
    InvalidMaxPages(u32),
}

/// Result type alias for Crawl-Orchestrator operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for request building
pub type RequestResult<T> = std::result::Result<T, RequestError>;

// Re-export commonly used types
pub use config::Config;
pub use orchestrator::{
    CrawlOrchestrator, Notification, NotificationKind, OrchestratorState, SubmitOutcome,
};
pub use request::{ExternalSiteCrawlRequest, JobKind, JobRequest, Region, RegionCrawlRequest};
pub use service::{CrawlService, HttpCrawlService, LastResult, PollResult, TriggerAck};
