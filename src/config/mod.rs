//! Configuration module for Crawl-Orchestrator
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing sections fall back to the defaults of a
//! local job service on `127.0.0.1:5000`.
//!
//! # Example
//!
//! ```no_run
//! use crawl_orchestrator::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("orchestrator.toml")).unwrap();
//! println!("Polling every {}ms", config.polling.interval_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExternalCrawlDefaults, PollErrorPolicy, PollingConfig, RegionCrawlDefaults,
    ServiceConfig,
};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config, with_service_url};
