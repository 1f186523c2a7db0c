//! Job requests sent to the remote job service
//!
//! A job is started by one of two mutually exclusive request kinds:
//! - `RegionCrawlRequest`: crawl the public job board for one prefecture
//! - `ExternalSiteCrawlRequest`: keyword search on an external job site
//!
//! Both are wrapped in [`JobRequest`] and dispatched through a single submit path.

mod region;

pub use region::{Region, PREFECTURES};

use crate::config::{ExternalCrawlDefaults, RegionCrawlDefaults};
use crate::{RequestError, RequestResult};
use serde::Serialize;
use std::fmt;

/// Path of the region crawl trigger endpoint
pub const REGION_CRAWL_PATH: &str = "/api/crawl/run";

/// Path of the external-site crawl trigger endpoint
pub const EXTERNAL_CRAWL_PATH: &str = "/api/crawl/indeed";

/// The kind of crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Region,
    ExternalSite,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::ExternalSite => "external_site",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region-based crawl of a single prefecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCrawlRequest {
    region: Region,
    max_pages: u32,
    force: bool,
    keyword: Option<String>,
}

impl RegionCrawlRequest {
    /// Creates a normal-mode request without a keyword filter
    ///
    /// Fails if `max_pages` is zero.
    pub fn new(region: Region, max_pages: u32) -> RequestResult<Self> {
        Ok(Self {
            region,
            max_pages: check_max_pages(max_pages)?,
            force: false,
            keyword: None,
        })
    }

    /// Re-collect postings that are already stored
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Restricts the crawl to postings matching `keyword`; blank clears the filter
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword: String = keyword.into();
        let keyword = keyword.trim();
        self.keyword = if keyword.is_empty() {
            None
        } else {
            Some(keyword.to_string())
        };
        self
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }
}

impl TryFrom<&RegionCrawlDefaults> for RegionCrawlRequest {
    type Error = RequestError;

    fn try_from(defaults: &RegionCrawlDefaults) -> RequestResult<Self> {
        Ok(Self::new(Region::parse(&defaults.prefecture)?, defaults.max_pages)?
            .with_force(defaults.force)
            .with_keyword(defaults.keyword.clone()))
    }
}

/// Keyword search on the external job site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSiteCrawlRequest {
    keyword: String,
    location: Region,
    max_pages: u32,
}

impl ExternalSiteCrawlRequest {
    /// Creates a request; an empty keyword searches all postings in `location`
    pub fn new(keyword: impl Into<String>, location: Region, max_pages: u32) -> RequestResult<Self> {
        let keyword: String = keyword.into();
        Ok(Self {
            keyword: keyword.trim().to_string(),
            location,
            max_pages: check_max_pages(max_pages)?,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn location(&self) -> Region {
        self.location
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }
}

impl TryFrom<&ExternalCrawlDefaults> for ExternalSiteCrawlRequest {
    type Error = RequestError;

    fn try_from(defaults: &ExternalCrawlDefaults) -> RequestResult<Self> {
        Self::new(
            defaults.keyword.clone(),
            Region::parse(&defaults.location)?,
            defaults.max_pages,
        )
    }
}

/// A request that starts one crawl job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    Region(RegionCrawlRequest),
    ExternalSite(ExternalSiteCrawlRequest),
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Region(_) => JobKind::Region,
            Self::ExternalSite(_) => JobKind::ExternalSite,
        }
    }

    /// Path of the trigger endpoint that accepts this request
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Region(_) => REGION_CRAWL_PATH,
            Self::ExternalSite(_) => EXTERNAL_CRAWL_PATH,
        }
    }

    /// JSON body of the trigger request
    pub fn body(&self) -> TriggerBody<'_> {
        match self {
            Self::Region(req) => TriggerBody::Region {
                prefectures: vec![req.region.name()],
                max_pages: req.max_pages,
                force: req.force,
                keyword: req.keyword().unwrap_or(""),
            },
            Self::ExternalSite(req) => TriggerBody::ExternalSite {
                keyword: &req.keyword,
                location: req.location.name(),
                max_pages: req.max_pages,
            },
        }
    }
}

impl From<RegionCrawlRequest> for JobRequest {
    fn from(req: RegionCrawlRequest) -> Self {
        Self::Region(req)
    }
}

impl From<ExternalSiteCrawlRequest> for JobRequest {
    fn from(req: ExternalSiteCrawlRequest) -> Self {
        Self::ExternalSite(req)
    }
}

impl fmt::Display for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(req) => {
                write!(f, "region crawl of {} ({} pages", req.region, req.max_pages)?;
                if req.force {
                    write!(f, ", forced")?;
                }
                if let Some(keyword) = req.keyword() {
                    write!(f, ", keyword '{}'", keyword)?;
                }
                write!(f, ")")
            }
            Self::ExternalSite(req) => {
                let keyword = if req.keyword.is_empty() {
                    "*"
                } else {
                    req.keyword.as_str()
                };
                write!(
                    f,
                    "external-site search '{}' @ {} ({} pages)",
                    keyword, req.location, req.max_pages
                )
            }
        }
    }
}

/// Wire format of a trigger request body
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TriggerBody<'a> {
    Region {
        prefectures: Vec<&'static str>,
        max_pages: u32,
        force: bool,
        keyword: &'a str,
    },
    ExternalSite {
        keyword: &'a str,
        location: &'static str,
        max_pages: u32,
    },
}

fn check_max_pages(max_pages: u32) -> RequestResult<u32> {
    if max_pages < 1 {
        return Err(RequestError::InvalidMaxPages(max_pages));
    }
    Ok(max_pages)
}
