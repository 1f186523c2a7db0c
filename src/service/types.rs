use serde::Deserialize;

/// Outcome of the most recently finished job, as reported by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LastResult {
    #[serde(default)]
    pub success: bool,

    /// Number of postings collected (not reported by every crawler)
    #[serde(default)]
    pub count: Option<u64>,

    /// Failure description attached to an unsuccessful result
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of one status poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PollResult {
    pub is_running: bool,

    #[serde(default)]
    pub last_result: Option<LastResult>,

    #[serde(default)]
    pub last_error: Option<String>,
}

impl PollResult {
    /// A status reporting a job still in progress
    pub fn running() -> Self {
        Self {
            is_running: true,
            ..Default::default()
        }
    }

    /// A finished status whose last job succeeded with `count` postings
    pub fn succeeded(count: u64) -> Self {
        Self {
            is_running: false,
            last_result: Some(LastResult {
                success: true,
                count: Some(count),
                error: None,
            }),
            last_error: None,
        }
    }

    /// A finished status whose last job failed with `error`
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_running: false,
            last_result: None,
            last_error: Some(error.into()),
        }
    }

    /// A finished status without any recorded outcome
    pub fn finished() -> Self {
        Self::default()
    }

    /// Returns the last result if that job succeeded
    pub fn success(&self) -> Option<&LastResult> {
        self.last_result.as_ref().filter(|r| r.success)
    }

    /// Returns the error text of the last job, if any
    ///
    /// `last_error` wins; otherwise the error attached to an unsuccessful
    /// `last_result` is used.
    pub fn error_text(&self) -> Option<&str> {
        self.last_error.as_deref().or_else(|| {
            self.last_result
                .as_ref()
                .filter(|r| !r.success)
                .and_then(|r| r.error.as_deref())
        })
    }
}

/// Acknowledgement of a trigger request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TriggerAck {
    /// "started" when the job was accepted, "error" when the service declined it
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub message: String,

    /// HTTP status code of the acknowledgement
    #[serde(skip)]
    pub http_status: Option<u16>,
}

impl TriggerAck {
    /// Returns true if the service explicitly accepted the job
    pub fn is_started(&self) -> bool {
        self.status.as_deref() == Some("started")
    }
}
