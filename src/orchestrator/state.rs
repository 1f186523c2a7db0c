//! Orchestrator state shared with UI-facing collaborators
//!
//! The state is owned by one orchestrator and published through a
//! `tokio::sync::watch` channel; readers get snapshots, never mutable access.
use crate::request::JobRequest;
use std::fmt;

/// Coarse lifecycle phase derived from [`OrchestratorState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No job is believed to be running
    Idle,

    /// A job was triggered (or adopted) and is being polled
    Running,

    /// Polling stopped after a failure while the job is still marked as running
    Stalled,

    /// Polling gave up after repeated failures; the remote outcome is unknown
    StatusUnknown,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stalled => "stalled",
            Self::StatusUnknown => "status_unknown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local belief about the remote job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorState {
    /// True from the moment a trigger is attempted until a poll reports the job finished
    pub running: bool,

    /// The request of the tracked job; `None` for a job adopted from the service
    pub pending_request: Option<JobRequest>,

    /// Set when polling gave up; cleared by the next submit
    pub status_unknown: bool,

    /// Set when polling stopped without releasing `running`
    pub polling_halted: bool,
}

impl OrchestratorState {
    pub fn phase(&self) -> Phase {
        if self.running && self.polling_halted {
            Phase::Stalled
        } else if self.running {
            Phase::Running
        } else if self.status_unknown {
            Phase::StatusUnknown
        } else {
            Phase::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.running
    }

    /// Returns true once nothing will change the state without a new submit
    pub fn is_settled(&self) -> bool {
        !self.running || self.polling_halted
    }

    /// Marks a job as running unless one already is
    ///
    /// Returns true if the state changed. The pending request becomes
    /// `request`; a job adopted from the service has none.
    pub(crate) fn claim(&mut self, request: Option<&JobRequest>) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.status_unknown = false;
        self.polling_halted = false;
        self.pending_request = request.cloned();
        true
    }

    /// Marks the job as no longer running
    ///
    /// Returns true if it was running.
    pub(crate) fn release(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Enters the status-unknown terminal state
    pub(crate) fn give_up(&mut self) {
        self.running = false;
        self.status_unknown = true;
    }

    /// Records that polling stopped while the job is still marked as running
    pub(crate) fn halt(&mut self) {
        self.polling_halted = true;
    }
}
