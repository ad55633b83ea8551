use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a translation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Submitted,
    Approved,
    Rejected,
    Completed,
    Cancelled,
    Removed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Pending,
        JobStatus::Submitted,
        JobStatus::Approved,
        JobStatus::Rejected,
        JobStatus::Completed,
        JobStatus::Cancelled,
        JobStatus::Removed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Submitted => "submitted",
            JobStatus::Approved => "approved",
            JobStatus::Rejected => "rejected",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Removed => "removed",
        }
    }

    /// `Completed` and `Removed` accept no further provider-backed actions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Removed)
    }

    /// States in which a returned translation is already settled and a
    /// check has nothing left to do.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            JobStatus::Approved | JobStatus::Rejected | JobStatus::Completed
        )
    }

    /// Whether the transition table allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;

        if next == Removed {
            return !self.is_terminal();
        }

        matches!(
            (*self, next),
            (Pending, Submitted)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Approved, Completed)
                | (Rejected, Completed)
                | (Pending, Cancelled)
                | (Submitted, Cancelled)
                | (Approved, Cancelled)
                | (Cancelled, Pending)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown job status '{s}'"))
    }
}
