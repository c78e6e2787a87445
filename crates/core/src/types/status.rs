//! Status enums reported by the backend services.

use serde::{Deserialize, Serialize};

/// Status of a background ingestion task.
///
/// The agents service reports Celery states. Only `SUCCESS` and `FAILURE`
/// are terminal; `PENDING`, `STARTED`, `RETRY` and anything else the worker
/// may report are treated as still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Failure,
    #[serde(other)]
    Pending,
}

impl TaskStatus {
    /// Whether polling must stop after observing this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// Review status of a product or suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
