//! Terminal outcomes of batch work items.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::item::BatchItem;

/// Format used for failure timestamps in reports.
pub const FAILURE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A failed item, ready to be persisted for a later re-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: String,
    pub locator: String,
    pub error: String,
    pub timestamp: DateTime<Local>,
}

impl FailureRecord {
    pub fn new(id: impl Into<String>, locator: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
            error: error.into(),
            timestamp: Local::now(),
        }
    }

    /// Timestamp rendered as `YYYY-MM-DD HH:MM:SS`.
    pub fn timestamp_display(&self) -> String {
        self.timestamp.format(FAILURE_TIMESTAMP_FORMAT).to_string()
    }
}

/// Coarse classification of an outcome, for counters and progress messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Skipped,
    Failure,
}

/// Terminal state of one work item for one run.
///
/// Produced exactly once per item and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The item's work was done. `artifacts` lists what it produced
    /// (clip ids for the cut stage, empty for downloads).
    Success {
        id: String,
        locator: String,
        artifacts: Vec<String>,
    },
    /// Nothing needed doing (already complete).
    Skipped {
        id: String,
        locator: String,
        reason: String,
    },
    Failure(FailureRecord),
}

impl Outcome {
    pub fn success<I: BatchItem + ?Sized>(item: &I) -> Self {
        Self::success_with(item, Vec::new())
    }

    pub fn success_with<I: BatchItem + ?Sized>(item: &I, artifacts: Vec<String>) -> Self {
        Outcome::Success {
            id: item.id().to_string(),
            locator: item.locator().to_string(),
            artifacts,
        }
    }

    pub fn skipped<I: BatchItem + ?Sized>(item: &I, reason: impl Into<String>) -> Self {
        Outcome::Skipped {
            id: item.id().to_string(),
            locator: item.locator().to_string(),
            reason: reason.into(),
        }
    }

    pub fn failure<I: BatchItem + ?Sized>(item: &I, error: impl Into<String>) -> Self {
        Self::failure_for(item.id(), item.locator(), error)
    }

    pub fn failure_for(id: &str, locator: &str, error: impl Into<String>) -> Self {
        Outcome::Failure(FailureRecord::new(id, locator, error))
    }

    pub fn id(&self) -> &str {
        match self {
            Outcome::Success { id, .. } | Outcome::Skipped { id, .. } => id,
            Outcome::Failure(record) => &record.id,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success { .. } => OutcomeKind::Success,
            Outcome::Skipped { .. } => OutcomeKind::Skipped,
            Outcome::Failure(_) => OutcomeKind::Failure,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}
