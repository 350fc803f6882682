//! Sync readiness verdicts and their polling literals

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

const JOURNAL_NOT_FOUND: &str = "error: hidden sheet not found";
const NO_CHANGES: &str = "false: no changes detected";
const WAITING_PERIOD: &str = "false: waiting period not passed";
const READY: &str = "true: ready to process";

/// Why the gate is not ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotReadyReason {
    /// The journal holds no populated rows
    NoChanges,
    /// An edit landed within the inactivity window
    WaitingPeriod,
}

/// Gate failures reported to the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateError {
    /// The journal sheet does not exist
    JournalNotFound,
}

/// Verdict of a readiness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Journal is non-empty and the quiet period has elapsed
    Ready,
    /// A downstream sync must not run yet
    NotReady(NotReadyReason),
    /// The gate could not evaluate the journal
    Error(GateError),
}

impl Readiness {
    /// Plain-text literal returned by the polling endpoint
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => READY,
            Self::NotReady(NotReadyReason::NoChanges) => NO_CHANGES,
            Self::NotReady(NotReadyReason::WaitingPeriod) => WAITING_PERIOD,
            Self::Error(GateError::JournalNotFound) => JOURNAL_NOT_FOUND,
        }
    }

    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Readiness {
    type Err = Error;

    /// Parse a polling response. Matching ignores case and surrounding
    /// whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        [
            Self::Ready,
            Self::NotReady(NotReadyReason::NoChanges),
            Self::NotReady(NotReadyReason::WaitingPeriod),
            Self::Error(GateError::JournalNotFound),
        ]
        .into_iter()
        .find(|candidate| candidate.as_str() == normalized)
        .ok_or_else(|| Error::InvalidInput(format!("unknown readiness response {s:?}")))
    }
}
