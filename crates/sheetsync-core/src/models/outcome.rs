//! Result of offering an edit to the journal

use serde::{Deserialize, Serialize};

/// What the journal did with an edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Edit was outside the trigger column
    Ignored,
    /// Edited row has no usable record id
    Rejected { reason: String },
    /// New journal row written at the given 1-based row
    Appended { row: u32 },
    /// Existing journal row for the same target overwritten in place
    Updated { row: u32 },
}
