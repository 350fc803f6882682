//! Protocol constants.
//!
//! Fixed at build time. The polling consumer and the spreadsheet layout both
//! depend on these values.

use std::time::Duration;

/// Quiet period that must elapse after the last journaled edit before the
/// gate reports ready (3 minutes).
pub const INACTIVITY_DELAY_MS: i64 = 3 * 60 * 1000;

/// 1-based column whose edits are journaled.
pub const TRIGGER_COLUMN: u32 = 6;

/// 1-based column holding the business record id of each row.
pub const ID_COLUMN: u32 = 9;

/// How long an edit waits for the journal lock before it is dropped.
pub const LOCK_WAIT: Duration = Duration::from_millis(5_000);

/// Name of the hidden sheet backing the journal.
pub const JOURNAL_SHEET_NAME: &str = "HiddenChanges";

/// Header row written when the journal sheet is created.
///
/// The trailing `Retries` column is reserved and never written.
pub const JOURNAL_HEADER: [&str; 7] = [
    "Sheet",
    "Cell",
    "OldValue",
    "NewValue",
    "ID",
    "Timestamp",
    "Retries",
];

/// Number of leading journal columns a change record occupies.
pub const RECORD_WIDTH: usize = 6;
