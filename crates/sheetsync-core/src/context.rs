//! Shared state for the journal and the gate

use std::sync::Arc;

use crate::activity::ActivityMarker;
use crate::clock::{Clock, SystemClock};
use crate::config::JOURNAL_SHEET_NAME;
use crate::error::Result;
use crate::lock::ScriptLock;
use crate::models::ChangeRecord;
use crate::util::parse_iso_timestamp;
use crate::workbook::Workbook;

/// Everything the journal writer and the readiness gate share.
///
/// Owned by the hosting process and handed to both
/// [`EditJournal::new`](crate::EditJournal::new) and
/// [`SyncGate::new`](crate::SyncGate::new). Cloning shares the same
/// workbook, marker and lock.
pub struct JournalContext<W> {
    pub workbook: Arc<W>,
    pub marker: Arc<ActivityMarker>,
    pub lock: Arc<ScriptLock>,
    pub clock: Arc<dyn Clock>,
}

impl<W> JournalContext<W> {
    /// Context over `workbook` using the system clock
    pub fn new(workbook: Arc<W>) -> Self {
        Self::with_clock(workbook, Arc::new(SystemClock))
    }

    pub fn with_clock(workbook: Arc<W>, clock: Arc<dyn Clock>) -> Self {
        Self {
            workbook,
            marker: Arc::new(ActivityMarker::new()),
            lock: Arc::new(ScriptLock::new()),
            clock,
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }
}

impl<W: Workbook> JournalContext<W> {
    /// Seed the activity marker from the newest journaled timestamp.
    ///
    /// The marker is process memory while the journal may be durable, so a
    /// host reopening an existing journal calls this before serving the gate.
    /// Returns the restored time, if any record carried a readable one.
    pub async fn restore_activity(&self) -> Result<Option<i64>> {
        let Some(rows) = self.workbook.read_rows(JOURNAL_SHEET_NAME).await? else {
            return Ok(None);
        };
        let newest = rows
            .iter()
            .filter_map(|row| ChangeRecord::from_row(row))
            .filter_map(|record| parse_iso_timestamp(&record.timestamp))
            .max();
        if let Some(last_edit_at) = newest {
            self.marker.touch(last_edit_at);
            tracing::info!(last_edit_at, "Restored activity marker from journal");
        }
        Ok(newest)
    }
}

impl<W> Clone for JournalContext<W> {
    fn clone(&self) -> Self {
        Self {
            workbook: Arc::clone(&self.workbook),
            marker: Arc::clone(&self.marker),
            lock: Arc::clone(&self.lock),
            clock: Arc::clone(&self.clock),
        }
    }
}
