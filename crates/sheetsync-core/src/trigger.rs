//! Top-level edit handler fed by the spreadsheet host

use crate::error::Error;
use crate::journal::EditJournal;
use crate::models::{EditEvent, RecordOutcome};
use crate::workbook::Workbook;

/// Entry point for host edit notifications.
///
/// Hosts validate the raw event into an [`EditEvent`] first. Nothing is
/// propagated back to the host: every failure is logged and the edit is
/// reported as lost.
pub struct EditTrigger<W> {
    journal: EditJournal<W>,
}

impl<W: Workbook> EditTrigger<W> {
    pub const fn new(journal: EditJournal<W>) -> Self {
        Self { journal }
    }

    /// Journal a validated edit. `None` means the edit was lost.
    pub async fn handle(&self, edit: &EditEvent) -> Option<RecordOutcome> {
        match self.journal.record(edit).await {
            Ok(outcome) => Some(outcome),
            Err(error @ Error::LockTimeout { .. }) => {
                tracing::error!(
                    sheet = %edit.sheet_name,
                    cell = %edit.cell_address,
                    %error,
                    "Edit lost: journal lock unavailable"
                );
                None
            }
            Err(error) => {
                tracing::error!(
                    sheet = %edit.sheet_name,
                    cell = %edit.cell_address,
                    %error,
                    "Edit lost: journal write failed"
                );
                None
            }
        }
    }
}
