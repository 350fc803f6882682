//! Deduplicated journal of pending cell edits.
//!
//! The journal lives on a hidden sheet. Each data row holds the latest value
//! of one `(sheet, cell, record id)` target: a repeated edit to the same
//! target overwrites its row in place, so the row keeps the position of the
//! first edit but carries the values of the last one. `OldValue` is
//! overwritten as well, which means the value before the first edit is not
//! retained.

use crate::config::{
    ID_COLUMN, JOURNAL_HEADER, JOURNAL_SHEET_NAME, LOCK_WAIT, RECORD_WIDTH, TRIGGER_COLUMN,
};
use crate::context::JournalContext;
use crate::error::{Error, Result};
use crate::models::{ChangeRecord, EditEvent, RecordId, RecordOutcome};
use crate::util::iso_timestamp;
use crate::workbook::{Rows, Workbook};

/// Writer side of the journal
pub struct EditJournal<W> {
    ctx: JournalContext<W>,
}

impl<W> Clone for EditJournal<W> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
        }
    }
}

impl<W: Workbook> EditJournal<W> {
    pub const fn new(ctx: JournalContext<W>) -> Self {
        Self { ctx }
    }

    pub const fn context(&self) -> &JournalContext<W> {
        &self.ctx
    }

    /// Journal one edit.
    ///
    /// Edits outside the trigger column and edits whose row has no usable
    /// record id are dropped without touching storage or the lock. Accepted
    /// edits are upserted under the journal lock; if the lock is not
    /// acquired within [`LOCK_WAIT`] the edit is lost and
    /// [`Error::LockTimeout`] is returned with storage and the activity
    /// marker untouched.
    pub async fn record(&self, event: &EditEvent) -> Result<RecordOutcome> {
        if event.column != TRIGGER_COLUMN {
            tracing::trace!(
                sheet = %event.sheet_name,
                cell = %event.cell_address,
                "Edit outside trigger column ignored"
            );
            return Ok(RecordOutcome::Ignored);
        }

        let id_value = self
            .ctx
            .workbook
            .cell_value(&event.sheet_name, event.row, ID_COLUMN)
            .await?
            .unwrap_or_default();
        let record_id = match id_value.parse::<RecordId>() {
            Ok(record_id) => record_id,
            Err(error) => {
                tracing::info!(
                    sheet = %event.sheet_name,
                    row = event.row,
                    id_value = %id_value,
                    "Record id missing or not an integer, edit dropped"
                );
                return Ok(RecordOutcome::Rejected {
                    reason: error.to_string(),
                });
            }
        };

        let _guard = self.ctx.lock.acquire(LOCK_WAIT).await?;

        let now = self.ctx.now_millis();
        let record = ChangeRecord {
            sheet_name: event.sheet_name.clone(),
            cell_address: event.cell_address.clone(),
            old_value: event.old_value.clone().unwrap_or_default(),
            new_value: event.new_value.clone().unwrap_or_default(),
            record_id,
            timestamp: iso_timestamp(now),
        };

        let rows = self.load_or_create().await?;
        // Touched before the row lands so a gate seeing the row sees the marker
        self.ctx.marker.touch(now);
        let outcome = if let Some(index) = rows.iter().position(|row| record.same_target(row)) {
            let row = u32::try_from(index + 1)
                .map_err(|_| Error::InvalidInput("journal row limit reached".into()))?;
            self.ctx
                .workbook
                .write_row(JOURNAL_SHEET_NAME, row, &record.to_row())
                .await?;
            RecordOutcome::Updated { row }
        } else {
            let row = self
                .ctx
                .workbook
                .append_row(JOURNAL_SHEET_NAME, &record.to_row())
                .await?;
            RecordOutcome::Appended { row }
        };

        tracing::debug!(
            sheet = %record.sheet_name,
            cell = %record.cell_address,
            record_id = %record.record_id,
            ?outcome,
            "Journaled edit"
        );
        Ok(outcome)
    }

    /// Pending records in journal order, without modifying anything
    pub async fn pending(&self) -> Result<Vec<ChangeRecord>> {
        let rows = self
            .ctx
            .workbook
            .read_rows(JOURNAL_SHEET_NAME)
            .await?
            .ok_or_else(|| Error::NotFound(format!("journal sheet {JOURNAL_SHEET_NAME:?}")))?;
        Ok(parse_records(&rows))
    }

    /// Take every pending record and clear the journal, keeping its header.
    ///
    /// Runs under the journal lock so no edit lands between the read and
    /// the clear. A missing journal drains to nothing.
    pub async fn drain(&self) -> Result<Vec<ChangeRecord>> {
        let _guard = self.ctx.lock.acquire(LOCK_WAIT).await?;

        let Some(rows) = self.ctx.workbook.read_rows(JOURNAL_SHEET_NAME).await? else {
            return Ok(Vec::new());
        };
        let records = parse_records(&rows);
        let keep = u32::from(rows.first().is_some_and(|row| is_header_row(row)));
        self.ctx
            .workbook
            .truncate_rows(JOURNAL_SHEET_NAME, keep)
            .await?;

        tracing::info!(drained = records.len(), "Drained journal");
        Ok(records)
    }

    /// Read the journal, creating it on first use.
    ///
    /// A new journal is hidden and starts with the header row.
    async fn load_or_create(&self) -> Result<Rows> {
        let workbook = &self.ctx.workbook;
        if let Some(rows) = workbook.read_rows(JOURNAL_SHEET_NAME).await? {
            return Ok(rows);
        }

        workbook.insert_sheet(JOURNAL_SHEET_NAME).await?;
        workbook.set_sheet_hidden(JOURNAL_SHEET_NAME, true).await?;
        let header: Vec<String> = JOURNAL_HEADER.iter().map(|name| (*name).to_string()).collect();
        workbook.append_row(JOURNAL_SHEET_NAME, &header).await?;
        tracing::info!(sheet = JOURNAL_SHEET_NAME, "Created journal sheet");
        Ok(vec![header])
    }
}

/// Whether a row is the journal header: at least the record columns must
/// match, and any cells beyond them must continue the header
pub(crate) fn is_header_row(row: &[String]) -> bool {
    row.len() >= RECORD_WIDTH
        && row
            .iter()
            .map(String::as_str)
            .take(JOURNAL_HEADER.len())
            .eq(JOURNAL_HEADER.iter().copied().take(row.len()))
}

fn parse_records(rows: &[Vec<String>]) -> Vec<ChangeRecord> {
    rows.iter()
        .filter_map(|row| ChangeRecord::from_row(row))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::workbook::MemoryWorkbook;
    use pretty_assertions::assert_eq;

    struct Fixture {
        workbook: Arc<MemoryWorkbook>,
        clock: Arc<ManualClock>,
        journal: EditJournal<MemoryWorkbook>,
    }

    async fn setup() -> Fixture {
        let workbook = Arc::new(MemoryWorkbook::new());
        workbook.insert_sheet("Sheet1").await.unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let ctx = JournalContext::with_clock(workbook.clone(), clock.clone());
        Fixture {
            workbook,
            clock,
            journal: EditJournal::new(ctx),
        }
    }

    async fn set_id(workbook: &MemoryWorkbook, row: u32, id: &str) {
        workbook
            .set_cell_value("Sheet1", row, ID_COLUMN, id)
            .await
            .unwrap();
    }

    fn edit(cell: &str, old: Option<&str>, new: Option<&str>) -> EditEvent {
        EditEvent::new(
            "Sheet1",
            cell,
            old.map(str::to_string),
            new.map(str::to_string),
        )
        .unwrap()
    }

    async fn journal_rows(workbook: &MemoryWorkbook) -> Option<Rows> {
        workbook.read_rows(JOURNAL_SHEET_NAME).await.unwrap()
    }

    #[tokio::test]
    async fn test_first_edit_creates_hidden_journal_with_header() {
        let fx = setup().await;
        set_id(&fx.workbook, 3, "7").await;

        let outcome = fx.journal.record(&edit("F3", None, Some("120"))).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Appended { row: 2 });

        assert_eq!(
            fx.workbook.is_sheet_hidden(JOURNAL_SHEET_NAME).await.unwrap(),
            Some(true)
        );
        let rows = journal_rows(&fx.workbook).await.unwrap();
        assert!(is_header_row(&rows[0]));
        assert_eq!(
            rows[1][..6],
            ["Sheet1", "F3", "", "120", "7", "1970-01-01T00:00:00.000Z"]
        );
        assert_eq!(fx.journal.context().marker.last_edit_at(0), Some(0));
    }

    #[tokio::test]
    async fn test_repeated_edits_collapse_to_latest_values() {
        let fx = setup().await;
        set_id(&fx.workbook, 3, "7").await;

        for (old, new) in [("", "120"), ("120", "150"), ("150", "90")] {
            fx.clock.advance(1_000);
            fx.journal
                .record(&edit("F3", Some(old), Some(new)))
                .await
                .unwrap();
        }

        let records = fx.journal.pending().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].old_value, "150");
        assert_eq!(records[0].new_value, "90");
        assert_eq!(records[0].timestamp, "1970-01-01T00:00:03.000Z");
    }

    #[tokio::test]
    async fn test_update_keeps_first_position() {
        let fx = setup().await;
        set_id(&fx.workbook, 3, "7").await;
        set_id(&fx.workbook, 4, "8").await;

        fx.journal.record(&edit("F3", None, Some("a"))).await.unwrap();
        fx.journal.record(&edit("F4", None, Some("b"))).await.unwrap();
        let outcome = fx.journal.record(&edit("F3", Some("a"), Some("c"))).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Updated { row: 2 });

        let values: Vec<String> = fx
            .journal
            .pending()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.new_value)
            .collect();
        assert_eq!(values, vec!["c".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_same_cell_different_id_gets_own_row() {
        let fx = setup().await;
        set_id(&fx.workbook, 3, "7").await;
        fx.journal.record(&edit("F3", None, Some("a"))).await.unwrap();

        set_id(&fx.workbook, 3, "9").await;
        let outcome = fx.journal.record(&edit("F3", None, Some("b"))).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Appended { row: 3 });
        assert_eq!(fx.journal.pending().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_columns_are_ignored() {
        let fx = setup().await;
        set_id(&fx.workbook, 3, "7").await;

        let outcome = fx.journal.record(&edit("E3", None, Some("x"))).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Ignored);
        assert_eq!(journal_rows(&fx.workbook).await, None);
        assert_eq!(fx.journal.context().marker.last_edit_at(0), None);
    }

    #[tokio::test]
    async fn test_invalid_ids_are_rejected_without_side_effects() {
        let fx = setup().await;
        set_id(&fx.workbook, 3, "7").await;
        fx.journal.record(&edit("F3", None, Some("a"))).await.unwrap();
        let before = journal_rows(&fx.workbook).await;
        fx.clock.advance(10_000);

        for (row, id) in [(4, ""), (5, "abc"), (6, "1.5")] {
            set_id(&fx.workbook, row, id).await;
            let outcome = fx
                .journal
                .record(&edit(&format!("F{row}"), None, Some("x")))
                .await
                .unwrap();
            assert!(matches!(outcome, RecordOutcome::Rejected { .. }));
        }

        assert_eq!(journal_rows(&fx.workbook).await, before);
        assert_eq!(fx.journal.context().marker.last_edit_at(10_000), Some(0));
    }

    #[tokio::test]
    async fn test_edit_on_unknown_sheet_is_rejected() {
        let fx = setup().await;
        let event = EditEvent::new("Ghost", "F2", None, Some("1".to_string())).unwrap();
        let outcome = fx.journal.record(&event).await.unwrap();
        assert!(matches!(outcome, RecordOutcome::Rejected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_timeout_leaves_journal_untouched() {
        let fx = setup().await;
        set_id(&fx.workbook, 3, "7").await;
        fx.journal.record(&edit("F3", None, Some("a"))).await.unwrap();
        let before = journal_rows(&fx.workbook).await;
        fx.clock.advance(60_000);

        let lock = Arc::clone(&fx.journal.context().lock);
        let _held = lock.acquire(LOCK_WAIT).await.unwrap();

        let err = fx
            .journal
            .record(&edit("F3", Some("a"), Some("b")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LockTimeout { waited_ms: 5_000 }));
        assert_eq!(journal_rows(&fx.workbook).await, before);
        assert_eq!(fx.journal.context().marker.last_edit_at(60_000), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_timeout_does_not_create_journal() {
        let fx = setup().await;
        set_id(&fx.workbook, 3, "7").await;

        let lock = Arc::clone(&fx.journal.context().lock);
        let _held = lock.acquire(LOCK_WAIT).await.unwrap();

        assert!(fx.journal.record(&edit("F3", None, Some("a"))).await.is_err());
        assert!(!fx.workbook.sheet_exists(JOURNAL_SHEET_NAME).await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_requires_journal() {
        let fx = setup().await;
        assert!(matches!(
            fx.journal.pending().await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_drain_returns_records_and_keeps_header() {
        let fx = setup().await;
        set_id(&fx.workbook, 3, "7").await;
        set_id(&fx.workbook, 4, "8").await;
        fx.journal.record(&edit("F3", None, Some("a"))).await.unwrap();
        fx.journal.record(&edit("F4", None, Some("b"))).await.unwrap();

        let drained = fx.journal.drain().await.unwrap();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1].record_id, RecordId::new(8));

        let rows = journal_rows(&fx.workbook).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(is_header_row(&rows[0]));
        assert!(fx.journal.pending().await.unwrap().is_empty());

        let outcome = fx.journal.record(&edit("F3", Some("a"), Some("c"))).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Appended { row: 2 });
    }

    #[tokio::test]
    async fn test_drain_without_journal_is_empty() {
        let fx = setup().await;
        assert!(fx.journal.drain().await.unwrap().is_empty());
    }

    #[test]
    fn test_is_header_row() {
        let header: Vec<String> = JOURNAL_HEADER.iter().map(|s| (*s).to_string()).collect();
        assert!(is_header_row(&header));
        assert!(is_header_row(&header[..6]));
        assert!(!is_header_row(&[]));
        assert!(!is_header_row(&["Sheet1".to_string(), "F3".to_string()]));
        assert!(!is_header_row(&["Sheet".to_string()]));
        assert!(!is_header_row(&header[..RECORD_WIDTH - 1]));
    }

    #[tokio::test]
    async fn test_drain_does_not_keep_short_header_like_row() {
        let fx = setup().await;
        fx.workbook.insert_sheet(JOURNAL_SHEET_NAME).await.unwrap();
        fx.workbook
            .append_row(JOURNAL_SHEET_NAME, &["Sheet".to_string()])
            .await
            .unwrap();

        fx.journal.drain().await.unwrap();
        assert_eq!(journal_rows(&fx.workbook).await, Some(Rows::new()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_on_same_target_share_one_row() {
        use crate::workbook::LibSqlWorkbook;

        let workbook = Arc::new(LibSqlWorkbook::open_in_memory().await.unwrap());
        workbook.insert_sheet("Sheet1").await.unwrap();
        workbook
            .set_cell_value("Sheet1", 3, ID_COLUMN, "7")
            .await
            .unwrap();
        let journal = EditJournal::new(JournalContext::new(Arc::clone(&workbook)));

        let tasks: Vec<_> = (0..32)
            .map(|n| {
                let journal = journal.clone();
                tokio::spawn(async move {
                    let event =
                        EditEvent::new("Sheet1", "F3", None, Some(format!("v{n}"))).unwrap();
                    journal.record(&event).await
                })
            })
            .collect();

        let mut appended = 0;
        for task in tasks {
            match task.await.unwrap().unwrap() {
                RecordOutcome::Appended { row } => {
                    assert_eq!(row, 2);
                    appended += 1;
                }
                RecordOutcome::Updated { row } => assert_eq!(row, 2),
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(appended, 1);

        let rows = workbook.read_rows(JOURNAL_SHEET_NAME).await.unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(is_header_row(&rows[0]));
        assert_eq!(journal.pending().await.unwrap().len(), 1);
    }
}
