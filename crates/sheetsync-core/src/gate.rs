//! Readiness gate for downstream batch syncs

use crate::config::{INACTIVITY_DELAY_MS, JOURNAL_SHEET_NAME};
use crate::context::JournalContext;
use crate::journal::is_header_row;
use crate::models::{GateError, NotReadyReason, Readiness};
use crate::workbook::Workbook;

/// Read-only check combining "journal non-empty" with "quiet period elapsed".
///
/// Takes no lock and writes nothing. The journal touches the marker before
/// writing a row, so a check racing a write can only lean toward not-ready.
pub struct SyncGate<W> {
    ctx: JournalContext<W>,
}

impl<W> Clone for SyncGate<W> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
        }
    }
}

impl<W: Workbook> SyncGate<W> {
    pub const fn new(ctx: JournalContext<W>) -> Self {
        Self { ctx }
    }

    /// Evaluate readiness. Never fails: storage errors are logged and
    /// reported as a missing journal.
    pub async fn check_readiness(&self) -> Readiness {
        let rows = match self.ctx.workbook.read_rows(JOURNAL_SHEET_NAME).await {
            Ok(Some(rows)) => rows,
            Ok(None) => return Readiness::Error(GateError::JournalNotFound),
            Err(error) => {
                tracing::error!(%error, "Failed to read journal for readiness check");
                return Readiness::Error(GateError::JournalNotFound);
            }
        };

        let has_changes = rows
            .iter()
            .skip_while(|row| is_header_row(row))
            .any(|row| row.iter().any(|cell| !cell.is_empty()));
        if !has_changes {
            return Readiness::NotReady(NotReadyReason::NoChanges);
        }

        let now = self.ctx.now_millis();
        let last_edit_at = self.ctx.marker.last_edit_at(now).unwrap_or(0);
        if now.saturating_sub(last_edit_at) <= INACTIVITY_DELAY_MS {
            return Readiness::NotReady(NotReadyReason::WaitingPeriod);
        }

        Readiness::Ready
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{ID_COLUMN, JOURNAL_HEADER};
    use crate::journal::EditJournal;
    use crate::models::EditEvent;
    use crate::workbook::MemoryWorkbook;

    struct Fixture {
        workbook: Arc<MemoryWorkbook>,
        clock: Arc<ManualClock>,
        journal: EditJournal<MemoryWorkbook>,
        gate: SyncGate<MemoryWorkbook>,
    }

    async fn setup(start: i64) -> Fixture {
        let workbook = Arc::new(MemoryWorkbook::new());
        workbook.insert_sheet("Sheet1").await.unwrap();
        workbook
            .set_cell_value("Sheet1", 3, ID_COLUMN, "7")
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let ctx = JournalContext::with_clock(workbook.clone(), clock.clone());
        Fixture {
            workbook,
            clock,
            journal: EditJournal::new(ctx.clone()),
            gate: SyncGate::new(ctx),
        }
    }

    fn edit(old: &str, new: &str) -> EditEvent {
        EditEvent::new("Sheet1", "F3", Some(old.to_string()), Some(new.to_string())).unwrap()
    }

    const WAITING: Readiness = Readiness::NotReady(NotReadyReason::WaitingPeriod);

    #[tokio::test]
    async fn test_missing_journal_reports_error_literal() {
        let fx = setup(0).await;
        let verdict = fx.gate.check_readiness().await;
        assert_eq!(verdict, Readiness::Error(GateError::JournalNotFound));
        assert_eq!(verdict.as_str(), "error: hidden sheet not found");
    }

    #[tokio::test]
    async fn test_header_only_journal_has_no_changes() {
        let fx = setup(0).await;
        fx.journal.record(&edit("", "1")).await.unwrap();
        fx.journal.drain().await.unwrap();
        fx.clock.advance(INACTIVITY_DELAY_MS * 10);

        assert_eq!(
            fx.gate.check_readiness().await,
            Readiness::NotReady(NotReadyReason::NoChanges)
        );
    }

    #[tokio::test]
    async fn test_blank_journal_has_no_changes_regardless_of_marker() {
        let fx = setup(1_000_000).await;
        fx.workbook.insert_sheet(JOURNAL_SHEET_NAME).await.unwrap();
        fx.journal.context().marker.touch(0);

        assert_eq!(
            fx.gate.check_readiness().await,
            Readiness::NotReady(NotReadyReason::NoChanges)
        );
    }

    #[tokio::test]
    async fn test_readiness_window_boundaries() {
        let t0 = 1_700_000_000_000;
        let fx = setup(t0).await;
        fx.journal.record(&edit("", "120")).await.unwrap();

        fx.clock.set(t0 + INACTIVITY_DELAY_MS - 1);
        assert_eq!(fx.gate.check_readiness().await, WAITING);

        fx.clock.set(t0 + INACTIVITY_DELAY_MS);
        assert_eq!(fx.gate.check_readiness().await, WAITING);

        fx.clock.set(t0 + INACTIVITY_DELAY_MS + 1);
        assert_eq!(fx.gate.check_readiness().await, Readiness::Ready);
    }

    #[tokio::test]
    async fn test_journal_without_marker_is_ready() {
        let fx = setup(1_700_000_000_000).await;
        fx.workbook.insert_sheet(JOURNAL_SHEET_NAME).await.unwrap();
        let header: Vec<String> = JOURNAL_HEADER.iter().map(|s| (*s).to_string()).collect();
        fx.workbook
            .append_row(JOURNAL_SHEET_NAME, &header)
            .await
            .unwrap();
        fx.workbook
            .append_row(JOURNAL_SHEET_NAME, &["Sheet1".to_string(), "F3".to_string()])
            .await
            .unwrap();

        assert_eq!(fx.gate.check_readiness().await, Readiness::Ready);
    }

    #[tokio::test]
    async fn test_short_row_matching_header_prefix_counts_as_change() {
        let fx = setup(1_700_000_000_000).await;
        fx.workbook.insert_sheet(JOURNAL_SHEET_NAME).await.unwrap();
        fx.workbook
            .append_row(JOURNAL_SHEET_NAME, &["Sheet".to_string()])
            .await
            .unwrap();

        assert_eq!(fx.gate.check_readiness().await, Readiness::Ready);
    }

    #[tokio::test]
    async fn test_debounce_scenario() {
        let fx = setup(0).await;

        fx.journal.record(&edit("", "120")).await.unwrap();
        assert_eq!(fx.journal.context().marker.last_edit_at(0), Some(0));

        fx.clock.set(30_000);
        fx.journal.record(&edit("120", "150")).await.unwrap();
        let pending = fx.journal.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].new_value, "150");

        fx.clock.set(31_000);
        assert_eq!(fx.gate.check_readiness().await, WAITING);

        fx.clock.set(211_000);
        assert_eq!(fx.gate.check_readiness().await, Readiness::Ready);
    }

    #[tokio::test]
    async fn test_check_is_side_effect_free() {
        let fx = setup(0).await;
        fx.journal.record(&edit("", "120")).await.unwrap();
        let before = fx.workbook.read_rows(JOURNAL_SHEET_NAME).await.unwrap();

        for _ in 0..3 {
            fx.gate.check_readiness().await;
        }

        assert_eq!(
            fx.workbook.read_rows(JOURNAL_SHEET_NAME).await.unwrap(),
            before
        );
        assert!(!fx.journal.context().lock.is_locked());
    }
}
