//! Show or hide sheets by name

use crate::config::JOURNAL_SHEET_NAME;
use crate::error::Result;
use crate::workbook::Workbook;

/// Hide or show `sheet`. Fails with `NotFound` if it does not exist.
pub async fn toggle_sheet_visibility<W: Workbook>(
    workbook: &W,
    sheet: &str,
    hidden: bool,
) -> Result<()> {
    workbook.set_sheet_hidden(sheet, hidden).await?;
    tracing::info!(sheet, hidden, "Sheet visibility changed");
    Ok(())
}

pub async fn hide_journal<W: Workbook>(workbook: &W) -> Result<()> {
    toggle_sheet_visibility(workbook, JOURNAL_SHEET_NAME, true).await
}

pub async fn show_journal<W: Workbook>(workbook: &W) -> Result<()> {
    toggle_sheet_visibility(workbook, JOURNAL_SHEET_NAME, false).await
}
