//! Spreadsheet storage capability.
//!
//! The journal only needs a handful of sheet primitives: look a sheet up,
//! create and hide it, read its whole data range, read single cells, and
//! write or append rows. Rows and columns are 1-based; a blank cell reads
//! as the empty string.

mod libsql_workbook;
mod memory;

pub use libsql_workbook::LibSqlWorkbook;
pub use memory::MemoryWorkbook;

use std::future::Future;

use crate::error::Result;

/// A grid of cell values, one `Vec` per row
pub type Rows = Vec<Vec<String>>;

/// Storage operations the journal, gate and visibility helper rely on
pub trait Workbook: Send + Sync {
    /// Whether a sheet with this name exists
    fn sheet_exists(&self, sheet: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Create an empty, visible sheet. Fails if it already exists.
    fn insert_sheet(&self, sheet: &str) -> impl Future<Output = Result<()>> + Send;

    /// Hide or show a sheet. Fails with `NotFound` if it does not exist.
    fn set_sheet_hidden(
        &self,
        sheet: &str,
        hidden: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Whether a sheet is hidden, `None` if it does not exist
    fn is_sheet_hidden(&self, sheet: &str) -> impl Future<Output = Result<Option<bool>>> + Send;

    /// Value of one cell, `None` if the sheet does not exist
    fn cell_value(
        &self,
        sheet: &str,
        row: u32,
        column: u32,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Overwrite one cell. Fails with `NotFound` if the sheet does not exist.
    fn set_cell_value(
        &self,
        sheet: &str,
        row: u32,
        column: u32,
        value: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// The sheet's data range: every row up to the last populated one, each
    /// padded to the widest populated column. `None` if the sheet does not
    /// exist.
    fn read_rows(&self, sheet: &str) -> impl Future<Output = Result<Option<Rows>>> + Send;

    /// Overwrite the leading cells of `row` with `values`, leaving later
    /// columns untouched
    fn write_row(
        &self,
        sheet: &str,
        row: u32,
        values: &[String],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Write `values` to the row after the last populated one, returning
    /// its 1-based index
    fn append_row(&self, sheet: &str, values: &[String])
        -> impl Future<Output = Result<u32>> + Send;

    /// Delete every row after the first `keep` rows
    fn truncate_rows(&self, sheet: &str, keep: u32) -> impl Future<Output = Result<()>> + Send;
}

/// Pad ragged rows into the rectangular data range
fn into_data_range(mut rows: Rows) -> Rows {
    while rows
        .last()
        .is_some_and(|row| row.iter().all(String::is_empty))
    {
        rows.pop();
    }

    let width = rows
        .iter()
        .filter_map(|row| row.iter().rposition(|cell| !cell.is_empty()))
        .max()
        .map_or(0, |index| index + 1);

    for row in &mut rows {
        row.resize(width, String::new());
    }
    rows
}
