//! In-process workbook

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{into_data_range, Rows, Workbook};
use crate::error::{Error, Result};

#[derive(Debug, Default, Clone)]
struct MemorySheet {
    hidden: bool,
    rows: Rows,
}

impl MemorySheet {
    fn set_cell(&mut self, row: u32, column: u32, value: &str) {
        let row_index = index(row);
        let column_index = index(column);
        if self.rows.len() <= row_index {
            self.rows.resize_with(row_index + 1, Vec::new);
        }
        let cells = &mut self.rows[row_index];
        if cells.len() <= column_index {
            cells.resize(column_index + 1, String::new());
        }
        cells[column_index] = value.to_string();
    }

    fn last_populated_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
            .map_or(0, |index| index + 1)
    }
}

/// Workbook held entirely in memory.
///
/// Lost on restart; used by tests and hosts that run without a database.
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: Mutex<HashMap<String, MemorySheet>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    fn sheets(&self) -> MutexGuard<'_, HashMap<String, MemorySheet>> {
        self.sheets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn index(one_based: u32) -> usize {
    usize::try_from(one_based.saturating_sub(1)).unwrap_or(usize::MAX)
}

fn not_found(sheet: &str) -> Error {
    Error::NotFound(format!("sheet {sheet:?}"))
}

impl Workbook for MemoryWorkbook {
    async fn sheet_exists(&self, sheet: &str) -> Result<bool> {
        Ok(self.sheets().contains_key(sheet))
    }

    async fn insert_sheet(&self, sheet: &str) -> Result<()> {
        let mut sheets = self.sheets();
        if sheets.contains_key(sheet) {
            return Err(Error::InvalidInput(format!(
                "sheet {sheet:?} already exists"
            )));
        }
        sheets.insert(sheet.to_string(), MemorySheet::default());
        Ok(())
    }

    async fn set_sheet_hidden(&self, sheet: &str, hidden: bool) -> Result<()> {
        let mut sheets = self.sheets();
        let entry = sheets.get_mut(sheet).ok_or_else(|| not_found(sheet))?;
        entry.hidden = hidden;
        Ok(())
    }

    async fn is_sheet_hidden(&self, sheet: &str) -> Result<Option<bool>> {
        Ok(self.sheets().get(sheet).map(|entry| entry.hidden))
    }

    async fn cell_value(&self, sheet: &str, row: u32, column: u32) -> Result<Option<String>> {
        let sheets = self.sheets();
        let Some(entry) = sheets.get(sheet) else {
            return Ok(None);
        };
        let value = entry
            .rows
            .get(index(row))
            .and_then(|cells| cells.get(index(column)))
            .cloned()
            .unwrap_or_default();
        Ok(Some(value))
    }

    async fn set_cell_value(&self, sheet: &str, row: u32, column: u32, value: &str) -> Result<()> {
        let mut sheets = self.sheets();
        let entry = sheets.get_mut(sheet).ok_or_else(|| not_found(sheet))?;
        entry.set_cell(row, column, value);
        Ok(())
    }

    async fn read_rows(&self, sheet: &str) -> Result<Option<Rows>> {
        Ok(self
            .sheets()
            .get(sheet)
            .map(|entry| into_data_range(entry.rows.clone())))
    }

    async fn write_row(&self, sheet: &str, row: u32, values: &[String]) -> Result<()> {
        let mut sheets = self.sheets();
        let entry = sheets.get_mut(sheet).ok_or_else(|| not_found(sheet))?;
        for (column, value) in (1..).zip(values) {
            entry.set_cell(row, column, value);
        }
        Ok(())
    }

    async fn append_row(&self, sheet: &str, values: &[String]) -> Result<u32> {
        let mut sheets = self.sheets();
        let entry = sheets.get_mut(sheet).ok_or_else(|| not_found(sheet))?;
        let row = u32::try_from(entry.last_populated_row() + 1)
            .map_err(|_| Error::InvalidInput("sheet row limit reached".into()))?;
        for (column, value) in (1..).zip(values) {
            entry.set_cell(row, column, value);
        }
        Ok(row)
    }

    async fn truncate_rows(&self, sheet: &str, keep: u32) -> Result<()> {
        let mut sheets = self.sheets();
        let entry = sheets.get_mut(sheet).ok_or_else(|| not_found(sheet))?;
        entry.rows.truncate(usize::try_from(keep).unwrap_or(usize::MAX));
        Ok(())
    }
}
