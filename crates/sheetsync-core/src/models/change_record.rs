//! Change record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::RECORD_WIDTH;
use crate::error::{Error, Result};

/// Business entity identifier read from the id column of an edited row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Wrap a raw integer id
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    /// Parse an id cell.
    ///
    /// Spreadsheet number cells may render integers as `7.0`, so integral
    /// floats are accepted. Empty cells, zero, fractions and text are not.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("record id is empty".to_string()));
        }

        let value = match trimmed.parse::<i64>() {
            Ok(value) => value,
            Err(_) => parse_integral_float(trimmed).ok_or_else(|| {
                Error::InvalidInput(format!("record id {trimmed:?} is not an integer"))
            })?,
        };

        if value == 0 {
            return Err(Error::InvalidInput("record id must not be zero".to_string()));
        }

        Ok(Self(value))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn parse_integral_float(value: &str) -> Option<i64> {
    let float = value.parse::<f64>().ok()?;
    if !float.is_finite() || float.fract() != 0.0 {
        return None;
    }
    if float < i64::MIN as f64 || float > i64::MAX as f64 {
        return None;
    }
    Some(float as i64)
}

/// One pending edit to a logical field, as stored in the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Sheet the edit originated from
    pub sheet_name: String,
    /// A1 address of the edited cell (e.g. `F12`)
    pub cell_address: String,
    /// Value before the edit, empty when there was none
    pub old_value: String,
    /// Value after the edit
    pub new_value: String,
    /// Business entity the edited row belongs to
    pub record_id: RecordId,
    /// ISO-8601 time the edit was journaled
    pub timestamp: String,
}

impl ChangeRecord {
    /// Check whether this record and a journal row describe the same
    /// `(sheet, cell, id)` triple.
    pub fn same_target(&self, row: &[String]) -> bool {
        row.first().is_some_and(|sheet| *sheet == self.sheet_name)
            && row.get(1).is_some_and(|cell| *cell == self.cell_address)
            && row
                .get(4)
                .and_then(|id| id.parse::<RecordId>().ok())
                .is_some_and(|id| id == self.record_id)
    }

    /// Render the journal row for this record
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.sheet_name.clone(),
            self.cell_address.clone(),
            self.old_value.clone(),
            self.new_value.clone(),
            self.record_id.to_string(),
            self.timestamp.clone(),
        ]
    }

    /// Parse a journal row, returning `None` for rows that do not hold a
    /// record (blank rows, the header).
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < RECORD_WIDTH {
            return None;
        }
        let record_id = row[4].parse().ok()?;
        Some(Self {
            sheet_name: row[0].clone(),
            cell_address: row[1].clone(),
            old_value: row[2].clone(),
            new_value: row[3].clone(),
            record_id,
            timestamp: row[5].clone(),
        })
    }
}
