//! Inbound cell edit events

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;

use crate::error::{Error, Result};

static A1_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{1,3})([1-9][0-9]*)$").expect("Invalid regex"));

/// Edit event in the shape the spreadsheet host delivers it.
///
/// ```json
/// { "range": { "column": 6, "row": 3, "a1Notation": "F3" }, "oldValue": "120", "value": "150" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformEditEvent {
    pub range: PlatformRange,
    #[serde(default, deserialize_with = "deserialize_cell_text")]
    pub old_value: Option<String>,
    #[serde(default, deserialize_with = "deserialize_cell_text")]
    pub value: Option<String>,
}

/// Single-cell range of a [`PlatformEditEvent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRange {
    pub column: u32,
    pub row: u32,
    pub a1_notation: String,
}

/// Validated edit of a single cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
    /// Sheet the edit happened on
    pub sheet_name: String,
    /// 1-based row
    pub row: u32,
    /// 1-based column
    pub column: u32,
    /// A1 address of the cell
    pub cell_address: String,
    /// Value before the edit, if the cell had one
    pub old_value: Option<String>,
    /// Value after the edit, `None` when the cell was cleared
    pub new_value: Option<String>,
}

impl EditEvent {
    /// Build an event for a cell, deriving row and column from its address
    pub fn new(
        sheet_name: impl Into<String>,
        cell_address: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Result<Self> {
        let cell_address = cell_address.trim().to_ascii_uppercase();
        let (row, column) = parse_a1(&cell_address)?;
        Self::validated(
            sheet_name.into(),
            row,
            column,
            cell_address,
            old_value,
            new_value,
        )
    }

    /// Validate a host event for the given sheet
    pub fn from_platform(sheet_name: impl Into<String>, event: PlatformEditEvent) -> Result<Self> {
        Self::validated(
            sheet_name.into(),
            event.range.row,
            event.range.column,
            event.range.a1_notation,
            event.old_value,
            event.value,
        )
    }

    fn validated(
        sheet_name: String,
        row: u32,
        column: u32,
        cell_address: String,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Result<Self> {
        if sheet_name.trim().is_empty() {
            return Err(Error::InvalidInput("sheet name must not be empty".into()));
        }
        if row == 0 || column == 0 {
            return Err(Error::InvalidInput(format!(
                "row and column are 1-based, got row {row} column {column}"
            )));
        }

        let cell_address = cell_address.trim().to_ascii_uppercase();
        let (address_row, address_column) = parse_a1(&cell_address)?;
        if address_row != row || address_column != column {
            return Err(Error::InvalidInput(format!(
                "address {cell_address} does not match row {row} column {column}"
            )));
        }

        Ok(Self {
            sheet_name,
            row,
            column,
            cell_address,
            old_value,
            new_value,
        })
    }
}

/// Parse an A1 address into 1-based `(row, column)`
pub fn parse_a1(address: &str) -> Result<(u32, u32)> {
    let invalid = || Error::InvalidInput(format!("invalid cell address {address:?}"));
    let captures = A1_PATTERN.captures(address).ok_or_else(invalid)?;

    let column = captures[1]
        .bytes()
        .fold(0_u32, |acc, letter| acc * 26 + u32::from(letter - b'A') + 1);
    let row = captures[2].parse::<u32>().map_err(|_| invalid())?;
    Ok((row, column))
}

/// Accept strings, numbers and booleans for cell values; hosts send numeric
/// cells as JSON numbers.
fn deserialize_cell_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) => Ok(Some(text)),
        Some(serde_json::Value::Number(number)) => Ok(Some(number.to_string())),
        Some(serde_json::Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "cell value must be a scalar, got {other}"
        ))),
    }
}
