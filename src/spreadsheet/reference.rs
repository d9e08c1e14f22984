//! A1-style cell references.
//!
//! Rows and columns are zero-based internally; `(0, 0)` is `A1` and column
//! `B` is index 1.

use crate::spreadsheet::SpreadsheetError;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;

/// Converts a zero-based column index to letters (0 -> "A", 26 -> "AA").
pub fn index_to_col(col: usize) -> String {
    let mut col = col + 1;
    let mut letters = Vec::new();
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts zero-based indexes to a reference such as "C2".
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

/// Parses column letters (case-insensitive) to a zero-based index.
pub fn col_to_index(col: &str) -> Option<usize> {
    if col.is_empty() || col.len() > 3 {
        return None;
    }
    col.bytes().try_fold(0usize, |index, byte| {
        byte.is_ascii_alphabetic()
            .then(|| index * 26 + (byte.to_ascii_uppercase() - b'A') as usize + 1)
    })
    .map(|index| index - 1)
}

/// Parses a one-based row number to a zero-based index.
pub fn row_to_index(row: &str) -> Option<usize> {
    match row.parse::<usize>() {
        Ok(row) if row > 0 => Some(row - 1),
        _ => None,
    }
}

/// Parses a reference such as "C2" or "$c$2" to zero-based `(row, col)`.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (col, row) = reference.split_at(split);
    Some((row_to_index(row)?, col_to_index(col)?))
}

/// A single cell position, ordered row-major.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    pub const fn new(row: usize, col: usize) -> Self {
        CellAddress { row, col }
    }
}

impl FromStr for CellAddress {
    type Err = SpreadsheetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        reference_to_index(value.trim())
            .map(|(row, col)| CellAddress { row, col })
            .ok_or_else(|| SpreadsheetError::InvalidReference(value.to_owned()))
    }
}

impl TryFrom<String> for CellAddress {
    type Error = SpreadsheetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellAddress> for String {
    fn from(address: CellAddress) -> Self {
        address.to_string()
    }
}

impl Display for CellAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", index_to_reference(self.row, self.col))
    }
}

/// A whole column, written as letters in configuration ("B").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Column(pub usize);

impl FromStr for Column {
    type Err = SpreadsheetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        col_to_index(value.trim())
            .map(Column)
            .ok_or_else(|| SpreadsheetError::InvalidReference(value.to_owned()))
    }
}

impl TryFrom<String> for Column {
    type Error = SpreadsheetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Column> for String {
    fn from(column: Column) -> Self {
        index_to_col(column.0)
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&index_to_col(self.0))
    }
}
