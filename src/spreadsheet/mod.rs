//! # Spreadsheet Access Module
//!
//! Reading worksheets out of Office Open XML packages (.xlsx, .xlsm) and
//! patching individual cells of a template package. Cells are exposed through
//! a format-neutral [`Sheet`] so the lookup logic never touches XML.
use crate::error::SheetError;
use std::path::Path;
use thiserror::Error;

pub mod cell;
pub(crate) mod excel;
pub mod patch;
pub mod reference;
pub mod sheet;
pub mod xlsx;

pub use cell::Cell;
pub use cell::CellType;
pub use reference::CellAddress;
pub use reference::Column;
pub use sheet::Sheet;
pub use xlsx::XlsxSpreadsheet;

/// Spreadsheet-level failures, independent of the underlying zip and XML errors.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Required part '{0}' missing from package")]
    FileError(String),

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Spreadsheet '{0}' contains no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Spreadsheet '{0}' is password protected or a legacy binary workbook")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Unsupported spreadsheet format '{0}', expected .xlsx or .xlsm")]
    UnsupportedFormat(String),

    #[error("Malformed worksheet '{0}': {1}")]
    MalformedSheet(String, String),

    #[error("Invalid cell reference '{0}'")]
    InvalidReference(String),
}

/// A source of named worksheets.
pub trait Spreadsheet {
    /// Name used in diagnostics, usually the file path
    fn name(&self) -> String;

    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Reads every populated cell of the named sheet
    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, SheetError>;
}

/// Opens a spreadsheet file, choosing the reader from the extension.
pub fn open(path: &Path) -> Result<Box<dyn Spreadsheet>, SheetError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => Ok(Box::new(XlsxSpreadsheet::open(path)?)),
        _ => {
            // a missing file is reported as such whatever its extension
            std::fs::metadata(path)?;
            Err(SpreadsheetError::UnsupportedFormat(path.display().to_string()))?
        }
    }
}

/// Sheets held in memory, for callers that already have the cell data.
#[derive(Clone, Debug, Default)]
pub struct InMemorySpreadsheet {
    pub name: String,
    pub sheets: Vec<Sheet>,
}

impl InMemorySpreadsheet {
    pub fn new(name: &str, sheets: Vec<Sheet>) -> Self {
        InMemorySpreadsheet { name: name.to_owned(), sheets }
    }
}

impl Spreadsheet for InMemorySpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.to_owned()).collect()
    }

    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, SheetError> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name == sheet_name)
            .cloned()
            .ok_or_else(|| SpreadsheetError::SheetNotFound(sheet_name.to_owned()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_is_rejected() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("customers.ods");
        std::fs::write(&path, b"").unwrap();
        let error = open(&path).err().unwrap();
        assert!(matches!(
            error,
            SheetError::SpreadsheetError(SpreadsheetError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_xlsx_is_io_not_found() {
        let error = open(Path::new("does-not-exist.xlsx")).err().unwrap();
        assert!(error.is_not_found());
        let error = open(Path::new("does-not-exist.ods")).err().unwrap();
        assert!(error.is_not_found());
    }

    #[test]
    fn in_memory_sheet_lookup() {
        let mut spreadsheet = InMemorySpreadsheet::new(
            "memory",
            vec![Sheet::new("Sheet1"), Sheet::new("Sheet2")],
        );
        assert_eq!(spreadsheet.sheet_names(), ["Sheet1", "Sheet2"]);
        assert_eq!(spreadsheet.read_sheet("Sheet2").unwrap().name, "Sheet2");
        assert!(spreadsheet.read_sheet("Sheet3").is_err());
    }
}
