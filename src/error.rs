use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Low-level error raised while reading or patching a spreadsheet package.
/// Aggregates errors from the standard library, zip, quick-xml and internal modules.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),
}

impl SheetError {
    /// True when the underlying cause is a file that does not exist.
    pub(crate) fn is_not_found(&self) -> bool {
        match self {
            SheetError::IoError(error) => error.kind() == std::io::ErrorKind::NotFound,
            SheetError::ZipError(zip::result::ZipError::Io(error)) => {
                error.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetError::WithContextError(format!("{}: {}", message, e)))
    }
}

/// Faults reported at the boundary of one user action.
///
/// Every variant is recoverable: the caller reports it and the user may retry
/// after fixing the input. Zero or several search hits are not faults, see
/// [`crate::lookup::LookupOutcome`].
#[derive(Error, Debug)]
pub enum PickupError {
    #[error("Data source '{}' not found", path.display())]
    DataSourceNotFound { path: PathBuf },

    #[error("Data source '{}' is unreadable: {source}", path.display())]
    DataSourceUnreadable {
        path: PathBuf,
        #[source]
        source: SheetError,
    },

    #[error("Template '{}' not found", path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("Template '{}' is unreadable: {source}", path.display())]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: SheetError,
    },

    #[error("Write output '{}' failed: {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: SheetError,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PickupError {
    /// Classifies a failure to open or read the lookup table.
    pub(crate) fn data_source(path: &Path, error: SheetError) -> Self {
        if error.is_not_found() {
            PickupError::DataSourceNotFound { path: path.to_owned() }
        } else {
            PickupError::DataSourceUnreadable { path: path.to_owned(), source: error }
        }
    }

    /// Classifies a failure to open or read the output template.
    pub(crate) fn template(path: &Path, error: SheetError) -> Self {
        if error.is_not_found() {
            PickupError::TemplateNotFound { path: path.to_owned() }
        } else {
            PickupError::TemplateUnreadable { path: path.to_owned(), source: error }
        }
    }

    pub(crate) fn output(path: &Path, error: impl Into<SheetError>) -> Self {
        PickupError::OutputWriteFailed { path: path.to_owned(), source: error.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn missing_file_classified_as_not_found() {
        let error = SheetError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(
            PickupError::data_source(Path::new("a.xlsx"), error),
            PickupError::DataSourceNotFound { .. }
        ));

        let error = SheetError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(
            PickupError::template(Path::new("t.xlsx"), error),
            PickupError::TemplateNotFound { .. }
        ));
    }

    #[test]
    fn other_failures_classified_as_unreadable() {
        let error = SheetError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(
            PickupError::data_source(Path::new("a.xlsx"), error),
            PickupError::DataSourceUnreadable { .. }
        ));

        let error = SheetError::from(zip::result::ZipError::InvalidArchive("bad".into()));
        assert!(matches!(
            PickupError::template(Path::new("t.xlsx"), error),
            PickupError::TemplateUnreadable { .. }
        ));
    }

    #[test]
    fn with_prefix_keeps_message() {
        let result: Result<(), SheetError> = Err(SheetError::WithContextError("inner".to_owned()));
        let message = result.with_prefix("outer").unwrap_err().to_string();
        assert_eq!(message, "outer: inner");
    }
}
