//! ZIP archive helpers for OOXML packages (.xlsx, .xlsm)

use crate::error::SheetError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Part lookup within an OOXML package
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Returns the stored name of a part, matched case-insensitively with `\` read as `/`
    fn part_name(&self, name: &str) -> Option<String>;

    /// Gets a part by name, `None` when the package has no such part
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetError>;

    /// Creates an XML reader over a part
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn part_name(&self, name: &str) -> Option<String> {
        let pattern = name.replace('\\', "/");
        self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(file_name))
            .map(|file_name| file_name.to_owned())
    }

    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetError> {
        match self.part_name(name).map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }
}
