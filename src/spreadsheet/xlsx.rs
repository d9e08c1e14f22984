use crate::error::ResultMessage;
use crate::error::SheetError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::FileReader;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_CUSTOM_FORMATS: &[u8] = b"numFmts"; // Custom number formats container
const TAG_CUSTOM_FORMAT: &[u8] = b"numFmt";   // Individual custom number format
const TAG_FORMAT_INDEXES: &[u8] = b"cellXfs";  // Cell format indexes container
const TAG_FORMAT_INDEX: &[u8] = b"xf";         // Individual cell format index
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";   // Shared string table item
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";       // Phonetic text for Asian languages
const TAG_TEXT: &[u8] = b"t";                  // Text content within strings
const TAG_ROW: &[u8] = b"row";                 // Row in worksheet
const TAG_CELL: &[u8] = b"c";                  // Cell in worksheet
const TAG_INLINE_STRING: &[u8] = b"is";        // Inline string value
const TAG_VALUE: &[u8] = b"v";                 // Cell value content

/// An Excel 2007+ workbook opened for reading
pub struct XlsxSpreadsheet<R: Read + Seek = FileReader> {
    /// File name of the spreadsheet
    name: String,
    /// ZIP archive containing the package parts
    zip: ZipArchive<R>,
    /// Cell type per style index, for date detection
    number_formats: Vec<CellType>,
    /// Worksheets as (name, zip_path) pairs
    sheets: Vec<(String, String)>,
    /// Shared string table, loaded on first sheet read
    shared_strings: Option<Vec<String>>,
}

impl XlsxSpreadsheet<FileReader> {
    /// Opens an XLSX file read-only; the handle is released when the value drops.
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        debug!(path = %path.display(), "opening workbook");
        let zip = excel::open_file(path)?;
        Self::from_archive(&path.display().to_string(), zip)
    }
}

impl<R: Read + Seek> XlsxSpreadsheet<R> {
    /// Opens a workbook from an in-memory or other seekable reader.
    pub fn from_reader(name: &str, reader: R) -> Result<Self, SheetError> {
        let zip = excel::open_package(name, reader)?;
        Self::from_archive(name, zip)
    }

    fn from_archive(name: &str, mut zip: ZipArchive<R>) -> Result<Self, SheetError> {
        let (sheets, is_1904) = excel::load_workbook(&mut zip).with_prefix("read workbook")?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, is_1904).with_prefix("read styles")?;
        Ok(XlsxSpreadsheet {
            name: name.to_owned(),
            zip,
            number_formats,
            sheets,
            shared_strings: None,
        })
    }

    fn take_shared_strings(&mut self) -> Result<Vec<String>, SheetError> {
        match self.shared_strings.take() {
            Some(shared_strings) => Ok(shared_strings),
            None => load_shared_strings(&mut self.zip).with_prefix("read shared strings"),
        }
    }
}

impl<R: Read + Seek> Spreadsheet for XlsxSpreadsheet<R> {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Streams the worksheet part and collects every cell that carries a value.
    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, SheetError> {
        let zip_path = self.sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, path)| path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound(sheet_name.to_owned()))?;
        let shared_strings = self.take_shared_strings()?;

        let mut sheet = Sheet::new(sheet_name);
        let result = read_cells(&mut self.zip, &zip_path, &self.number_formats, &shared_strings, &mut sheet);
        self.shared_strings = Some(shared_strings);
        result.with_prefix(&format!("read sheet '{sheet_name}'"))?;

        debug!(sheet = sheet_name, cells = sheet.len(), "sheet loaded");
        Ok(sheet)
    }
}

fn read_cells<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    zip_path: &str,
    number_formats: &[CellType],
    shared_strings: &[String],
    sheet: &mut Sheet,
) -> Result<(), SheetError> {
    let mut reader = zip.xml_reader(zip_path)?
        .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = CellType::default();
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
            if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                row_count = number.saturating_sub(1);
            }
            col_count = 0;
        }
        Event::End(event) if event.local_name().as_ref() == TAG_ROW => {
            row_count += 1;
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count = col + 1;
            value.clear();
            kind = event.get_attribute_value("t")?.map(|t| {
                match t.as_ref() {
                    "inlineStr" | "str" => CellType::String,
                    "s" => CellType::SharedString,
                    "d" => CellType::IsoDateTime,
                    "b" => CellType::Boolean,
                    "e" => CellType::Error,
                    _ => CellType::Number,
                }
            }).unwrap_or(CellType::Number);
            if kind == CellType::Number {
                if let Some(format_id) = event.parse_attribute_value::<usize>("s")? {
                    kind = number_formats.get(format_id).copied().unwrap_or(CellType::Number);
                }
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
            if !value.is_empty() {
                if kind == CellType::SharedString {
                    let index = value.trim().parse::<usize>()?;
                    value = shared_strings.get(index).cloned().ok_or_else(|| {
                        SpreadsheetError::MalformedSheet(
                            zip_path.to_owned(),
                            format!("shared string {index} out of range"),
                        )
                    })?;
                    kind = CellType::String;
                }
                if !value.is_empty() {
                    sheet.push(Cell::new(row, col, kind, std::mem::take(&mut value)));
                }
            }
            kind = CellType::default();
        },
    });
    Ok(())
}

/// Loads the whole shared string table; a package without one has none.
fn load_shared_strings<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Vec<String>, SheetError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };

    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
            let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.push(string);
        }
    });
    Ok(shared_strings)
}

/// Loads cell style indexes from styles.xml, resolving which ones are date formats
fn load_number_formats<R: Read + Seek>(zip: &mut ZipArchive<R>, is_1904: bool) -> Result<Vec<CellType>, SheetError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();

    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.local_name().as_ref() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                let style = CellType::parse_custom_number_format(&format, is_1904);
                custom_formats.insert(id.to_string(), style);
            }
        }

        Event::Start(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.local_name().as_ref() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.unwrap_or_default();
            format_indexes.push(id.to_string());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Reads string content up to `end_tag`, skipping phonetic runs.
///
/// `is_text_content` treats bare text as content (as in `<v>`); otherwise only
/// text inside `<t>` counts (as in `<si>` and `<is>`).
fn read_string_value<B: BufRead>(
    reader: &mut XmlReader<B>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, SheetError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/><sheet name="Sheet2" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;

    const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    const STYLES: &str = r#"<styleSheet><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy/m/d"/></numFmts>
<cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="22"/></cellXfs></styleSheet>"#;

    const SHARED_STRINGS: &str = r#"<sst><si><t>张三</t></si><si><r><t>北京</t></r><r><t>市</t></r></si><si><t>李四</t><rPh><t>リシ</t></rPh></si></sst>"#;

    const SHEET2: &str = r#"<worksheet><sheetData>
<row r="5"><c r="B5" t="s"><v>0</v></c></row>
<row r="6"><c r="B6"><v>13800000000</v></c></row>
<row r="7"><c r="B7" t="s"><v>1</v></c></row>
<row r="8"><c r="B8" t="inlineStr"><is><t>VIP &amp; 常客</t></is></c><c r="C8" s="1"><v>45413</v></c></row>
<row r="9"><c r="B9" t="s"><v>2</v></c><c r="C9" t="b"><v>1</v></c><c r="D9" s="0"/></row>
<row r="10"><c r="B10" t="str"><f>A1</f><v>公式</v></c><c r="C10" s="2"><v>45413.25</v></c></row>
</sheetData></worksheet>"#;

    fn package(with_shared_strings: bool) -> Cursor<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut parts = vec![
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/styles.xml", STYLES),
            ("xl/worksheets/sheet1.xml", "<worksheet><sheetData/></worksheet>"),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ];
        if with_shared_strings {
            parts.push(("xl/sharedStrings.xml", SHARED_STRINGS));
        }
        for (name, content) in parts {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn lists_sheets_through_relationships() {
        let spreadsheet = XlsxSpreadsheet::from_reader("memory.xlsx", package(true)).unwrap();
        assert_eq!(spreadsheet.sheet_names(), ["Sheet1", "Sheet2"]);
        assert_eq!(spreadsheet.sheets[1].1, "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn reads_cells_as_text() {
        let mut spreadsheet = XlsxSpreadsheet::from_reader("memory.xlsx", package(true)).unwrap();
        let sheet = spreadsheet.read_sheet("Sheet2").unwrap();

        assert_eq!(sheet.text(4, 1).as_deref(), Some("张三"));
        assert_eq!(sheet.text(5, 1).as_deref(), Some("13800000000"));
        assert_eq!(sheet.text(6, 1).as_deref(), Some("北京市"));
        assert_eq!(sheet.text(7, 1).as_deref(), Some("VIP & 常客"));
        assert_eq!(sheet.text(7, 2).as_deref(), Some("2024-05-01"));
        assert_eq!(sheet.text(8, 1).as_deref(), Some("李四"));
        assert_eq!(sheet.text(8, 2).as_deref(), Some("TRUE"));
        assert_eq!(sheet.text(8, 3), None);
        assert_eq!(sheet.text(9, 1).as_deref(), Some("公式"));
        assert_eq!(sheet.text(9, 2).as_deref(), Some("2024-05-01 06:00:00"));
        assert_eq!(sheet.max_row(), Some(9));
    }

    #[test]
    fn empty_sheet_and_missing_sheet() {
        let mut spreadsheet = XlsxSpreadsheet::from_reader("memory.xlsx", package(true)).unwrap();
        assert!(spreadsheet.read_sheet("Sheet1").unwrap().is_empty());
        assert!(spreadsheet.read_sheet("Sheet9").is_err());
        // shared strings survive a failed read
        assert_eq!(spreadsheet.read_sheet("Sheet2").unwrap().text(4, 1).as_deref(), Some("张三"));
    }

    #[test]
    fn dangling_shared_string_is_malformed() {
        let mut spreadsheet = XlsxSpreadsheet::from_reader("memory.xlsx", package(false)).unwrap();
        let error = spreadsheet.read_sheet("Sheet2").unwrap_err();
        assert!(error.to_string().contains("shared string 0 out of range"));
    }

    #[test]
    fn reads_prefixed_parts() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let parts = [
            (
                "xl/workbook.xml",
                r#"<x:workbook xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="r"><x:workbookPr date1904="1"/><x:sheets><x:sheet name="客户" sheetId="1" r:id="rId1"/></x:sheets></x:workbook>"#,
            ),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            (
                "xl/worksheets/sheet1.xml",
                r#"<x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:sheetData><x:row r="1"><x:c r="A1" t="inlineStr"><x:is><x:t>张三</x:t></x:is></x:c><x:c r="B1"><x:v>7</x:v></x:c></x:row></x:sheetData></x:worksheet>"#,
            ),
        ];
        for (name, content) in parts {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);

        let mut spreadsheet = XlsxSpreadsheet::from_reader("prefixed.xlsx", cursor).unwrap();
        assert_eq!(spreadsheet.sheet_names(), ["客户"]);
        let sheet = spreadsheet.read_sheet("客户").unwrap();
        assert_eq!(sheet.text(0, 0).as_deref(), Some("张三"));
        assert_eq!(sheet.text(0, 1).as_deref(), Some("7"));
    }
}
