//! Cell-level edits of an existing XLSX package.
//!
//! Only the target worksheet part is rewritten; it is streamed through a
//! quick-xml reader/writer pair so untouched rows, cells, and attributes are
//! emitted exactly as read. Every other package entry is copied raw, keeping
//! styles, merged cells, drawings, and printer settings intact.
use crate::error::ResultMessage;
use crate::error::SheetError;
use crate::helpers::xml::element_prefix;
use crate::helpers::xml::write_inline_string_cell;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::excel;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::CellAddress;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::collections::BTreeMap;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const TAG_SHEET_DATA: &[u8] = b"sheetData";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";

/// Pending edits grouped by row, then column.
type RowEdits<'a> = BTreeMap<usize, BTreeMap<usize, &'a str>>;

/// A set of text values to write into one worksheet of a package.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplatePatch {
    sheet_name: String,
    edits: BTreeMap<CellAddress, String>,
}

impl TemplatePatch {
    pub fn new(sheet_name: &str) -> Self {
        TemplatePatch {
            sheet_name: sheet_name.to_owned(),
            edits: BTreeMap::new(),
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Queues a value; a second write to the same address replaces the first.
    pub fn set(&mut self, address: CellAddress, value: impl Into<String>) -> &mut Self {
        self.edits.insert(address, value.into());
        self
    }

    pub fn get(&self, address: CellAddress) -> Option<&str> {
        self.edits.get(&address).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Reads the package from `template` and writes the patched package to `output`.
    ///
    /// The template reader is only read from. Entries keep their order, and the
    /// rewritten worksheet reuses the original entry's compression and timestamp,
    /// so the same template and edits always yield the same bytes.
    pub fn apply<R: Read + Seek, W: Write + Seek>(&self, template: R, output: W) -> Result<W, SheetError> {
        let mut archive = excel::open_package("template", template)?;
        let (sheets, _) = excel::load_workbook(&mut archive).with_prefix("read workbook")?;
        let sheet_path = sheets
            .into_iter()
            .find(|(name, _)| name == &self.sheet_name)
            .map(|(_, path)| path)
            .ok_or_else(|| SpreadsheetError::SheetNotFound(self.sheet_name.to_owned()))?;
        let sheet_path = archive.part_name(&sheet_path)
            .ok_or_else(|| SpreadsheetError::FileError(sheet_path.to_owned()))?;

        let mut writer = ZipWriter::new(output);
        for index in 0..archive.len() {
            let is_target = archive.name_for_index(index) == Some(sheet_path.as_str());
            if !is_target {
                writer.raw_copy_file(archive.by_index_raw(index)?)?;
                continue;
            }

            let mut file = archive.by_index(index)?;
            let mut options = SimpleFileOptions::default()
                .compression_method(file.compression())
                .last_modified_time(file.last_modified().unwrap_or_default());
            if let Some(mode) = file.unix_mode() {
                options = options.unix_permissions(mode);
            }
            let mut xml = Vec::new();
            file.read_to_end(&mut xml)?;
            drop(file);

            let patched = patch_sheet_xml(&xml, &self.edits).with_prefix(&format!("patch '{sheet_path}'"))?;
            debug!(part = %sheet_path, cells = self.edits.len(), "worksheet patched");
            writer.start_file(sheet_path.as_str(), options)?;
            writer.write_all(&patched)?;
        }
        Ok(writer.finish()?)
    }
}

/// Rewrites a worksheet part, replacing or inserting the edited cells.
pub(crate) fn patch_sheet_xml(xml: &[u8], edits: &BTreeMap<CellAddress, String>) -> Result<Vec<u8>, SheetError> {
    let mut pending: RowEdits = BTreeMap::new();
    for (address, value) in edits {
        pending.entry(address.row).or_default().insert(address.col, value.as_str());
    }

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + edits.len() * 64));

    let mut has_sheet_data = false;
    let mut in_sheet_data = false;
    // Namespace prefix of sheetData, reused for synthesized rows and cells
    let mut prefix = String::new();
    let mut row = 0usize;
    let mut next_row = 0usize;
    let mut next_col = 0usize;
    let mut row_cells = BTreeMap::<usize, &str>::new();
    // Depth of a replaced cell whose original content is being dropped
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => (),
            }
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Start(ref e) if e.local_name().as_ref() == TAG_SHEET_DATA => {
                prefix = element_prefix(e)?;
                has_sheet_data = true;
                in_sheet_data = true;
                writer.write_event(event)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == TAG_SHEET_DATA => {
                prefix = element_prefix(&e)?;
                has_sheet_data = true;
                if pending.is_empty() {
                    writer.write_event(Event::Empty(e))?;
                } else {
                    writer.write_event(Event::Start(e))?;
                    write_rows(&mut writer, &prefix, std::mem::take(&mut pending))?;
                    writer.write_event(Event::End(BytesEnd::new(format!("{prefix}sheetData"))))?;
                }
            }
            Event::End(ref e) if in_sheet_data && e.local_name().as_ref() == TAG_SHEET_DATA => {
                in_sheet_data = false;
                write_rows(&mut writer, &prefix, std::mem::take(&mut pending))?;
                writer.write_event(event)?;
            }

            Event::Start(ref e) if in_sheet_data && e.local_name().as_ref() == TAG_ROW => {
                row = row_index(e, next_row)?;
                next_row = row + 1;
                next_col = 0;
                write_rows_before(&mut writer, &prefix, &mut pending, row)?;
                row_cells = pending.remove(&row).unwrap_or_default();
                writer.write_event(event)?;
            }
            Event::Empty(e) if in_sheet_data && e.local_name().as_ref() == TAG_ROW => {
                row = row_index(&e, next_row)?;
                next_row = row + 1;
                write_rows_before(&mut writer, &prefix, &mut pending, row)?;
                match pending.remove(&row) {
                    Some(cells) => {
                        let end = BytesEnd::new(format!("{}row", element_prefix(&e)?));
                        writer.write_event(Event::Start(e))?;
                        write_cells(&mut writer, &prefix, row, cells)?;
                        writer.write_event(Event::End(end))?;
                    }
                    None => writer.write_event(Event::Empty(e))?,
                }
            }
            Event::End(ref e) if in_sheet_data && e.local_name().as_ref() == TAG_ROW => {
                write_cells(&mut writer, &prefix, row, std::mem::take(&mut row_cells))?;
                writer.write_event(event)?;
            }

            Event::Start(ref e) | Event::Empty(ref e) if in_sheet_data && e.local_name().as_ref() == TAG_CELL => {
                let col = match e.get_attribute_value("r")?.and_then(|reference| reference_to_index(&reference)) {
                    Some((_, col)) => col,
                    None => next_col,
                };
                next_col = col + 1;

                let later = row_cells.split_off(&col);
                write_cells(&mut writer, &prefix, row, std::mem::replace(&mut row_cells, later))?;
                match row_cells.remove(&col) {
                    Some(value) => {
                        let style = e.get_attribute_value("s")?.map(|style| style.into_owned());
                        let cell_prefix = element_prefix(e)?;
                        if matches!(event, Event::Start(_)) {
                            skip_depth = 1;
                        }
                        let reference = index_to_reference(row, col);
                        write_inline_string_cell(&mut writer, &cell_prefix, &reference, style.as_deref(), value)?;
                    }
                    None => writer.write_event(event)?,
                }
            }

            event => writer.write_event(event)?,
        }
    }

    if !has_sheet_data {
        Err(SpreadsheetError::MalformedSheet(
            "worksheet".to_owned(),
            "no sheetData element".to_owned(),
        ))?
    }
    Ok(writer.into_inner())
}

fn row_index(row: &BytesStart, default: usize) -> Result<usize, SheetError> {
    Ok(row
        .parse_attribute_value::<usize>("r")?
        .and_then(|number| number.checked_sub(1))
        .unwrap_or(default))
}

/// Emits every pending row that sorts before `row`.
fn write_rows_before<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    pending: &mut RowEdits,
    row: usize,
) -> Result<(), SheetError> {
    let later = pending.split_off(&row);
    let earlier = std::mem::replace(pending, later);
    write_rows(writer, prefix, earlier)
}

fn write_rows<W: Write>(writer: &mut Writer<W>, prefix: &str, rows: RowEdits) -> Result<(), SheetError> {
    let tag = format!("{prefix}row");
    for (row, cells) in rows {
        let number = (row + 1).to_string();
        let mut start = BytesStart::new(tag.as_str());
        start.push_attribute(("r", number.as_str()));
        writer.write_event(Event::Start(start))?;
        write_cells(writer, prefix, row, cells)?;
        writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
    }
    Ok(())
}

fn write_cells<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    row: usize,
    cells: BTreeMap<usize, &str>,
) -> Result<(), SheetError> {
    for (col, value) in cells {
        write_inline_string_cell(writer, prefix, &index_to_reference(row, col), None, value)?;
    }
    Ok(())
}
