//! XML helpers for SpreadsheetML parts.
//! Wraps the quick-xml reader for streaming reads and provides the few writer
//! primitives needed to emit replacement cells.

use crate::error::SheetError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::BufRead;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// Streaming XML reader configured for worksheet parts
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Empty elements are expanded so `<c r="A1"/>` yields a start and an end event.
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, `None` at end of input
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SheetError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(SheetError::XmlError(error)),
        }
    }
}

/// Attribute value extraction
pub(crate) trait XmlAttributeHelper<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, SheetError>;

    fn parse_value<T: FromStr>(&self) -> Result<T, SheetError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, SheetError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, SheetError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => SheetError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => SheetError::StringEncodingError(error),
            })
    }
}

/// Attribute lookup on element start tags
pub(crate) trait XmlNodeHelper<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetError>;

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Text accumulation from reader events
pub(crate) trait XmlTextContextHelper {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), SheetError>;

    /// Resolves entity and character references such as `&amp;` or `&#x4E09;`
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), SheetError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Returns the namespace prefix of an element with its colon (`"x:"`), or `""`.
pub(crate) fn element_prefix(element: &BytesStart) -> Result<String, SheetError> {
    Ok(match element.name().prefix() {
        Some(prefix) => format!("{}:", std::str::from_utf8(prefix.as_ref())?),
        None => String::new(),
    })
}

/// Writes `<c r=".." s=".." t="inlineStr"><is><t>..</t></is></c>`, every
/// element qualified with `prefix`.
///
/// An empty value produces a value-less cell so the style survives while the
/// content is cleared.
pub(crate) fn write_inline_string_cell<W: Write>(
    writer: &mut Writer<W>,
    prefix: &str,
    reference: &str,
    style: Option<&str>,
    value: &str,
) -> Result<(), SheetError> {
    let mut cell = BytesStart::new(format!("{prefix}c"));
    cell.push_attribute(("r", reference));
    if let Some(style) = style {
        cell.push_attribute(("s", style));
    }
    if value.is_empty() {
        writer.write_event(Event::Empty(cell))?;
        return Ok(());
    }

    cell.push_attribute(("t", "inlineStr"));
    writer.write_event(Event::Start(cell))?;
    writer.write_event(Event::Start(BytesStart::new(format!("{prefix}is"))))?;
    let mut text = BytesStart::new(format!("{prefix}t"));
    if value.trim() != value || value.contains('\n') {
        text.push_attribute(("xml:space", "preserve"));
    }
    writer.write_event(Event::Start(text))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(format!("{prefix}t"))))?;
    writer.write_event(Event::End(BytesEnd::new(format!("{prefix}is"))))?;
    writer.write_event(Event::End(BytesEnd::new(format!("{prefix}c"))))?;
    Ok(())
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}
