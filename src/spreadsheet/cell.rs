use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use std::fmt::Display;

/// Types of cell data in a worksheet part.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as `0`/`1`
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers
    NumberTime,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Text, already resolved from inline or shared strings
    String,
    /// Index into the shared string table, resolved while reading
    SharedString,
    /// Error literals such as `#N/A`
    Error,
}

impl CellType {
    /// Maps built-in number format IDs that denote dates or times.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::NumberTime),
            _ => None,
        }
    }

    /// Classifies a custom number format code by its unquoted date and time tokens.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, _) => Self::NumberTime,
            (false, false, _) => Self::Number,
        }
    }
}

/// A single populated cell with position, type, and raw value.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Cell data type
    pub kind: CellType,
    /// Cell value as stored in the package
    pub value: String,
}

impl Cell {
    pub fn new(row: usize, col: usize, kind: CellType, value: impl Into<String>) -> Self {
        Cell { row, col, kind, value: value.into() }
    }

    /// A text cell.
    pub fn text(row: usize, col: usize, value: impl Into<String>) -> Self {
        Self::new(row, col, CellType::String, value)
    }

    /// Returns the A1-style reference of this cell.
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }
}

/// Textual rendering used for keyword matching and record fields.
impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = match self.kind {
            CellType::Boolean => Some(if self.value == "1" { "TRUE" } else { "FALSE" }.to_owned()),
            CellType::Number => Some(to_number_string(&self.value)),
            CellType::NumberDate1900 => to_date_string(&self.value, false),
            CellType::NumberDate1904 => to_date_string(&self.value, true),
            CellType::NumberDateTime1900 => to_datetime_string(&self.value, false),
            CellType::NumberDateTime1904 => to_datetime_string(&self.value, true),
            CellType::NumberTime => to_time_string(&self.value),
            CellType::IsoDateTime => Some(self.value.replace('T', " ")),
            _ => None,
        };
        // Values that fail to convert are shown as stored.
        f.write_str(rendered.as_deref().unwrap_or(&self.value))
    }
}

/// Integral numbers lose their fractional part so `1.38E10` style noise never
/// leaks into phone numbers; anything else is kept verbatim.
fn to_number_string(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(number) if number.fract() == 0.0 && number.abs() < 1e15 => format!("{}", number as i64),
        _ => value.to_owned(),
    }
}

/// Converts a serial day number to an ISO date.
/// Serials below 60 predate the phantom 1900-02-29 of the 1900 system.
fn to_date_string(value: &str, is_1904: bool) -> Option<String> {
    let days = value.parse::<f64>().ok()?.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let shift = Duration::try_days(days.checked_add(offset)?)?;
    let date = NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(shift)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn to_time_string(value: &str) -> Option<String> {
    let fraction = value.parse::<f64>().ok()?.fract();
    let mut seconds = (fraction * 86_400f64).round() as i64;
    let hours = seconds / 3600;
    seconds %= 3600;
    let minutes = seconds / 60;
    seconds %= 60;
    Some(format!("{hours:02}:{minutes:02}:{seconds:02}"))
}

fn to_datetime_string(value: &str, is_1904: bool) -> Option<String> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Some(format!("{date} {time}"))
}
