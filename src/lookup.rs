//! # Lookup Engine
//!
//! Scans one key column of a sheet for a substring and captures a fixed-shape
//! customer record for every hit. A record spans [`RECORD_ROW_SPAN`]
//! contiguous rows of the key column, anchored at the matching row:
//!
//! | Row | Field     |
//! |-----|-----------|
//! | r   | `name`    |
//! | r+1 | `phone`   |
//! | r+2 | `address` |
//! | r+3 | `extra`   |
//!
//! The trailing rows are not validated; rows past the end of the table read as
//! empty. When two rows carry identical key text the later row wins.
use crate::error::PickupError;
use crate::spreadsheet;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use tracing::info;

/// Number of consecutive key-column rows forming one customer record.
pub const RECORD_ROW_SPAN: usize = 4;

/// One customer block of the data source. Empty strings stand for empty cells.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub extra: String,
}

impl CustomerRecord {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
        extra: impl Into<String>,
    ) -> Self {
        CustomerRecord {
            name: name.into(),
            phone: phone.into(),
            address: address.into(),
            extra: extra.into(),
        }
    }

    /// Reads the record anchored at `row`, `None` when the anchor cell is blank.
    pub fn from_sheet(sheet: &Sheet, row: usize, col: usize) -> Option<Self> {
        let name = sheet.text(row, col).filter(|name| !is_blank_name(name))?;
        let field = |offset: usize| sheet.text(row + offset, col).unwrap_or_default();
        let [phone, address, extra] = [1, 2, 3].map(field);
        Some(CustomerRecord { name, phone, address, extra })
    }
}

/// A name made only of whitespace identifies no customer.
pub(crate) fn is_blank_name(name: &str) -> bool {
    name.trim().is_empty()
}

/// Matched key text mapped to its record, in first-insertion (row-ascending) order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResults {
    entries: Vec<(String, CustomerRecord)>,
    indexes: HashMap<String, usize>,
}

impl SearchResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record; an existing key keeps its position and takes the new record.
    pub fn insert(&mut self, key: impl Into<String>, record: CustomerRecord) -> Option<CustomerRecord> {
        let key = key.into();
        match self.indexes.get(&key) {
            Some(&index) => Some(std::mem::replace(&mut self.entries[index].1, record)),
            None => {
                self.indexes.insert(key.clone(), self.entries.len());
                self.entries.push((key, record));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CustomerRecord> {
        self.indexes.get(key).map(|&index| &self.entries[index].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CustomerRecord)> {
        self.entries.iter().map(|(key, record)| (key.as_str(), record))
    }

    /// Removes and returns the record stored under `key`.
    pub fn take(&mut self, key: &str) -> Option<CustomerRecord> {
        let index = self.indexes.remove(key)?;
        let (_, record) = self.entries.remove(index);
        for position in self.indexes.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        Some(record)
    }

    /// The only record, when there is exactly one.
    pub fn into_unique(mut self) -> Option<CustomerRecord> {
        match self.entries.len() {
            1 => self.entries.pop().map(|(_, record)| record),
            _ => None,
        }
    }
}

impl IntoIterator for SearchResults {
    type Item = (String, CustomerRecord);
    type IntoIter = std::vec::IntoIter<(String, CustomerRecord)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// What a search means for the caller. None of these is a fault.
#[derive(Clone, Debug, PartialEq)]
pub enum LookupOutcome {
    NoMatch,
    Unique(CustomerRecord),
    /// More than one distinct key matched; a selector has to pick one
    Ambiguous(SearchResults),
}

impl From<SearchResults> for LookupOutcome {
    fn from(results: SearchResults) -> Self {
        match results.len() {
            0 => LookupOutcome::NoMatch,
            1 => results.into_unique().map_or(LookupOutcome::NoMatch, LookupOutcome::Unique),
            _ => LookupOutcome::Ambiguous(results),
        }
    }
}

/// Scans an already loaded sheet. Matching is a case-sensitive substring test
/// against the text rendering of each key-column cell.
pub fn search_sheet(sheet: &Sheet, key_column: usize, keyword: &str) -> SearchResults {
    let mut results = SearchResults::new();
    for row in sheet.row_range() {
        let Some(record) = CustomerRecord::from_sheet(sheet, row, key_column) else {
            continue;
        };
        if record.name.contains(keyword) {
            debug!(row = row + 1, key = %record.name, "key matched");
            let key = record.name.clone();
            if results.insert(key, record).is_some() {
                debug!(row = row + 1, "duplicate key replaced earlier match");
            }
        }
    }
    results
}

/// Searches the named sheet of a data source.
///
/// An empty keyword is rejected before the source is touched. A missing sheet
/// or unparsable content is reported as `DataSourceUnreadable`, naming the
/// source by [`Spreadsheet::name`].
pub fn find_matches<S: Spreadsheet + ?Sized>(
    spreadsheet: &mut S,
    sheet_name: &str,
    key_column: usize,
    keyword: &str,
) -> Result<SearchResults, PickupError> {
    validate_keyword(keyword)?;
    let sheet = spreadsheet
        .read_sheet(sheet_name)
        .map_err(|error| PickupError::data_source(Path::new(&spreadsheet.name()), error))?;
    let results = search_sheet(&sheet, key_column, keyword);
    info!(keyword, sheet = sheet_name, matches = results.len(), "search finished");
    Ok(results)
}

/// Opens the data source at `path`, searches it, and releases it before returning.
pub fn find_matches_in_file(
    path: &Path,
    sheet_name: &str,
    key_column: usize,
    keyword: &str,
) -> Result<SearchResults, PickupError> {
    validate_keyword(keyword)?;
    let mut source = spreadsheet::open(path).map_err(|error| PickupError::data_source(path, error))?;
    find_matches(source.as_mut(), sheet_name, key_column, keyword)
}

fn validate_keyword(keyword: &str) -> Result<(), PickupError> {
    if keyword.is_empty() {
        return Err(PickupError::InvalidArgument("search keyword must not be empty".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::Cell;
    use crate::spreadsheet::CellType;
    use crate::spreadsheet::InMemorySpreadsheet;
    use pretty_assertions::assert_eq;

    /// Column B of `Sheet2`, starting at the given zero-based row.
    fn source(first_row: usize, values: &[&str]) -> InMemorySpreadsheet {
        let cells = values
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_empty())
            .map(|(offset, value)| Cell::text(first_row + offset, 1, *value));
        InMemorySpreadsheet::new("customers.xlsx", vec![Sheet::from_cells("Sheet2", cells)])
    }

    #[test]
    fn single_match_reads_following_rows() {
        let mut source = source(4, &["张三", "13800000000", "北京市", "VIP"]);
        let results = find_matches(&mut source, "Sheet2", 1, "张三").unwrap();
        assert_eq!(
            results.into_unique(),
            Some(CustomerRecord::new("张三", "13800000000", "北京市", "VIP"))
        );
    }

    #[test]
    fn blank_anchor_is_skipped() {
        let mut source = source(0, &[" ", "13800000000", "", "", "\t张三", "1"]);
        let results = find_matches(&mut source, "Sheet2", 1, "\t").unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), ["\t张三"]);
        assert!(CustomerRecord::from_sheet(&Sheet::from_cells("s", [Cell::text(0, 0, "　")]), 0, 0).is_none());
    }

    #[test]
    fn substring_matches_are_row_ordered() {
        let mut source = source(0, &["张三丰", "1", "武当山", "", "张三", "2", "北京市", "VIP"]);
        let results = find_matches(&mut source, "Sheet2", 1, "张三").unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), ["张三丰", "张三"]);
        assert_eq!(results.get("张三丰").unwrap().address, "武当山");
        assert_eq!(results.get("张三丰").unwrap().extra, "");
    }

    #[test]
    fn trailing_rows_are_taken_as_they_are() {
        // "张三" is the fourth row after "李四", so it doubles as its extra field
        let mut source = source(0, &["李四", "", "", "张三", "139", "上海市", "-"]);
        let results = find_matches(&mut source, "Sheet2", 1, "三").unwrap();
        assert_eq!(results.get("张三").unwrap().phone, "139");

        let results = find_matches(&mut source, "Sheet2", 1, "李").unwrap();
        assert_eq!(results.get("李四").unwrap(), &CustomerRecord::new("李四", "", "", "张三"));
    }

    #[test]
    fn duplicate_key_keeps_later_record() {
        let mut source = source(0, &["张三", "111", "旧地址", "", "张三", "222", "新地址", "VIP"]);
        let results = find_matches(&mut source, "Sheet2", 1, "张三").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("张三").unwrap(), &CustomerRecord::new("张三", "222", "新地址", "VIP"));
    }

    #[test]
    fn match_near_end_of_table_pads_with_empty() {
        let mut source = source(10, &["王五", "137"]);
        let results = find_matches(&mut source, "Sheet2", 1, "王五").unwrap();
        assert_eq!(results.get("王五").unwrap(), &CustomerRecord::new("王五", "137", "", ""));
    }

    #[test]
    fn numbers_match_on_their_text() {
        let sheet = Sheet::from_cells(
            "Sheet2",
            [
                Cell::new(0, 1, CellType::Number, "13800000000"),
                Cell::new(1, 1, CellType::Number, "1.5"),
            ],
        );
        let results = search_sheet(&sheet, 1, "138");
        assert_eq!(results.get("13800000000").unwrap().phone, "1.5");
    }

    #[test]
    fn matching_is_case_sensitive() {
        let mut source = source(0, &["Alice", "", "", ""]);
        assert!(find_matches(&mut source, "Sheet2", 1, "alice").unwrap().is_empty());
        assert_eq!(find_matches(&mut source, "Sheet2", 1, "Ali").unwrap().len(), 1);
    }

    #[test]
    fn other_columns_are_ignored() {
        let sheet = Sheet::from_cells("Sheet2", [Cell::text(0, 0, "张三"), Cell::text(0, 2, "张三")]);
        assert!(search_sheet(&sheet, 1, "张三").is_empty());
    }

    #[test]
    fn empty_keyword_is_invalid() {
        let mut source = source(0, &["张三"]);
        assert!(matches!(
            find_matches(&mut source, "Sheet2", 1, ""),
            Err(PickupError::InvalidArgument(_))
        ));
        assert!(matches!(
            find_matches_in_file(Path::new("missing.xlsx"), "Sheet2", 1, ""),
            Err(PickupError::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_sheet_is_unreadable() {
        let mut source = source(0, &["张三"]);
        assert!(matches!(
            find_matches(&mut source, "Sheet9", 1, "张三"),
            Err(PickupError::DataSourceUnreadable { .. })
        ));
    }

    #[test]
    fn outcome_from_results() {
        let mut results = SearchResults::new();
        assert_eq!(LookupOutcome::from(results.clone()), LookupOutcome::NoMatch);

        results.insert("张三", CustomerRecord::new("张三", "", "", ""));
        assert!(matches!(LookupOutcome::from(results.clone()), LookupOutcome::Unique(record) if record.name == "张三"));

        results.insert("张三丰", CustomerRecord::new("张三丰", "", "", ""));
        assert!(matches!(LookupOutcome::from(results), LookupOutcome::Ambiguous(results) if results.len() == 2));
    }

    #[test]
    fn take_keeps_remaining_order() {
        let mut results = SearchResults::new();
        for name in ["a", "b", "c"] {
            results.insert(name, CustomerRecord::new(name, "", "", ""));
        }
        assert_eq!(results.take("a").unwrap().name, "a");
        assert_eq!(results.take("a"), None);
        assert_eq!(results.keys().collect::<Vec<_>>(), ["b", "c"]);
        assert_eq!(results.get("c").unwrap().name, "c");
    }
}
