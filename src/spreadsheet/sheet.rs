use crate::spreadsheet::cell::Cell;
use std::collections::HashMap;
use std::ops::Range;

/// The populated cells of one worksheet, addressable by `(row, col)`.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Sheet name as listed in the workbook
    pub name: String,
    /// All populated cells in reading order
    cells: Vec<Cell>,
    /// Index mapping from (row, col) to cell vector position
    indexes: HashMap<(usize, usize), usize>,
    /// Actual data range (determined from cell data)
    row_lower_bound: Option<usize>,
    row_upper_bound: Option<usize>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Sheet {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Builds a sheet from cells; a repeated position keeps the later cell.
    pub fn from_cells(name: &str, cells: impl IntoIterator<Item = Cell>) -> Self {
        let mut sheet = Sheet::new(name);
        for cell in cells {
            sheet.push(cell);
        }
        sheet
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Adds a cell, replacing any cell already stored at the same position.
    pub fn push(&mut self, cell: Cell) {
        self.row_lower_bound = Some(self.row_lower_bound.map_or(cell.row, |lower| lower.min(cell.row)));
        self.row_upper_bound = Some(self.row_upper_bound.map_or(cell.row, |upper| upper.max(cell.row)));
        match self.indexes.get(&(cell.row, cell.col)) {
            Some(&index) => self.cells[index] = cell,
            None => {
                self.indexes.insert((cell.row, cell.col), self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    /// Gets the cell at a zero-based position.
    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.indexes
            .get(&(row, col))
            .and_then(|index| self.cells.get(*index))
    }

    /// Textual rendering of the cell at a position, `None` when absent.
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.get(row, col).map(ToString::to_string)
    }

    /// Last populated row (zero-based).
    pub fn max_row(&self) -> Option<usize> {
        self.row_upper_bound
    }

    /// Populated row span in ascending order, empty for an empty sheet.
    pub fn row_range(&self) -> Range<usize> {
        match (self.row_lower_bound, self.row_upper_bound) {
            (Some(lower), Some(upper)) => lower..upper + 1,
            _ => 0..0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }
}
