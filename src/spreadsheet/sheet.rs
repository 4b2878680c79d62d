use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::range::Range;

/// One page of a workbook materialized as a dense grid of cell values.
/// Rows may have different lengths; absent cells count as empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
    /// Top-left corner of the requested range; pushed positions are relative to it.
    origin: (usize, usize),
    range: Range,
}

impl Sheet {
    /// Builds a sheet from rows that are already in memory.
    pub fn from_rows(name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.to_owned(),
            rows,
            ..Self::default()
        }
    }

    /// Creates an empty sheet that accepts cells inside `range` only.
    pub(crate) fn new(name: &str, range: Range) -> Self {
        Self {
            name: name.to_owned(),
            rows: Vec::new(),
            origin: (range.first_row(), range.first_col()),
            range,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<CellValue>> {
        self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the longest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// True when the sheet holds no non-empty cell.
    pub fn is_blank(&self) -> bool {
        self.rows.iter().flatten().all(CellValue::is_empty)
    }

    /// True when the reader can stop: `row` (absolute) is past the requested range.
    pub(crate) fn is_after_range(&self, row: usize) -> bool {
        self.range.is_after_last_row(row)
    }

    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        self.range.contains(row, col)
    }

    /// Stores a value at an absolute `(row, col)` position, growing the grid as needed.
    /// Positions outside the range and empty values are ignored.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: CellValue) {
        if value.is_empty() || !self.contains(row, col) {
            return;
        }
        let (row, col) = (row - self.origin.0, col - self.origin.1);
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }
}
