//! # Table Extraction
//!
//! A sheet often holds several independent tables stacked vertically and separated by
//! blank rows. [`split`] cuts a sheet into those tables, [`clean`] drops the columns a
//! table never uses and gives the rest positional names, and [`extract_and_save`] runs
//! both over a whole workbook and writes one CSV file per table.
mod convert;
mod extract;
mod writer;

use crate::spreadsheet::CellValue;
use crate::spreadsheet::Sheet;
use thiserror::Error;

pub use convert::convert_sheet;
pub use extract::extract_and_save;
pub use extract::table_file_name;
pub use extract::ExtractReport;
pub use extract::SavedTable;
pub use writer::write_table;
pub use writer::write_table_to_path;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Cannot create output folder '{0}': {1}")]
    CreateOutputFolderError(String, #[source] std::io::Error),

    #[error("Header row {1} is outside sheet '{0}' which has {2} rows")]
    HeaderRowOutOfRange(String, usize, usize),
}

/// Returns true when every cell of the row is empty; a zero-length row is blank.
pub fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_empty)
}

/// A maximal run of consecutive non-blank rows of a sheet. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Wraps rows as a table; `None` when there are no rows.
    pub fn new(rows: Vec<Vec<CellValue>>) -> Option<Table> {
        if rows.is_empty() {
            None
        } else {
            Some(Table { rows })
        }
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

    /// Width of the longest row; shorter rows are treated as padded with empty cells.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A table whose all-empty columns were removed and whose remaining columns are
/// named `Column_0`, `Column_1`, ... Every row has exactly `columns().len()` cells.
#[derive(Clone, Debug, PartialEq)]
pub struct CleanedTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl CleanedTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Splits a sheet into tables at blank rows.
///
/// Consecutive blank rows never produce an empty table, and trailing rows that are not
/// followed by a blank row still form a final table. A sheet without non-blank rows
/// yields no tables. Tables keep their order of appearance.
pub fn split(sheet: Sheet) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut pending = Vec::new();
    for row in sheet.into_rows() {
        if !is_blank_row(&row) {
            pending.push(row);
        } else if !pending.is_empty() {
            tables.push(Table { rows: std::mem::take(&mut pending) });
        }
    }
    if !pending.is_empty() {
        tables.push(Table { rows: pending });
    }
    tables
}

/// Removes every column that is empty in all rows of the table, pads rows to a uniform
/// width and names the surviving columns by position.
///
/// A table whose cells are all empty comes back with zero columns and its row count intact.
pub fn clean(table: Table) -> CleanedTable {
    let width = table.width();
    let mut used = vec![false; width];
    for row in &table.rows {
        for (index, cell) in row.iter().enumerate() {
            used[index] |= !cell.is_empty();
        }
    }

    let rows = table.rows
        .into_iter()
        .map(|row| {
            let mut cells = row.into_iter();
            used.iter()
                .filter_map(|keep| {
                    let cell = cells.next().unwrap_or_default();
                    keep.then_some(cell)
                })
                .collect()
        })
        .collect();
    let columns = (0..used.iter().filter(|keep| **keep).count())
        .map(|index| format!("Column_{index}"))
        .collect();
    CleanedTable { columns, rows }
}
