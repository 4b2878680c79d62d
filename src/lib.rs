//! # Sheet Tables
//!
//! Finds the tables hidden in spreadsheet sheets and exports them as CSV.
//!
//! Sheets in real workbooks often stack several unrelated tables vertically, separated
//! by blank rows. This crate reads a workbook without assuming any header row, splits
//! each sheet at its blank rows, removes the columns a table never uses and writes one
//! CSV file per table.
//!
//! ## Features
//!
//! - **Workbook formats**: Office Open XML (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument
//!   (`.ods`), from a file or from an in-memory buffer
//! - **Typed cells**: text, numbers, booleans, dates, date-times, durations and error literals
//! - **Table extraction**: [`split`] and [`clean`] as pure functions, [`extract_and_save`]
//!   for a whole workbook
//! - **Sheet conversion**: [`convert_sheet`] writes one sheet with a chosen header row
//! - **Filtering**: sheet name glob patterns and Excel-style ranges through [`Criteria`]
//!
//! ## Example
//!
//! ```no_run
//! use sheet_tables::{extract_and_save, Criteria, Workbook};
//!
//! let mut workbook = Workbook::open("report.xlsx")?;
//! let report = extract_and_save(&mut workbook, "output", &Criteria::default())?;
//! for table in &report.tables {
//!     println!("{}", table.path.display());
//! }
//! # Ok::<(), sheet_tables::SheetTablesError>(())
//! ```
mod error;
mod helpers;
pub mod logging;
pub mod spreadsheet;
pub mod tables;

pub use error::SheetTablesError;
pub use spreadsheet::CellValue;
pub use spreadsheet::Criteria;
pub use spreadsheet::Range;
pub use spreadsheet::Sheet;
pub use spreadsheet::SpreadsheetError;
pub use spreadsheet::Workbook;
pub use tables::clean;
pub use tables::convert_sheet;
pub use tables::extract_and_save;
pub use tables::split;
pub use tables::CleanedTable;
pub use tables::ExtractError;
pub use tables::ExtractReport;
pub use tables::SavedTable;
pub use tables::Table;
