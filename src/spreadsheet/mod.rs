//! # Workbook Reading
//!
//! Opens Office Open XML (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument (`.ods`)
//! workbooks from disk or from memory and materializes their sheets as dense grids of
//! [`CellValue`]s. No header row is assumed: the first row of a sheet is data like any other.
pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod excel;
pub(crate) mod ods;
pub(crate) mod range;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

use crate::error::SheetTablesError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

pub use cell::CellValue;
pub use criteria::Criteria;
pub use ods::OdsError;
pub use range::Range;
pub use range::RangeError;
pub use sheet::Sheet;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot detect file format for '{0}'")]
    InvalidFileFormat(String),

    #[error("Unsupported spreadsheet format for '{0}': only xlsx, xlsm, xlam and ods workbooks can be read")]
    UnsupportedFormatError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Spreadsheet '{0}' contains no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Part '{1}' is missing from spreadsheet '{0}'")]
    FileError(String, String),

    #[error("Sheet '{1}' not found in spreadsheet '{0}'")]
    SheetNotFound(String, String),

    #[error("Invalid cell value in '{0}', sheet '{1}', cell {2}: {3}")]
    CellValueError(String, String, String, String),
}

/// A workbook format reader.
pub(crate) trait Spreadsheet {
    /// Name of the workbook, used in errors and logs
    fn name(&self) -> &str;

    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Reads one sheet, restricted to the cells accepted by `criteria`.
    fn read_sheet(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Sheet, SheetTablesError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Format {
    Xlsx,
    Ods,
}

impl Format {
    /// Format implied by a file extension; `Ok(None)` means the contents must decide.
    fn from_extension(name: &str) -> Result<Option<Format>, SpreadsheetError> {
        let extension = Path::new(name)
            .extension()
            .map(|extension| extension.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xlam") => Ok(Some(Format::Xlsx)),
            Some("ods") => Ok(Some(Format::Ods)),
            Some("xls" | "xla" | "xlsb") => Err(SpreadsheetError::UnsupportedFormatError(name.to_owned())),
            _ => Ok(None),
        }
    }

    /// Guesses the format from the parts present in the archive.
    fn sniff(name: &str, zip: &ZipArchive<UnifiedReader>) -> Result<Format, SpreadsheetError> {
        if zip.contains("xl/workbook.xml") {
            Ok(Format::Xlsx)
        } else if zip.contains("mimetype") || zip.contains("content.xml") {
            Ok(Format::Ods)
        } else if zip.contains("xl/workbook.bin") {
            Err(SpreadsheetError::UnsupportedFormatError(name.to_owned()))
        } else {
            Err(SpreadsheetError::InvalidFileFormat(name.to_owned()))
        }
    }
}

/// An opened workbook.
pub struct Workbook {
    spreadsheet: Box<dyn Spreadsheet>,
}

impl Workbook {
    /// Opens a workbook file, choosing the reader by extension or, failing that, by content.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Workbook, SheetTablesError> {
        let path = path.as_ref();
        let name = path.to_string_lossy().into_owned();
        let format = Format::from_extension(&name)?;
        let reader = UnifiedReader::open(path)?;
        Self::from_reader(&name, format, reader)
    }

    /// Opens a workbook held in memory, e.g. an uploaded file. `name` is used for format
    /// detection by extension and in error messages.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Workbook, SheetTablesError> {
        let format = Format::from_extension(name)?;
        Self::from_reader(name, format, UnifiedReader::from_bytes(bytes))
    }

    fn from_reader(name: &str, format: Option<Format>, mut reader: UnifiedReader) -> Result<Workbook, SheetTablesError> {
        if reader.is_compound_file()? {
            // An OOXML package inside an OLE container is encrypted; other OLE files are legacy binaries
            Err(match format {
                Some(Format::Xlsx) => SpreadsheetError::SpreadsheetPasswordProtectedError(name.to_owned()),
                _ => SpreadsheetError::UnsupportedFormatError(name.to_owned()),
            })?;
        }
        let zip = ZipArchive::new(reader)
            .map_err(|_| SpreadsheetError::InvalidFileFormat(name.to_owned()))?;
        let format = match format {
            Some(format) => format,
            None => Format::sniff(name, &zip)?,
        };
        let spreadsheet: Box<dyn Spreadsheet> = match format {
            Format::Xlsx => Box::new(XlsxSpreadsheet::new(name, zip)?),
            Format::Ods => Box::new(OdsSpreadsheet::new(name, zip)?),
        };
        Ok(Workbook { spreadsheet })
    }

    pub fn name(&self) -> &str {
        self.spreadsheet.name()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.spreadsheet.sheet_names()
    }

    /// Reads one sheet by name.
    pub fn read_sheet(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Sheet, SheetTablesError> {
        self.spreadsheet.read_sheet(sheet_name, criteria)
    }

    /// Reads every sheet accepted by `criteria`, in workbook order.
    pub fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, SheetTablesError> {
        self.sheet_names()
            .iter()
            .filter(|name| criteria.accept(name))
            .map(|name| self.read_sheet(name, criteria))
            .collect()
    }
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("name", &self.name())
            .field("sheets", &self.sheet_names())
            .finish()
    }
}
