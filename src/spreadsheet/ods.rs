use crate::error::SheetTablesError;
use crate::for_each_xml_event;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const CONTENT: &str = "content.xml";
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
/// Cell hidden under a merged cell
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
/// Run of `text:c` spaces
const SPACES: QName = QName(b"text:s");
const MANIFEST_ENCRYPTION: QName = QName(b"manifest:encryption-data");

#[derive(Error, Debug)]
pub enum OdsError {
    #[error("Invalid ODS MIME type")]
    MimeTypeError,
}

/// OpenDocument spreadsheet (`.ods`).
pub(crate) struct OdsSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    sheets: Vec<String>,
}

impl OdsSpreadsheet {
    pub(crate) fn new(name: &str, mut zip: ZipArchive<UnifiedReader>) -> Result<Self, SheetTablesError> {
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(name.to_owned()))?;
        }
        let sheets = load_sheet_names(name, &mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?;
        }
        debug!(workbook = name, sheets = sheets.len(), "Opened ods workbook");
        Ok(OdsSpreadsheet {
            name: name.to_owned(),
            zip,
            sheets,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.clone()
    }

    fn read_sheet(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Sheet, SheetTablesError> {
        if !self.sheets.iter().any(|name| name == sheet_name) {
            Err(SpreadsheetError::SheetNotFound(self.name.to_owned(), sheet_name.to_owned()))?;
        }
        let mut reader = self.zip.xml_reader(CONTENT)?
            .ok_or_else(|| SpreadsheetError::FileError(self.name.to_owned(), CONTENT.to_owned()))?;

        // Skip forward to the requested table
        let mut found = false;
        for_each_xml_event!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                if event.get_attribute_value("table:name")?.is_some_and(|name| name == sheet_name) {
                    found = true;
                    break;
                }
            }
        });
        if !found {
            Err(SpreadsheetError::SheetNotFound(self.name.to_owned(), sheet_name.to_owned()))?;
        }

        let mut sheet = Sheet::new(sheet_name, criteria.range());
        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut kind = CellType::Empty;
        let mut value = String::new();
        let mut in_text = false;
        let mut in_annotation = false;
        // Character data counts only inside `text:p`; whitespace between elements is layout
        let mut paragraph_depth = 0usize;
        let mut paragraphs = 0usize;
        for_each_xml_event!(reader => {
            Event::End(event) if event.name() == TABLE => break,
            Event::Start(event) if event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
                if sheet.is_after_range(row) {
                    break;
                }
            }
            Event::End(event) if event.name() == TABLE_ROW => row += row_count,
            Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                value.clear();
                col_count = event.parse_attribute_value("table:number-columns-repeated")?.unwrap_or(1);
                let is_error = event.get_attribute_value("calcext:value-type")?.is_some_and(|kind| kind == "error");
                kind = match event.get_attribute_value("office:value-type")?.as_deref() {
                    None => CellType::Empty,
                    Some(_) if is_error && criteria.error_as_empty => CellType::Empty,
                    Some(_) if is_error => CellType::Error,
                    Some("string") => CellType::InlineString,
                    Some("boolean") => {
                        let flag = event.get_attribute_value("office:boolean-value")?
                            .is_some_and(|flag| flag != "false" && flag != "0");
                        value.push(if flag { '1' } else { '0' });
                        CellType::Boolean
                    }
                    Some("date") => {
                        value.push_str(&event.get_attribute_value("office:date-value")?.unwrap_or_default());
                        CellType::IsoDateTime
                    }
                    Some("time") => {
                        value.push_str(&event.get_attribute_value("office:time-value")?.unwrap_or_default());
                        CellType::IsoDuration
                    }
                    Some(_) => {
                        value.push_str(&event.get_attribute_value("office:value")?.unwrap_or_default());
                        CellType::Number
                    }
                };
                in_text = matches!(kind, CellType::InlineString | CellType::Error);
                paragraph_depth = 0;
                paragraphs = 0;
            }
            Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                if kind != CellType::Empty && !value.is_empty() {
                    let cell = CellValue::parse(kind, &value).map_err(|message| SpreadsheetError::CellValueError(
                        self.name.to_owned(),
                        sheet_name.to_owned(),
                        index_to_reference(row, col),
                        message,
                    ))?;
                    for row_number in row..row + row_count {
                        if sheet.is_after_range(row_number) {
                            break;
                        }
                        for col_number in col..col + col_count {
                            sheet.push(row_number, col_number, cell.clone());
                        }
                    }
                }
                col += col_count;
                kind = CellType::Empty;
                in_text = false;
                in_annotation = false;
            }
            Event::Start(event) if in_text && event.name() == ANNOTATION => in_annotation = true,
            Event::End(event) if in_text && event.name() == ANNOTATION => in_annotation = false,
            Event::Start(event) if in_text && !in_annotation && event.name() == PARAGRAPH => {
                if paragraph_depth == 0 && paragraphs > 0 {
                    value.push('\n');
                }
                paragraph_depth += 1;
                paragraphs += 1;
            }
            Event::End(event) if in_text && !in_annotation && event.name() == PARAGRAPH => {
                paragraph_depth = paragraph_depth.saturating_sub(1);
            }
            Event::Start(event) if in_text && !in_annotation && paragraph_depth > 0 && event.name() == SPACES => {
                let count = event.parse_attribute_value::<usize>("text:c")?.unwrap_or(1);
                value.push_str(&" ".repeat(count));
            }
            Event::Text(event) if in_text && !in_annotation && paragraph_depth > 0 => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if in_text && !in_annotation && paragraph_depth > 0 => value.push_bytes_ref(&event)?,
        });
        Ok(sheet)
    }
}

/// Lists the `table:name` of every table in document order.
fn load_sheet_names(name: &str, zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>, SheetTablesError> {
    let mut reader = zip.xml_reader(CONTENT)?
        .ok_or_else(|| SpreadsheetError::FileError(name.to_owned(), CONTENT.to_owned()))?;
    let mut sheets = Vec::new();
    for_each_xml_event!(reader => {
        Event::Start(event) if event.name() == TABLE => {
            if let Some(table_name) = event.get_attribute_value("table:name")? {
                sheets.push(table_name.into_owned());
            }
        }
    });
    Ok(sheets)
}

/// Rejects archives whose `mimetype` entry is not the spreadsheet MIME type.
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), SheetTablesError> {
    if let Some(mut file) = zip.file("mimetype")? {
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        if String::from_utf8_lossy(&content).trim().as_bytes() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, SheetTablesError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    for_each_xml_event!(reader => {
        Event::Start(event) if event.name() == MANIFEST_ENCRYPTION => return Ok(true),
    });
    Ok(false)
}
