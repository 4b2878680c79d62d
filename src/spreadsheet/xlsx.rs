use crate::error::SheetTablesError;
use crate::for_each_xml_event;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell::DateSystem;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::io::BufReader;
use tracing::debug;
use zip::read::ZipFile;
use zip::ZipArchive;

const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh"); // Phonetic guide runs, not part of the value
const TAG_TEXT: QName = QName(b"t");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// Office Open XML workbook (`.xlsx`, `.xlsm`, `.xlam`).
pub(crate) struct XlsxSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Cell type implied by each cell format index in `xl/styles.xml`
    cell_formats: Vec<CellType>,
    /// Worksheets as (name, part path) pairs in workbook order
    sheets: Vec<(String, String)>,
    /// Shared string table, loaded on first use
    shared_strings: Option<Vec<String>>,
}

impl XlsxSpreadsheet {
    pub(crate) fn new(name: &str, mut zip: ZipArchive<UnifiedReader>) -> Result<Self, SheetTablesError> {
        let (sheets, system) = load_workbook(name, &mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?;
        }
        let cell_formats = excel::load_cell_formats(&mut zip, system)?;
        debug!(workbook = name, sheets = sheets.len(), ?system, "Opened xlsx workbook");
        Ok(XlsxSpreadsheet {
            name: name.to_owned(),
            zip,
            cell_formats,
            sheets,
            shared_strings: None,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn read_sheet(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Sheet, SheetTablesError> {
        let path = self.sheets.iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, path)| path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound(self.name.to_owned(), sheet_name.to_owned()))?;
        if self.shared_strings.is_none() {
            self.shared_strings = Some(load_shared_strings(&mut self.zip)?);
        }

        let mut sheet = Sheet::new(sheet_name, criteria.range());
        let mut next_row = 0usize;
        let mut row = 0usize;
        let mut next_col = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::Empty;
        let mut value = String::new();
        let mut cells = Vec::<(usize, usize, CellType, String)>::new();
        {
            let mut reader = self.zip.xml_reader(&path)?
                .ok_or_else(|| SpreadsheetError::FileError(self.name.to_owned(), path.to_owned()))?;
            for_each_xml_event!(reader => {
                Event::Start(event) if event.name() == TAG_ROW => {
                    row = event.parse_attribute_value::<usize>("r")?
                        .and_then(|number| number.checked_sub(1))
                        .unwrap_or(next_row);
                    next_col = 0;
                    if sheet.is_after_range(row) {
                        break;
                    }
                }
                Event::End(event) if event.name() == TAG_ROW => next_row = row + 1,
                Event::Start(event) if event.name() == TAG_CELL => {
                    (row, col) = event.get_attribute_value("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .unwrap_or((row, next_col));
                    next_col = col + 1;
                    value.clear();
                    kind = if sheet.contains(row, col) {
                        let style = event.parse_attribute_value::<usize>("s")?;
                        cell_type(&self.cell_formats, event.get_attribute_value("t")?.as_deref(), style, criteria)
                    } else {
                        CellType::Empty
                    };
                }
                Event::Start(event) if kind != CellType::Empty && event.name() == TAG_INLINE_STRING => {
                    value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if kind != CellType::Empty && event.name() == TAG_VALUE => {
                    value = read_string_value(&mut reader, TAG_VALUE, true)?;
                }
                Event::End(event) if event.name() == TAG_CELL => {
                    if kind != CellType::Empty && !value.is_empty() {
                        cells.push((row, col, kind, std::mem::take(&mut value)));
                    }
                    kind = CellType::Empty;
                }
            });
        }

        let shared_strings = self.shared_strings.as_deref().unwrap_or_default();
        for (row, col, kind, raw) in cells {
            let cell = match kind {
                CellType::SharedString => {
                    let index = raw.trim().parse::<usize>()?;
                    shared_strings.get(index)
                        .map(|text| CellValue::from(text.as_str()))
                        .ok_or_else(|| self.cell_error(sheet_name, row, col, format!("shared string {index} does not exist")))?
                }
                _ => CellValue::parse(kind, &raw).map_err(|message| self.cell_error(sheet_name, row, col, message))?,
            };
            sheet.push(row, col, cell);
        }
        Ok(sheet)
    }
}

impl XlsxSpreadsheet {
    fn cell_error(&self, sheet_name: &str, row: usize, col: usize, message: String) -> SpreadsheetError {
        SpreadsheetError::CellValueError(
            self.name.to_owned(),
            sheet_name.to_owned(),
            index_to_reference(row, col),
            message,
        )
    }
}

/// Resolves the value type of a cell from its `t` attribute, falling back to the
/// number format of its style for numeric cells.
fn cell_type(cell_formats: &[CellType], type_attribute: Option<&str>, style: Option<usize>, criteria: &Criteria) -> CellType {
    match type_attribute {
        Some("s") => CellType::SharedString,
        Some("inlineStr") | Some("str") => CellType::InlineString,
        Some("b") => CellType::Boolean,
        Some("d") => CellType::IsoDateTime,
        Some("e") if criteria.error_as_empty => CellType::Empty,
        Some("e") => CellType::Error,
        _ => style
            .and_then(|index| cell_formats.get(index).copied())
            .unwrap_or(CellType::Number),
    }
}

/// Reads `xl/workbook.xml`: worksheet names with their part paths, and the date system.
fn load_workbook(name: &str, zip: &mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, DateSystem), SheetTablesError> {
    let relationships = excel::load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError(name.to_owned(), "xl/workbook.xml".to_owned()))?;
    let mut sheets = Vec::<(String, String)>::new();
    let mut is_1904 = false;
    for_each_xml_event!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut sheet_name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for attribute in event.attributes() {
                let attribute = attribute?;
                match attribute.key.local_name().as_ref() {
                    b"name" => sheet_name = Some(attribute.get_value()?),
                    b"id" => id = Some(attribute.get_value()?),
                    _ => (),
                }
            }
            if let Some((sheet_name, path)) = sheet_name.zip(id.and_then(|id| relationships.get(&*id))) {
                sheets.push((sheet_name.into_owned(), path.to_owned()));
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, DateSystem::from_flag(is_1904)))
}

/// Reads the whole shared string table; workbooks without one get an empty table.
fn load_shared_strings(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>, SheetTablesError> {
    let mut shared_strings = Vec::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    for_each_xml_event!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Collects the text up to `end_tag`, skipping phonetic runs.
/// With `is_text_content` the element's own character data counts (`<v>`);
/// otherwise only `<t>` runs do (`<si>`, `<is>`).
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, UnifiedReader>>>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, SheetTablesError> {
    let mut in_phonetic = false;
    let mut in_text = is_text_content;
    let mut text = String::new();
    for_each_xml_event!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => in_phonetic = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => in_phonetic = false,
        Event::Start(event) if !in_phonetic && event.name() == TAG_TEXT => in_text = true,
        Event::End(event) if in_text && event.name() == TAG_TEXT => in_text = false,
        Event::Text(event) if in_text => text.push_bytes_text(&event)?,
        Event::CData(event) if in_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if in_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
