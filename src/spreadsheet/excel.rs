//! Package-level parts of Office Open XML workbooks: relationships and styles.
use crate::error::SheetTablesError;
use crate::for_each_xml_event;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::DateSystem;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use zip::ZipArchive;

const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_CELL_FORMATS: QName = QName(b"cellXfs");
const TAG_CELL_FORMAT: QName = QName(b"xf");

/// Loads worksheet relationships: relationship id to the worksheet part path.
pub(super) fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, path: &str) -> Result<HashMap<String, String>, SheetTablesError> {
    let mut relationships = HashMap::new();
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    for_each_xml_event!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let target = event.get_attribute_value("Target")?;
            let is_worksheet = event.get_attribute_value("Type")?
                .map(|kind| kind.ends_with("/worksheet"))
                .unwrap_or(true);
            if let (true, Some(id), Some(target)) = (is_worksheet, id, target) {
                relationships.insert(id.to_string(), to_zip_path(target));
            }
        }
    });
    Ok(relationships)
}

/// Reads `xl/styles.xml` and returns the cell type implied by each cell format index.
/// Workbooks without styles get an empty table, meaning every number stays a number.
pub(super) fn load_cell_formats(zip: &mut ZipArchive<UnifiedReader>, system: DateSystem) -> Result<Vec<CellType>, SheetTablesError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_ids = Vec::<String>::new();
    let mut in_custom_formats = false;
    let mut in_cell_formats = false;
    for_each_xml_event!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => in_custom_formats = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => in_custom_formats = false,
        Event::Start(event) if in_custom_formats && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let code = event.get_attribute_value("formatCode")?;
            if let Some((id, code)) = id.zip(code) {
                custom_formats.insert(id.to_string(), CellType::from_format_code(&code, system));
            }
        }
        Event::Start(event) if event.name() == TAG_CELL_FORMATS => in_cell_formats = true,
        Event::End(event) if event.name() == TAG_CELL_FORMATS => break,
        Event::Start(event) if in_cell_formats && event.name() == TAG_CELL_FORMAT => {
            format_ids.push(event.get_attribute_value("numFmtId")?.unwrap_or(Cow::Borrowed("0")).to_string());
        }
    });

    Ok(format_ids
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::from_builtin_format_id(id, system))
                .unwrap_or(CellType::Number)
        })
        .collect())
}

/// Resolves a relationship target to a path inside the package.
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_owned()
    } else if path.starts_with("xl/") {
        path.into_owned()
    } else {
        format!("xl/{path}")
    }
}
