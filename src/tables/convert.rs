use crate::error::ResultMessage;
use crate::error::SheetTablesError;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::Workbook;
use crate::tables::is_blank_row;
use crate::tables::writer::write_table_to_path;
use crate::tables::ExtractError;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Writes one sheet as a single CSV file, taking row `header_row` (0-based) as the header.
///
/// Rows above the header are dropped, as are blank rows at the end of the sheet.
/// Returns the number of data rows written.
pub fn convert_sheet<P: AsRef<Path>>(
    workbook: &mut Workbook,
    sheet_name: &str,
    header_row: usize,
    output_path: P,
) -> Result<usize, SheetTablesError> {
    let output_path = output_path.as_ref();
    let mut rows = workbook.read_sheet(sheet_name, &Criteria::default())?.into_rows();
    if header_row >= rows.len() {
        Err(ExtractError::HeaderRowOutOfRange(sheet_name.to_owned(), header_row, rows.len()))?;
    }

    let mut data = rows.split_off(header_row + 1);
    let header = rows.pop().unwrap_or_default();
    while data.last().is_some_and(|row| is_blank_row(row)) {
        data.pop();
    }

    let width = data.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);
    let columns = header_names(&header, width);
    write_table_to_path(output_path, &columns, &data)
        .with_prefix(&format!("Write '{}'", output_path.display()))?;
    info!(sheet = sheet_name, path = %output_path.display(), rows = data.len(), columns = columns.len(), "Converted sheet");
    Ok(data.len())
}

/// Column names from a header row: empty cells become `Unnamed: {i}` and repeated names
/// get `.1`, `.2`, ... suffixes in order of appearance.
fn header_names(header: &[CellValue], width: usize) -> Vec<String> {
    let names = (0..width).map(|index| match header.get(index) {
        Some(cell) if !cell.is_empty() => cell.to_string(),
        _ => format!("Unnamed: {index}"),
    });

    let mut seen = HashSet::<String>::new();
    let mut counts = HashMap::<String, usize>::new();
    names
        .map(|name| {
            let mut unique = name.clone();
            while seen.contains(&unique) {
                let count = counts.entry(name.clone()).or_insert(0);
                *count += 1;
                unique = format!("{name}.{count}");
            }
            seen.insert(unique.clone());
            unique
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|cell| CellValue::from(*cell)).collect()
    }

    #[test]
    fn names_empty_header_cells() {
        assert_eq!(header_names(&header(&["id", "", "name"]), 4), vec!["id", "Unnamed: 1", "name", "Unnamed: 3"]);
    }

    #[test]
    fn deduplicates_names() {
        assert_eq!(header_names(&header(&["a", "b", "a", "a"]), 4), vec!["a", "b", "a.1", "a.2"]);
        assert_eq!(header_names(&header(&["a", "a.1", "a"]), 3), vec!["a", "a.1", "a.2"]);
    }

    #[test]
    fn typed_header_cells() {
        let header = vec![CellValue::Number(2024.0), CellValue::Boolean(false)];
        assert_eq!(header_names(&header, 2), vec!["2024", "False"]);
    }
}
