use crate::error::ResultMessage;
use crate::error::SheetTablesError;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::Workbook;
use crate::tables::clean;
use crate::tables::split;
use crate::tables::writer::write_table_to_path;
use crate::tables::ExtractError;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;
use tracing::warn;

/// One CSV file written by [`extract_and_save`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedTable {
    pub sheet: String,
    /// 1-based position of the table within its sheet
    pub index: usize,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub tables: Vec<SavedTable>,
}

impl ExtractReport {
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables saved for one sheet, in order.
    pub fn for_sheet<'a>(&'a self, sheet_name: &'a str) -> impl Iterator<Item = &'a SavedTable> + 'a {
        self.tables.iter().filter(move |table| table.sheet == sheet_name)
    }
}

/// File name of the `index`-th (1-based) table of a sheet: `{sheet}_table_{index}.csv`.
/// Characters that cannot appear in a file name are replaced by `_`.
pub fn table_file_name(sheet_name: &str, index: usize) -> String {
    format!("{}_table_{index}.csv", sanitize_sheet_name(sheet_name))
}

fn sanitize_sheet_name(sheet_name: &str) -> String {
    sheet_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// File name stem for `sheet_name` that no earlier sheet uses, with `_2`, `_3`, ... appended
/// on a clash. Stems are compared case-insensitively.
fn unique_stem(sheet_name: &str, used: &mut HashSet<String>) -> String {
    let stem = sanitize_sheet_name(sheet_name);
    let mut candidate = stem.clone();
    let mut suffix = 1;
    while !used.insert(candidate.to_lowercase()) {
        suffix += 1;
        candidate = format!("{stem}_{suffix}");
    }
    candidate
}

/// Splits every sheet accepted by `criteria` into tables and writes each cleaned table to
/// `{sheet}_table_{index}.csv` inside `output_folder`, which is created when missing.
///
/// Sheets are processed in workbook order and the first read or write failure aborts the
/// call. Files written before the failure are left in place. Sheets whose names map to the
/// same file name (`a/b` and `a_b`) get a numeric suffix instead of overwriting each other.
pub fn extract_and_save<P: AsRef<Path>>(
    workbook: &mut Workbook,
    output_folder: P,
    criteria: &Criteria,
) -> Result<ExtractReport, SheetTablesError> {
    let output_folder = output_folder.as_ref();
    fs::create_dir_all(output_folder)
        .map_err(|e| ExtractError::CreateOutputFolderError(output_folder.display().to_string(), e))?;

    let mut report = ExtractReport::default();
    let mut used_stems = HashSet::new();
    for sheet_name in workbook.sheet_names() {
        if !criteria.accept(&sheet_name) {
            continue;
        }
        let stem = unique_stem(&sheet_name, &mut used_stems);
        if stem != sanitize_sheet_name(&sheet_name) {
            warn!(sheet = %sheet_name, stem = %stem, "File name already taken by another sheet");
        }
        let sheet = workbook.read_sheet(&sheet_name, criteria)
            .with_prefix(&format!("Read sheet '{sheet_name}'"))?;
        let tables = split(sheet);
        info!(workbook = workbook.name(), sheet = %sheet_name, tables = tables.len(), "Processing sheet");

        let mut index = 0;
        for table in tables {
            let table = clean(table);
            if table.column_count() == 0 {
                warn!(sheet = %sheet_name, rows = table.row_count(), "Skipping table without columns");
                continue;
            }
            index += 1;
            let path = output_folder.join(table_file_name(&stem, index));
            write_table_to_path(&path, table.columns(), table.rows())
                .with_prefix(&format!("Write '{}'", path.display()))?;
            info!(path = %path.display(), rows = table.row_count(), columns = table.column_count(), "Saved table");
            report.tables.push(SavedTable {
                sheet: sheet_name.clone(),
                index,
                path,
                rows: table.row_count(),
                columns: table.column_count(),
            });
        }
    }
    Ok(report)
}
