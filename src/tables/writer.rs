use crate::error::SheetTablesError;
use crate::spreadsheet::CellValue;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a header record followed by one record per row.
/// Rows shorter than the header are padded with empty fields; longer rows are an error.
pub fn write_table<W: Write>(output: W, header: &[String], rows: &[Vec<CellValue>]) -> Result<(), SheetTablesError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(output);
    writer.write_record(header)?;
    let mut record = Vec::<String>::with_capacity(header.len());
    for row in rows {
        record.clear();
        record.extend(row.iter().map(CellValue::to_string));
        record.resize(header.len().max(record.len()), String::new());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Creates (or truncates) the file at `path` and writes the table into it.
pub fn write_table_to_path(path: &Path, header: &[String], rows: &[Vec<CellValue>]) -> Result<(), SheetTablesError> {
    let file = File::create(path)?;
    write_table(file, header, rows)
}
