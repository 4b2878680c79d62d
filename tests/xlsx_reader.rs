use sheet_tables::extract_and_save;
use sheet_tables::CellValue;
use sheet_tables::Criteria;
use sheet_tables::Workbook;
use std::error::Error;
use std::fs;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

type TestResult = Result<(), Box<dyn Error>>;

// Column C holds errors only and row 3 holds nothing but errors
const ERROR_ROWS: &str = r##"
<row r="1"><c r="A1" t="inlineStr"><is><t>Name</t></is></c><c r="B1" t="inlineStr"><is><t>Score</t></is></c><c r="C1" t="e"><v>#REF!</v></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Ann</t></is></c><c r="B2"><v>1</v></c><c r="C2" t="e"><v>#N/A</v></c></row>
<row r="3"><c r="A3" t="e"><v>#N/A</v></c><c r="B3" t="e"><v>#DIV/0!</v></c></row>
<row r="4"><c r="A4" t="inlineStr"><is><t>Bob</t></is></c><c r="B4"><v>2</v></c><c r="C4" t="e"><v>#N/A</v></c></row>
"##;

const GOOD_ROWS: &str = r#"<row r="1"><c r="A1" t="inlineStr"><is><t>ok</t></is></c></row>"#;

// Shared string index with no shared string table in the package
const BROKEN_ROWS: &str = r#"<row r="1"><c r="A1" t="s"><v>5</v></c></row>"#;

/// Assembles a minimal `.xlsx` package with one worksheet per `(name, sheetData rows)` pair.
fn build_xlsx(sheets: &[(&str, &str)]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut workbook = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    ));
    let mut relationships = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    ));
    for (index, (name, _)) in sheets.iter().enumerate() {
        let id = index + 1;
        workbook.push_str(&format!(r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#,
        ));
    }
    workbook.push_str("</sheets></workbook>");
    relationships.push_str("</Relationships>");

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("xl/workbook.xml", SimpleFileOptions::default())?;
    zip.write_all(workbook.as_bytes())?;
    zip.start_file("xl/_rels/workbook.xml.rels", SimpleFileOptions::default())?;
    zip.write_all(relationships.as_bytes())?;
    for (index, (_, rows)) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), SimpleFileOptions::default())?;
        zip.write_all(concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        ).as_bytes())?;
        zip.write_all(rows.as_bytes())?;
        zip.write_all(b"</sheetData></worksheet>")?;
    }
    Ok(zip.finish()?.into_inner())
}

fn open_errors() -> Result<Workbook, Box<dyn Error>> {
    Ok(Workbook::from_bytes("errors.xlsx", build_xlsx(&[("Errors", ERROR_ROWS)])?)?)
}

#[test]
fn error_cells_are_empty_by_default() -> TestResult {
    let sheet = open_errors()?.read_sheet("Errors", &Criteria::default())?;
    assert_eq!(sheet.rows()[1], vec![CellValue::from("Ann"), CellValue::Number(1.0)]);
    assert!(sheet.rows()[2].iter().all(CellValue::is_empty));
    Ok(())
}

#[test]
fn error_rows_split_and_error_columns_drop() -> TestResult {
    let dir = tempfile::tempdir()?;
    let report = extract_and_save(&mut open_errors()?, dir.path(), &Criteria::default())?;

    assert_eq!(report.len(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("Errors_table_1.csv"))?,
        "Column_0,Column_1\nName,Score\nAnn,1\n",
    );
    assert_eq!(fs::read_to_string(dir.path().join("Errors_table_2.csv"))?, "Column_0,Column_1\nBob,2\n");
    Ok(())
}

#[test]
fn keeps_error_cells_on_request() -> TestResult {
    let dir = tempfile::tempdir()?;
    let criteria = Criteria::default().with_error_as_empty(false);
    let sheet = open_errors()?.read_sheet("Errors", &criteria)?;
    assert_eq!(sheet.rows()[1][2], CellValue::Error("#N/A".to_owned()));

    let report = extract_and_save(&mut open_errors()?, dir.path(), &criteria)?;
    assert_eq!(report.len(), 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("Errors_table_1.csv"))?,
        "Column_0,Column_1,Column_2\nName,Score,#REF!\nAnn,1,#N/A\n#N/A,#DIV/0!,\nBob,2,#N/A\n",
    );
    Ok(())
}

#[test]
fn read_failure_stops_extraction() -> TestResult {
    let dir = tempfile::tempdir()?;
    let bytes = build_xlsx(&[("Good", GOOD_ROWS), ("Broken", BROKEN_ROWS), ("Later", GOOD_ROWS)])?;
    let mut workbook = Workbook::from_bytes("broken.xlsx", bytes)?;

    let error = extract_and_save(&mut workbook, dir.path(), &Criteria::default()).unwrap_err();
    assert!(error.to_string().starts_with("Read sheet 'Broken'"), "{error}");
    assert!(error.to_string().contains("shared string 5 does not exist"), "{error}");
    assert_eq!(fs::read_to_string(dir.path().join("Good_table_1.csv"))?, "Column_0\nok\n");
    assert!(!dir.path().join("Broken_table_1.csv").exists());
    assert!(!dir.path().join("Later_table_1.csv").exists());
    Ok(())
}
