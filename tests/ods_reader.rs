use sheet_tables::extract_and_save;
use sheet_tables::split;
use sheet_tables::CellValue;
use sheet_tables::Criteria;
use sheet_tables::Workbook;
use std::error::Error;
use std::fs;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

type TestResult = Result<(), Box<dyn Error>>;

const MIME_TYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

const CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content
    xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"
    xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0"
    xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0"
    xmlns:calcext="urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0">
<office:body><office:spreadsheet>
<table:table table:name="Inventory">
<table:table-row>
<table:table-cell office:value-type="string"><text:p>Item</text:p></table:table-cell>
<table:table-cell table:number-columns-repeated="2"/>
<table:table-cell office:value-type="string"><text:p>Qty</text:p></table:table-cell>
</table:table-row>
<table:table-row>
<table:table-cell office:value-type="string"><text:p>Bolt<text:s text:c="2"/>M4</text:p></table:table-cell>
<table:table-cell table:number-columns-repeated="2"/>
<table:table-cell office:value-type="float" office:value="12"><text:p>12</text:p></table:table-cell>
</table:table-row>
<table:table-row table:number-rows-repeated="3"><table:table-cell table:number-columns-repeated="4"/></table:table-row>
<table:table-row>
<table:table-cell office:value-type="date" office:date-value="2024-03-01"><text:p>01/03/2024</text:p></table:table-cell>
<table:table-cell office:value-type="boolean" office:boolean-value="true"><text:p>TRUE</text:p></table:table-cell>
<table:table-cell office:value-type="float" office:value="0" calcext:value-type="error"><text:p>#DIV/0!</text:p></table:table-cell>
<table:table-cell office:value-type="string"><office:annotation><text:p>reviewer note</text:p></office:annotation><text:p>line one</text:p><text:p>line two</text:p></table:table-cell>
</table:table-row>
<table:table-row table:number-rows-repeated="2"><table:table-cell table:number-columns-repeated="2" office:value-type="string"><text:p>rep</text:p></table:table-cell></table:table-row>
<table:table-row table:number-rows-repeated="1048570"><table:table-cell table:number-columns-repeated="1024"/></table:table-row>
</table:table>
<table:table table:name="Blank">
<table:table-row table:number-rows-repeated="10"><table:table-cell/></table:table-row>
</table:table>
</office:spreadsheet></office:body>
</office:document-content>"#;

// Pretty-printed the way some producers write content.xml
const INDENTED_CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content
    xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"
    xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0"
    xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
  <office:body>
    <office:spreadsheet>
      <table:table table:name="Indented">
        <table:table-row>
          <table:table-cell office:value-type="string">
            <text:p>a</text:p>
          </table:table-cell>
        </table:table-row>
        <table:table-row>
          <table:table-cell office:value-type="string">
            <text:p/>
          </table:table-cell>
        </table:table-row>
        <table:table-row>
          <table:table-cell office:value-type="string">
            <text:p>b</text:p>
            <text:p>c</text:p>
          </table:table-cell>
        </table:table-row>
      </table:table>
    </office:spreadsheet>
  </office:body>
</office:document-content>"#;

const CLASHING_CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content
    xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"
    xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0"
    xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
<office:body><office:spreadsheet>
<table:table table:name="a/b"><table:table-row><table:table-cell office:value-type="string"><text:p>first</text:p></table:table-cell></table:table-row></table:table>
<table:table table:name="a_b"><table:table-row><table:table-cell office:value-type="string"><text:p>second</text:p></table:table-cell></table:table-row></table:table>
</office:spreadsheet></office:body>
</office:document-content>"#;

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
<manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#;

const ENCRYPTED_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml">
<manifest:encryption-data manifest:checksum-type="SHA1/1K" manifest:checksum="AAAA"/>
</manifest:file-entry>
</manifest:manifest>"#;

fn build_ods(mime_type: &str, content: &str, manifest: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("mimetype", SimpleFileOptions::default().compression_method(CompressionMethod::Stored))?;
    zip.write_all(mime_type.as_bytes())?;
    zip.start_file("content.xml", SimpleFileOptions::default())?;
    zip.write_all(content.as_bytes())?;
    zip.start_file("META-INF/manifest.xml", SimpleFileOptions::default())?;
    zip.write_all(manifest.as_bytes())?;
    Ok(zip.finish()?.into_inner())
}

fn open() -> Result<Workbook, Box<dyn Error>> {
    Ok(Workbook::from_bytes("inventory.ods", build_ods(MIME_TYPE, CONTENT, MANIFEST)?)?)
}

#[test]
fn lists_tables_as_sheets() -> TestResult {
    assert_eq!(open()?.sheet_names(), vec!["Inventory", "Blank"]);
    Ok(())
}

#[test]
fn reads_typed_cells() -> TestResult {
    let criteria = Criteria::default().with_error_as_empty(false);
    let sheet = open()?.read_sheet("Inventory", &criteria)?;
    let rows = sheet.rows();
    assert_eq!(rows.len(), 8);
    assert_eq!(rows[0], vec![CellValue::from("Item"), CellValue::Empty, CellValue::Empty, CellValue::from("Qty")]);
    assert_eq!(rows[1][0], CellValue::from("Bolt  M4"));
    assert_eq!(rows[1][3], CellValue::Number(12.0));
    assert!(rows[2..5].iter().all(Vec::is_empty));
    assert_eq!(rows[5][0].to_string(), "2024-03-01");
    assert_eq!(rows[5][1], CellValue::Boolean(true));
    assert_eq!(rows[5][2], CellValue::Error("#DIV/0!".to_owned()));
    assert_eq!(rows[5][3], CellValue::from("line one\nline two"));
    assert_eq!(rows[6], vec![CellValue::from("rep"), CellValue::from("rep")]);
    assert_eq!(rows[7], rows[6]);
    Ok(())
}

#[test]
fn reads_errors_as_empty_by_default() -> TestResult {
    let sheet = open()?.read_sheet("Inventory", &Criteria::default())?;
    assert_eq!(sheet.rows()[5][2], CellValue::Empty);
    Ok(())
}

#[test]
fn extracts_tables() -> TestResult {
    let dir = tempfile::tempdir()?;
    let report = extract_and_save(&mut open()?, dir.path(), &Criteria::default())?;

    assert_eq!(report.len(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("Inventory_table_1.csv"))?,
        "Column_0,Column_1\nItem,Qty\nBolt  M4,12\n",
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("Inventory_table_2.csv"))?,
        "Column_0,Column_1,Column_2\n2024-03-01,True,\"line one\nline two\"\nrep,rep,\nrep,rep,\n",
    );
    assert!(!dir.path().join("Blank_table_1.csv").exists());
    Ok(())
}

#[test]
fn extracts_error_cells_when_kept() -> TestResult {
    let dir = tempfile::tempdir()?;
    let criteria = Criteria::default().with_error_as_empty(false);
    extract_and_save(&mut open()?, dir.path(), &criteria)?;
    assert_eq!(
        fs::read_to_string(dir.path().join("Inventory_table_2.csv"))?,
        "Column_0,Column_1,Column_2,Column_3\n2024-03-01,True,#DIV/0!,\"line one\nline two\"\nrep,rep,,\nrep,rep,,\n",
    );
    Ok(())
}

#[test]
fn ignores_indentation_outside_paragraphs() -> TestResult {
    let mut workbook = Workbook::from_bytes("indented.ods", build_ods(MIME_TYPE, INDENTED_CONTENT, MANIFEST)?)?;
    let sheet = workbook.read_sheet("Indented", &Criteria::default())?;
    assert_eq!(sheet.rows()[0], vec![CellValue::from("a")]);
    assert!(sheet.rows()[1].iter().all(CellValue::is_empty));
    assert_eq!(sheet.rows()[2], vec![CellValue::from("b\nc")]);

    let tables = split(sheet);
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].rows(), [vec![CellValue::from("a")]]);
    Ok(())
}

#[test]
fn clashing_sheet_names_get_distinct_files() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut workbook = Workbook::from_bytes("clash.ods", build_ods(MIME_TYPE, CLASHING_CONTENT, MANIFEST)?)?;
    let report = extract_and_save(&mut workbook, dir.path(), &Criteria::default())?;

    assert_eq!(report.len(), 2);
    assert_eq!(report.tables[0].sheet, "a/b");
    assert_eq!(report.tables[1].sheet, "a_b");
    assert_eq!(fs::read_to_string(dir.path().join("a_b_table_1.csv"))?, "Column_0\nfirst\n");
    assert_eq!(fs::read_to_string(dir.path().join("a_b_2_table_1.csv"))?, "Column_0\nsecond\n");
    Ok(())
}

#[test]
fn rejects_wrong_mime_type() -> TestResult {
    let bytes = build_ods("application/vnd.oasis.opendocument.text", CONTENT, MANIFEST)?;
    let error = Workbook::from_bytes("letter.ods", bytes).unwrap_err();
    assert!(error.to_string().contains("MIME"), "{error}");
    Ok(())
}

#[test]
fn rejects_encrypted_documents() -> TestResult {
    let bytes = build_ods(MIME_TYPE, CONTENT, ENCRYPTED_MANIFEST)?;
    let error = Workbook::from_bytes("secret.ods", bytes).unwrap_err();
    assert!(error.to_string().contains("password protected"), "{error}");
    Ok(())
}

#[test]
fn sniffs_format_without_extension() -> TestResult {
    let workbook = Workbook::from_bytes("upload", build_ods(MIME_TYPE, CONTENT, MANIFEST)?)?;
    assert_eq!(workbook.sheet_names(), vec!["Inventory", "Blank"]);
    Ok(())
}
