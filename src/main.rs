//! `sheet-tables` CLI - Split workbook sheets into tables and export them as CSV

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use sheet_tables::convert_sheet;
use sheet_tables::extract_and_save;
use sheet_tables::logging::init_logging;
use sheet_tables::logging::LogOptions;
use sheet_tables::Criteria;
use sheet_tables::Range;
use sheet_tables::Workbook;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;

#[derive(Parser)]
#[command(name = "sheet-tables")]
#[command(about = "Split spreadsheet sheets into blank-row separated tables and save them as CSV")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    logging: LoggingArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LoggingArgs {
    /// Folder for timestamped log files
    #[arg(long, global = true, env = "SHEET_TABLES_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Log filter used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log to the console only
    #[arg(long, global = true)]
    no_log_file: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every table of a workbook into `{sheet}_table_{n}.csv` files
    Extract {
        /// Workbook file (.xlsx, .xlsm, .xlam, .ods)
        workbook: PathBuf,

        /// Output folder, created when missing
        #[arg(short, long, env = "SHEET_TABLES_OUTPUT", default_value = "output")]
        output: PathBuf,

        /// Only process sheets matching this glob pattern (repeatable)
        #[arg(short, long = "sheet")]
        sheets: Vec<String>,

        /// Only read cells inside this range, e.g. A1:D20, B:D or 3:10
        #[arg(short, long)]
        range: Option<String>,

        /// Keep spreadsheet error cells (#N/A, #DIV/0!) instead of reading them as empty
        #[arg(long)]
        keep_errors: bool,
    },

    /// Convert one sheet to a single CSV file with a header row
    Convert {
        /// Workbook file (.xlsx, .xlsm, .xlam, .ods)
        workbook: PathBuf,

        /// Sheet to convert
        #[arg(short, long)]
        sheet: String,

        /// 0-based row holding the column names; the first row is usually a title
        #[arg(long, default_value = "1")]
        header_row: usize,

        /// CSV file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Workbook file (.xlsx, .xlsm, .xlam, .ods)
        workbook: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = LogOptions {
        directory: (!cli.logging.no_log_file).then(|| cli.logging.log_dir.clone()),
        level: cli.logging.log_level.clone(),
    };
    let log_path = init_logging(&options).context("Failed to initialize logging")?;
    if let Some(path) = log_path {
        debug!(path = %path.display(), "Logging to file");
    }

    match cli.command {
        Commands::Extract { workbook, output, sheets, range, keep_errors } => {
            cmd_extract(&workbook, &output, &sheets, range.as_deref(), !keep_errors)?;
        }
        Commands::Convert { workbook, sheet, header_row, output } => {
            cmd_convert(&workbook, &sheet, header_row, &output)?;
        }
        Commands::Sheets { workbook } => {
            cmd_sheets(&workbook)?;
        }
    }

    Ok(())
}

fn open(path: &Path) -> Result<Workbook> {
    Workbook::open(path).with_context(|| format!("Failed to open workbook '{}'", path.display()))
}

fn cmd_extract(
    path: &Path,
    output: &Path,
    sheets: &[String],
    range: Option<&str>,
    error_as_empty: bool,
) -> Result<()> {
    let range = range
        .map(Range::try_from)
        .transpose()
        .context("Invalid --range")?;
    let criteria = Criteria::default()
        .with_sheet_patterns(sheets)
        .context("Invalid --sheet pattern")?
        .with_range(range)
        .with_error_as_empty(error_as_empty);

    let mut workbook = open(path)?;
    info!(workbook = %path.display(), output = %output.display(), "Extracting tables");
    let report = extract_and_save(&mut workbook, output, &criteria)
        .with_context(|| format!("Failed to extract tables from '{}'", path.display()))?;

    for table in &report.tables {
        println!("{}\t{} rows\t{} columns", table.path.display(), table.rows, table.columns);
    }
    info!(tables = report.len(), "Extraction finished");
    Ok(())
}

fn cmd_convert(path: &Path, sheet: &str, header_row: usize, output: &Path) -> Result<()> {
    let mut workbook = open(path)?;
    let rows = convert_sheet(&mut workbook, sheet, header_row, output)
        .with_context(|| format!("Failed to convert sheet '{sheet}'"))?;
    println!("{}\t{rows} rows", output.display());
    Ok(())
}

fn cmd_sheets(path: &Path) -> Result<()> {
    let workbook = open(path)?;
    for name in workbook.sheet_names() {
        println!("{name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_defaults_to_second_row_header() {
        let cli = Cli::try_parse_from(["sheet-tables", "convert", "book.xlsx", "-s", "Data", "-o", "data.csv"]).unwrap();
        match cli.command {
            Commands::Convert { header_row, .. } => assert_eq!(header_row, 1),
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn extract_reads_errors_as_empty_unless_kept() {
        let cli = Cli::try_parse_from(["sheet-tables", "extract", "book.xlsx"]).unwrap();
        assert!(matches!(cli.command, Commands::Extract { keep_errors: false, .. }));

        let cli = Cli::try_parse_from(["sheet-tables", "extract", "book.xlsx", "--keep-errors"]).unwrap();
        assert!(matches!(cli.command, Commands::Extract { keep_errors: true, .. }));
    }
}
