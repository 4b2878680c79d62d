//! Console and file logging for the command line tool.
use crate::error::SheetTablesError;
use chrono::Local;
use chrono::NaiveDateTime;
use std::fs;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
pub struct LogOptions {
    /// Folder for the timestamped log file; `None` logs to the console only
    pub directory: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        LogOptions {
            directory: Some(PathBuf::from("logs")),
            level: "info".to_owned(),
        }
    }
}

/// Name of the log file opened at `now`.
pub fn log_file_name(now: NaiveDateTime) -> String {
    now.format("app_log_%Y%m%d_%H%M%S.log").to_string()
}

/// Installs the global subscriber: formatted events on stdout and, when a directory is
/// configured, the same events without colors in `{directory}/app_log_{timestamp}.log`.
/// Returns the path of the log file.
pub fn init_logging(options: &LogOptions) -> Result<Option<PathBuf>, SheetTablesError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&options.level)
            .map_err(|e| SheetTablesError::WithContextError(format!("Invalid log level '{}': {e}", options.level)))?,
    };

    let mut log_path = None;
    let file_layer = match &options.directory {
        Some(directory) => {
            fs::create_dir_all(directory)?;
            let path = directory.join(log_file_name(Local::now().naive_local()));
            let file = File::create(&path)?;
            log_path = Some(path);
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| SheetTablesError::WithContextError(format!("Cannot install logger: {e}")))?;
    Ok(log_path)
}
