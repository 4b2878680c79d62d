use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::Timelike;
use iso8601_duration::Duration as IsoDuration;
use std::fmt::Display;

const MILLISECONDS_PER_DAY: f64 = 86_400_000.0;

/// Epoch used by a workbook for serial date numbers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum DateSystem {
    /// Day 1 is 1900-01-01, including the Lotus 1-2-3 phantom 1900-02-29.
    Excel1900,
    /// Day 0 is 1904-01-01.
    Excel1904,
}

impl DateSystem {
    pub(crate) fn from_flag(is_1904: bool) -> Self {
        if is_1904 { Self::Excel1904 } else { Self::Excel1900 }
    }

    /// Converts a serial day number (fraction = time of day) into a timestamp.
    pub(crate) fn to_datetime(self, serial: f64) -> Option<NaiveDateTime> {
        if !serial.is_finite() {
            return None;
        }
        let days = serial.floor() as i64;
        let offset = match self {
            Self::Excel1904 => 1_462,
            Self::Excel1900 if days < 60 => 1,
            Self::Excel1900 => 0,
        };
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
        let time = to_milliseconds((serial - serial.floor()) * MILLISECONDS_PER_DAY)?;
        epoch.checked_add_signed(Duration::try_days(days.checked_add(offset)?)?)?
            .checked_add_signed(time)
    }
}

/// Rounds a millisecond count to a duration; `None` when it does not fit.
fn to_milliseconds(milliseconds: f64) -> Option<Duration> {
    let milliseconds = milliseconds.round();
    if !milliseconds.is_finite() || milliseconds.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(milliseconds as i64)
}

/// How the raw text of a cell must be interpreted, derived from the cell's
/// type attribute and, for numbers, its number format.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    Boolean,
    Number,
    /// Serial number formatted with both date and time parts
    SerialDateTime(DateSystem),
    /// Serial number formatted as a date only
    SerialDate(DateSystem),
    /// Serial number formatted as a time of day
    SerialTime,
    /// ISO 8601 date or date-time text
    IsoDateTime,
    /// ISO 8601 duration text (`PT12H30M0S`)
    IsoDuration,
    InlineString,
    /// Index into the workbook's shared string table
    SharedString,
    Error,
}

impl CellType {
    /// Maps built-in Excel number format ids to date and time cell types.
    pub(crate) fn from_builtin_format_id(id: &str, system: DateSystem) -> Option<Self> {
        match id {
            "22" => Some(Self::SerialDateTime(system)),
            "14" | "15" | "16" | "17" => Some(Self::SerialDate(system)),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::SerialTime),
            _ => None,
        }
    }

    /// Classifies a custom number format code by the date and time tokens it contains.
    /// Quoted literals, escaped characters and bracketed sections such as colors are ignored.
    pub(crate) fn from_format_code(code: &str, system: DateSystem) -> Self {
        let mut escaped = false;
        let mut quoted = false;
        let mut bracketed = false;
        let mut has_date = false;
        let mut has_time = false;
        for character in code.chars() {
            match character {
                _ if escaped => escaped = false,
                '\\' | '_' => escaped = true,
                '"' => quoted = !quoted,
                _ if quoted => (),
                '[' => bracketed = true,
                ']' => bracketed = false,
                _ if bracketed => (),
                'y' | 'Y' | 'd' | 'D' => has_date = true,
                'h' | 'H' | 's' | 'S' => has_time = true,
                _ => (),
            }
        }

        match (has_date, has_time) {
            (true, true) => Self::SerialDateTime(system),
            (true, false) => Self::SerialDate(system),
            (false, true) => Self::SerialTime,
            (false, false) => Self::Number,
        }
    }
}

/// A single spreadsheet cell value.
/// Emptiness is a property of the tag: readers never produce `Text("")`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Time of day or elapsed time
    Duration(Duration),
    /// Spreadsheet error literal such as `#DIV/0!`
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Converts the raw text stored for a cell into a typed value.
    /// Shared strings must be resolved by the caller before this is invoked.
    pub(crate) fn parse(kind: CellType, raw: &str) -> Result<CellValue, String> {
        let number = || raw.trim().parse::<f64>().map_err(|_| format!("'{raw}' is not a number"));
        let value = match kind {
            CellType::Empty => CellValue::Empty,
            _ if raw.is_empty() => CellValue::Empty,
            CellType::Boolean => CellValue::Boolean(raw == "1" || raw.eq_ignore_ascii_case("true")),
            CellType::Number => CellValue::Number(number()?),
            CellType::SerialDateTime(system) => CellValue::DateTime(
                system.to_datetime(number()?).ok_or_else(|| format!("'{raw}' is out of the date range"))?,
            ),
            CellType::SerialDate(system) => CellValue::Date(
                system.to_datetime(number()?).ok_or_else(|| format!("'{raw}' is out of the date range"))?.date(),
            ),
            CellType::SerialTime => CellValue::Duration(
                to_milliseconds(number()? * MILLISECONDS_PER_DAY).ok_or_else(|| format!("'{raw}' is out of the time range"))?,
            ),
            CellType::IsoDateTime => parse_iso_datetime(raw)?,
            CellType::IsoDuration => parse_iso_duration(raw)?,
            CellType::InlineString | CellType::SharedString => CellValue::Text(raw.to_owned()),
            CellType::Error => CellValue::Error(raw.to_owned()),
        };
        Ok(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_owned())
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

/// Renders the value the way it is written to CSV.
impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) | CellValue::Error(text) => f.write_str(text),
            CellValue::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            CellValue::Number(number) => write!(f, "{number}"),
            CellValue::Boolean(true) => f.write_str("True"),
            CellValue::Boolean(false) => f.write_str("False"),
            CellValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            CellValue::DateTime(datetime) if datetime.nanosecond() == 0 => {
                write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S"))
            }
            CellValue::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S%.6f")),
            CellValue::Duration(duration) => {
                let sign = if duration.num_milliseconds() < 0 { "-" } else { "" };
                let mut rest = duration.num_milliseconds().abs();
                let milliseconds = rest % 1_000; rest /= 1_000;
                let seconds = rest % 60; rest /= 60;
                let minutes = rest % 60;
                let hours = rest / 60;
                if milliseconds > 0 {
                    write!(f, "{sign}{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
                } else {
                    write!(f, "{sign}{hours:02}:{minutes:02}:{seconds:02}")
                }
            }
        }
    }
}

fn parse_iso_datetime(raw: &str) -> Result<CellValue, String> {
    let raw = raw.trim();
    if raw.contains('T') {
        NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
            .map(CellValue::DateTime)
            .map_err(|_| format!("'{raw}' is not an ISO date-time"))
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(CellValue::Date)
            .map_err(|_| format!("'{raw}' is not an ISO date"))
    }
}

fn parse_iso_duration(raw: &str) -> Result<CellValue, String> {
    let duration = raw.trim()
        .parse::<IsoDuration>()
        .map_err(|_| format!("'{raw}' is not an ISO 8601 duration"))?;
    let seconds = (duration.hour as f64) * 3_600.0 + (duration.minute as f64) * 60.0 + duration.second as f64;
    to_milliseconds(seconds * 1_000.0)
        .map(CellValue::Duration)
        .ok_or_else(|| format!("'{raw}' is out of the time range"))
}
