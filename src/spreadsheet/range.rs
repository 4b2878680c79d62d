use crate::error::SheetTablesError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::row_to_index;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),
}

/// An Excel-style cell range with optional bounds, e.g. `A1:D20`, `B:D` or `3:10`.
/// All bounds are 0-based and inclusive; `None` leaves that side open.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Range {
    pub row_lower_bound: Option<usize>,
    pub row_upper_bound: Option<usize>,
    pub col_lower_bound: Option<usize>,
    pub col_upper_bound: Option<usize>,
}

impl Range {
    /// First row inside the range.
    pub fn first_row(&self) -> usize {
        self.row_lower_bound.unwrap_or(0)
    }

    /// First column inside the range.
    pub fn first_col(&self) -> usize {
        self.col_lower_bound.unwrap_or(0)
    }

    /// True when `row` lies beyond the upper row bound.
    pub fn is_after_last_row(&self, row: usize) -> bool {
        self.row_upper_bound.is_some_and(|upper| row > upper)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.first_row()
            && col >= self.first_col()
            && !self.is_after_last_row(row)
            && self.col_upper_bound.map_or(true, |upper| col <= upper)
    }
}

impl TryFrom<&str> for Range {
    type Error = SheetTablesError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^([A-Z]*)(\d*)(:([A-Z]*)(\d*))?$").expect("Hardcode regex pattern");
        let value = value.trim().to_ascii_uppercase();
        let captures = pattern
            .captures(&value)
            .ok_or_else(|| RangeError::FormatError(value.to_owned()))?;
        let bound = |index: usize, convert: fn(&str) -> Option<usize>| {
            captures.get(index).map(|matcher| matcher.as_str()).and_then(convert)
        };
        let range = Range {
            col_lower_bound: bound(1, col_to_index),
            row_lower_bound: bound(2, row_to_index),
            col_upper_bound: bound(4, col_to_index),
            row_upper_bound: bound(5, row_to_index),
        };

        let inverted = |lower: Option<usize>, upper: Option<usize>| lower.zip(upper).is_some_and(|(lower, upper)| lower > upper);
        if value.is_empty()
            || inverted(range.row_lower_bound, range.row_upper_bound)
            || inverted(range.col_lower_bound, range.col_upper_bound)
        {
            Err(RangeError::FormatError(value.to_owned()))?;
        }
        Ok(range)
    }
}
