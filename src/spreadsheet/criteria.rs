use crate::error::SheetTablesError;
use crate::spreadsheet::range::Range;
use glob::Pattern;

/// Which sheets and cells to load from a workbook.
#[derive(Clone, Debug)]
pub struct Criteria {
    /// Sheet name patterns; `None` accepts every sheet.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Cell range to read inside each sheet; `None` reads the whole used area.
    pub range: Option<Range>,

    /// Read spreadsheet error cells (`#DIV/0!`, `#N/A`, ...) as empty cells. On by default,
    /// so a row of errors separates tables and a column of errors is dropped.
    pub error_as_empty: bool,
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria {
            sheet_name_patterns: None,
            range: None,
            error_as_empty: true,
        }
    }
}

impl Criteria {
    /// Restricts the criteria to sheets matching any of the given glob patterns.
    /// An empty list keeps every sheet.
    pub fn with_sheet_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, SheetTablesError> {
        self.sheet_name_patterns = if patterns.is_empty() {
            None
        } else {
            Some(patterns.iter()
                .map(|pattern| Pattern::new(pattern.as_ref()))
                .collect::<Result<Vec<_>, _>>()?)
        };
        Ok(self)
    }

    pub fn with_range(mut self, range: Option<Range>) -> Self {
        self.range = range;
        self
    }

    pub fn with_error_as_empty(mut self, error_as_empty: bool) -> Self {
        self.error_as_empty = error_as_empty;
        self
    }

    /// Returns true if no patterns are set or `sheet_name` matches one of them.
    pub fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }

    pub(crate) fn range(&self) -> Range {
        self.range.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_everything_by_default() {
        let criteria = Criteria::default();
        assert!(criteria.accept("Sheet1"));
        assert!(criteria.accept(""));
        assert!(criteria.error_as_empty);
        assert!(!criteria.with_error_as_empty(false).error_as_empty);
    }

    #[test]
    fn filters_by_patterns() {
        let criteria = Criteria::default()
            .with_sheet_patterns(&["Sales*", "Summary"])
            .unwrap();
        assert!(criteria.accept("Sales 2024"));
        assert!(criteria.accept("Summary"));
        assert!(!criteria.accept("Notes"));
    }

    #[test]
    fn empty_pattern_list_accepts_everything() {
        let criteria = Criteria::default().with_sheet_patterns::<&str>(&[]).unwrap();
        assert!(criteria.sheet_name_patterns.is_none());
        assert!(criteria.accept("anything"));
    }

    #[test]
    fn invalid_pattern() {
        assert!(Criteria::default().with_sheet_patterns(&["[a-"]).is_err());
    }
}
