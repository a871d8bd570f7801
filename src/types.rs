//! Core types and constants

use chrono::NaiveDate;

/// Timestamp type used throughout the library (month-start calendar dates)
pub type Timestamp = NaiveDate;

/// Series identifier (column name in a panel)
pub type SeriesName = String;

/// Share type (0.0 to 1.0)
pub type Share = f64;

/// Default name of the date column / index label
pub const DATE_COL_DEFAULT: &str = "sasdate";

/// Default date rendering for CSV inputs and artifacts (mm/dd/yyyy)
pub const DATE_FMT_DEFAULT: &str = "%m/%d/%Y";

/// Default significant digits when rendering floats into CSV artifacts
pub const FLOAT_DIGITS_DEFAULT: usize = 10;

/// Missing-value test used everywhere a panel cell is inspected
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Parse a calendar date with the given format, falling back to ISO-8601
pub fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, format)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1959, 1, 1).unwrap();
        assert_eq!(parse_date("1/1/1959", DATE_FMT_DEFAULT), Some(expected));
        assert_eq!(parse_date("1959-01-01", DATE_FMT_DEFAULT), Some(expected));
        assert_eq!(parse_date("Transform:", DATE_FMT_DEFAULT), None);
    }

    #[test]
    fn test_missing() {
        assert!(is_missing(f64::NAN));
        assert!(!is_missing(0.0));
    }
}
