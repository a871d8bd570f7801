//! Monthly calendar implementation

use crate::error::{DfmError, Result};
use chrono::{Datelike, Months, NaiveDate};

/// Calendar of fixed-cadence period starts
pub trait PeriodCalendar: Send + Sync {
    /// Check if a date is the first day of a period
    fn is_period_start(&self, date: NaiveDate) -> bool;

    /// Align a date to the start of its period
    fn align(&self, date: NaiveDate) -> NaiveDate;

    /// Get the start of the period `n` periods after `date`'s period
    fn shift(&self, date: NaiveDate, n: i32) -> Result<NaiveDate>;

    /// Get the next period start after the given date
    fn next_period(&self, date: NaiveDate) -> Result<NaiveDate> {
        self.shift(date, 1)
    }

    /// Get all period starts between two dates (inclusive)
    fn periods_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        let mut periods = Vec::new();
        let mut current = self.align(start);
        if current < start {
            current = self.next_period(current)?;
        }

        while current <= end {
            periods.push(current);
            current = self.next_period(current)?;
        }

        Ok(periods)
    }
}

/// Month-start calendar (the FRED-MD cadence)
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthStartCalendar;

impl MonthStartCalendar {
    /// Create a new month-start calendar
    pub fn new() -> Self {
        Self
    }

    /// Signed number of whole months from `start` to `end`
    pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
        (end.year() as i64 - start.year() as i64) * 12 + end.month() as i64
            - start.month() as i64
    }
}

impl PeriodCalendar for MonthStartCalendar {
    fn is_period_start(&self, date: NaiveDate) -> bool {
        date.day() == 1
    }

    fn align(&self, date: NaiveDate) -> NaiveDate {
        date.with_day(1).unwrap_or(date)
    }

    fn shift(&self, date: NaiveDate, n: i32) -> Result<NaiveDate> {
        let aligned = self.align(date);
        let shifted = if n >= 0 {
            aligned.checked_add_months(Months::new(n as u32))
        } else {
            aligned.checked_sub_months(Months::new(n.unsigned_abs()))
        };
        shifted.ok_or_else(|| {
            DfmError::NonMonotonicOrInvalidIndex(format!(
                "shifting {} by {} months leaves the supported date range",
                date, n
            ))
        })
    }
}
