//! Contiguous month-start calendar enforcement

use crate::calendar::{MonthStartCalendar, PeriodCalendar};
use crate::error::{DfmError, Result};
use crate::panel::{Column, Panel};
use crate::types::Timestamp;
use hashbrown::HashMap;

/// Reindexes panels onto a gap-free monthly axis
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyGridEnforcer {
    calendar: MonthStartCalendar,
}

impl MonthlyGridEnforcer {
    pub fn new() -> Self {
        Self {
            calendar: MonthStartCalendar::new(),
        }
    }

    /// Month starts from `start` to `end`, inclusive
    pub fn month_range(&self, start: Timestamp, end: Timestamp) -> Result<Vec<Timestamp>> {
        self.calendar.periods_between(start, end)
    }

    /// Reindex onto the full month-start range spanning the panel.
    ///
    /// Months absent from the input come back as all-missing rows. The axis
    /// name is preserved. Timestamps must be month starts and unique; anything
    /// else is rejected rather than snapped onto the grid.
    pub fn enforce(&self, panel: &Panel) -> Result<Panel> {
        let sorted = panel.sorted_by_date();
        let (first, last) = match (sorted.first_date(), sorted.last_date()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(DfmError::EmptyPanel { stage: "monthly grid" }),
        };

        if let Some(bad) = sorted.dates().iter().find(|d| !self.calendar.is_period_start(**d)) {
            return Err(DfmError::NonMonotonicOrInvalidIndex(format!(
                "{} is not a month start",
                bad
            )));
        }
        if let Some(pair) = sorted.dates().windows(2).find(|w| w[0] == w[1]) {
            return Err(DfmError::NonMonotonicOrInvalidIndex(format!(
                "duplicate timestamp {}",
                pair[0]
            )));
        }

        let grid = self.month_range(first, last)?;
        let source_row: HashMap<Timestamp, usize> = sorted
            .dates()
            .iter()
            .enumerate()
            .map(|(row, date)| (*date, row))
            .collect();
        let rows: Vec<Option<usize>> = grid.iter().map(|d| source_row.get(d).copied()).collect();

        let columns = sorted
            .columns()
            .iter()
            .map(|column| {
                let values = rows
                    .iter()
                    .map(|row| row.map_or(f64::NAN, |r| column.values[r]))
                    .collect();
                Column::new(column.name.clone(), values)
            })
            .collect();

        let inserted = grid.len() - sorted.n_rows();
        if inserted > 0 {
            log::info!(
                "Monthly grid {}..{}: inserted {} empty month(s)",
                first,
                last,
                inserted
            );
        }

        Panel::new(sorted.index_name().to_string(), grid, columns)
    }
}

/// Reindex a panel onto a contiguous month-start calendar
pub fn ensure_monthly(panel: &Panel) -> Result<Panel> {
    MonthlyGridEnforcer::new().enforce(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(y: i32, m: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_fills_calendar_gaps() {
        let panel = Panel::from_pairs(
            "sasdate",
            vec![month(1999, 11), month(2000, 2), month(1999, 12)],
            vec![("A", vec![1.0, 4.0, 2.0])],
        )
        .unwrap();
        let out = ensure_monthly(&panel).unwrap();
        assert_eq!(
            out.dates(),
            &[month(1999, 11), month(1999, 12), month(2000, 1), month(2000, 2)]
        );
        let a = out.values("A").unwrap();
        assert_eq!(a[0], 1.0);
        assert_eq!(a[1], 2.0);
        assert!(a[2].is_nan());
        assert_eq!(a[3], 4.0);
        assert_eq!(out.index_name(), "sasdate");
    }

    #[test]
    fn test_idempotent() {
        let panel = Panel::from_pairs(
            "date",
            vec![month(2000, 1), month(2000, 4)],
            vec![("A", vec![1.0, f64::NAN])],
        )
        .unwrap();
        let once = ensure_monthly(&panel).unwrap();
        let twice = ensure_monthly(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_panel() {
        let panel = Panel::new("sasdate", vec![], vec![]).unwrap();
        assert!(matches!(
            ensure_monthly(&panel),
            Err(DfmError::EmptyPanel { .. })
        ));
    }

    #[test]
    fn test_rejects_mid_month_and_duplicates() {
        let mid = Panel::from_pairs(
            "sasdate",
            vec![NaiveDate::from_ymd_opt(2000, 1, 15).unwrap()],
            vec![("A", vec![1.0])],
        )
        .unwrap();
        assert!(matches!(
            ensure_monthly(&mid),
            Err(DfmError::NonMonotonicOrInvalidIndex(_))
        ));

        let dup = Panel::from_pairs(
            "sasdate",
            vec![month(2000, 1), month(2000, 1)],
            vec![("A", vec![1.0, 2.0])],
        )
        .unwrap();
        assert!(matches!(
            ensure_monthly(&dup),
            Err(DfmError::NonMonotonicOrInvalidIndex(_))
        ));
    }
}
