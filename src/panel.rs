//! Monthly panel container
//!
//! A [`Panel`] pairs one ascending timestamp axis with an ordered set of named
//! `f64` series. Missing observations are stored as `NaN`. Every transformation
//! in the crate takes a `&Panel` and returns a new one, so a panel is never
//! mutated in place once built.

use crate::error::{DfmError, Result};
use crate::types::{is_missing, Timestamp, DATE_COL_DEFAULT};
use hashbrown::HashMap;
use std::collections::BTreeMap;

/// One named series aligned to the panel axis
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Number of observations (missing included)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Count missing values
    pub fn n_missing(&self) -> usize {
        self.values.iter().filter(|v| is_missing(**v)).count()
    }

    /// Count observed (non-missing) values
    pub fn n_observed(&self) -> usize {
        self.len() - self.n_missing()
    }

    /// Position of the first non-missing value
    pub fn first_valid(&self) -> Option<usize> {
        self.values.iter().position(|v| !is_missing(*v))
    }

    /// Position of the last non-missing value
    pub fn last_valid(&self) -> Option<usize> {
        self.values.iter().rposition(|v| !is_missing(*v))
    }

    /// Per-row missing flags
    pub fn missing_mask(&self) -> Vec<bool> {
        self.values.iter().map(|v| is_missing(*v)).collect()
    }
}

/// Two cells are equal when both are missing or both hold the same number
fn same_cell(a: f64, b: f64) -> bool {
    (is_missing(a) && is_missing(b)) || a == b
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| same_cell(*a, *b))
    }
}

/// Timestamp axis plus named series
#[derive(Debug, Clone)]
pub struct Panel {
    index_name: String,
    dates: Vec<Timestamp>,
    columns: Vec<Column>,
    lookup: HashMap<String, usize>,
}

impl Panel {
    /// Create a panel, validating column lengths and name uniqueness
    pub fn new(
        index_name: impl Into<String>,
        dates: Vec<Timestamp>,
        columns: Vec<Column>,
    ) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(columns.len());
        for (pos, column) in columns.iter().enumerate() {
            if column.len() != dates.len() {
                return Err(DfmError::LengthMismatch {
                    series: column.name.clone(),
                    expected: dates.len(),
                    actual: column.len(),
                });
            }
            if lookup.insert(column.name.clone(), pos).is_some() {
                return Err(DfmError::DuplicateSeries(column.name.clone()));
            }
        }

        Ok(Self {
            index_name: index_name.into(),
            dates,
            columns,
            lookup,
        })
    }

    /// Create a panel from `(name, values)` pairs
    pub fn from_pairs<S: Into<String>>(
        index_name: impl Into<String>,
        dates: Vec<Timestamp>,
        pairs: Vec<(S, Vec<f64>)>,
    ) -> Result<Self> {
        let columns = pairs
            .into_iter()
            .map(|(name, values)| Column::new(name, values))
            .collect();
        Self::new(index_name, dates, columns)
    }

    /// Build a panel whose columns are already known to match the axis
    pub(crate) fn from_parts(index_name: String, dates: Vec<Timestamp>, columns: Vec<Column>) -> Self {
        let lookup = columns
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.name.clone(), pos))
            .collect();
        Self {
            index_name,
            dates,
            columns,
            lookup,
        }
    }

    /// Name of the timestamp axis
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Return the same panel under a different axis name
    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    /// Axis name, falling back to the FRED-MD default when unnamed
    pub fn index_label(&self) -> &str {
        if self.index_name.is_empty() {
            DATE_COL_DEFAULT
        } else {
            &self.index_name
        }
    }

    pub fn dates(&self) -> &[Timestamp] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// A panel without timestamps
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.lookup.get(name).map(|&pos| &self.columns[pos])
    }

    /// Get a column's values by name
    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.column(name).map(|c| c.values.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Series names in panel order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn first_date(&self) -> Option<Timestamp> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<Timestamp> {
        self.dates.last().copied()
    }

    /// Row position of a timestamp
    pub fn position(&self, date: Timestamp) -> Option<usize> {
        if self.is_sorted() {
            self.dates.binary_search(&date).ok()
        } else {
            self.dates.iter().position(|d| *d == date)
        }
    }

    /// Check the axis is ascending (ties allowed)
    pub fn is_sorted(&self) -> bool {
        self.dates.windows(2).all(|w| w[0] <= w[1])
    }

    /// Return a copy sorted by timestamp; rows with equal timestamps keep their order
    pub fn sorted_by_date(&self) -> Panel {
        if self.is_sorted() {
            return self.clone();
        }
        let mut order: Vec<usize> = (0..self.n_rows()).collect();
        order.sort_by_key(|&i| self.dates[i]);
        self.take_rows(&order)
    }

    /// Select rows by position, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> Panel {
        let dates = rows.iter().map(|&i| self.dates[i]).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), rows.iter().map(|&i| c.values[i]).collect()))
            .collect();
        Panel::from_parts(self.index_name.clone(), dates, columns)
    }

    /// Rows `start..end` (end exclusive, clamped to the panel)
    pub fn slice_rows(&self, start: usize, end: usize) -> Panel {
        let end = end.min(self.n_rows());
        let start = start.min(end);
        let rows: Vec<usize> = (start..end).collect();
        self.take_rows(&rows)
    }

    /// Rows with timestamp on or after `anchor`
    pub fn rows_from(&self, anchor: Timestamp) -> Panel {
        self.rows_between(Some(anchor), None)
    }

    /// Rows within an inclusive, optionally open-ended, timestamp window
    pub fn rows_between(&self, start: Option<Timestamp>, end: Option<Timestamp>) -> Panel {
        let rows: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| start.map_or(true, |s| **d >= s) && end.map_or(true, |e| **d <= e))
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&rows)
    }

    /// Keep only the named columns, in the given order
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Panel> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name.as_ref())
                    .cloned()
                    .ok_or_else(|| DfmError::SeriesNotFound(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Panel::from_parts(self.index_name.clone(), self.dates.clone(), columns))
    }

    /// Remove the named columns (unknown names are ignored)
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Panel {
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.iter().any(|n| n.as_ref() == c.name))
            .cloned()
            .collect();
        Panel::from_parts(self.index_name.clone(), self.dates.clone(), columns)
    }

    /// Replace every column, keeping the axis
    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Panel> {
        Panel::new(self.index_name.clone(), self.dates.clone(), columns)
    }

    /// Rename series; fails if two names collide afterwards
    pub fn rename_columns<F>(&self, mut rename: F) -> Result<Panel>
    where
        F: FnMut(&str) -> String,
    {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(rename(&c.name), c.values.clone()))
            .collect();
        self.with_columns(columns)
    }

    /// Values across all series at one row position
    pub fn row_values(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c.values[row]).collect()
    }

    /// Values across all series at a timestamp
    pub fn row(&self, date: Timestamp) -> Option<Vec<f64>> {
        self.position(date).map(|row| self.row_values(row))
    }

    /// Rows keyed by timestamp (later duplicates win)
    pub fn keyed_rows(&self) -> BTreeMap<Timestamp, Vec<f64>> {
        (0..self.n_rows())
            .map(|row| (self.dates[row], self.row_values(row)))
            .collect()
    }

    /// Fraction of series observed at each row; `NaN` for a panel without series
    pub fn row_coverage(&self) -> Vec<f64> {
        let n_cols = self.n_columns();
        (0..self.n_rows())
            .map(|row| {
                if n_cols == 0 {
                    return f64::NAN;
                }
                let observed = self
                    .columns
                    .iter()
                    .filter(|c| !is_missing(c.values[row]))
                    .count();
                observed as f64 / n_cols as f64
            })
            .collect()
    }

    /// Check whether any series is missing at a row
    pub fn row_has_missing(&self, row: usize) -> bool {
        self.columns.iter().any(|c| is_missing(c.values[row]))
    }
}

impl PartialEq for Panel {
    fn eq(&self, other: &Self) -> bool {
        self.index_name == other.index_name
            && self.dates == other.dates
            && self.columns == other.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(y: i32, m: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn sample() -> Panel {
        Panel::from_pairs(
            "sasdate",
            vec![month(2000, 1), month(2000, 2), month(2000, 3)],
            vec![
                ("A", vec![1.0, f64::NAN, 3.0]),
                ("B", vec![f64::NAN, f64::NAN, 6.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = Panel::from_pairs("sasdate", vec![month(2000, 1)], vec![("A", vec![1.0, 2.0])])
            .unwrap_err();
        assert!(matches!(err, DfmError::LengthMismatch { .. }));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = Panel::from_pairs(
            "sasdate",
            vec![month(2000, 1)],
            vec![("A", vec![1.0]), ("A", vec![2.0])],
        )
        .unwrap_err();
        assert!(matches!(err, DfmError::DuplicateSeries(name) if name == "A"));
    }

    #[test]
    fn test_column_positions() {
        let panel = sample();
        let b = panel.column("B").unwrap();
        assert_eq!(b.first_valid(), Some(2));
        assert_eq!(b.n_missing(), 2);
        assert_eq!(panel.column("A").unwrap().last_valid(), Some(2));
    }

    #[test]
    fn test_sort_is_stable() {
        let panel = Panel::from_pairs(
            "sasdate",
            vec![month(2000, 2), month(2000, 1), month(2000, 1)],
            vec![("A", vec![3.0, 1.0, 2.0])],
        )
        .unwrap();
        let sorted = panel.sorted_by_date();
        assert_eq!(sorted.values("A").unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_row_coverage() {
        let coverage = sample().row_coverage();
        assert_eq!(coverage, vec![0.5, 0.0, 1.0]);
    }

    #[test]
    fn test_rows_between_inclusive() {
        let panel = sample();
        let window = panel.rows_between(Some(month(2000, 2)), Some(month(2000, 3)));
        assert_eq!(window.n_rows(), 2);
        assert_eq!(window.first_date(), Some(month(2000, 2)));
    }

    #[test]
    fn test_nan_aware_equality() {
        assert_eq!(sample(), sample());
    }

    #[test]
    fn test_keyed_and_plain_rows_agree() {
        let panel = sample();
        let keyed = panel.keyed_rows();
        assert_eq!(keyed.len(), 3);
        assert_eq!(keyed[&month(2000, 3)], panel.row_values(2));
        assert_eq!(panel.row(month(2000, 3)), Some(vec![3.0, 6.0]));
    }
}
