//! CSV ingestion and normalization into a [`Panel`]
//!
//! Raw FRED-MD files carry an extra transform-code row under the header, while
//! processed panels written by this crate do not, and an unnamed first column
//! may stand in for the date key. [`RawTable::to_panel`] is the single step that
//! turns any of those layouts into the canonical panel shape.

use crate::error::{DfmError, Result};
use crate::panel::{Column, Panel};
use crate::transform::series::coerce_numeric;
use crate::types::{parse_date, DATE_COL_DEFAULT, DATE_FMT_DEFAULT};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// Panel CSV format configuration
#[derive(Debug, Clone)]
pub struct PanelFormat {
    /// Date column name
    pub date_column: String,
    /// Date format string (e.g., "%m/%d/%Y"); ISO dates are always accepted
    pub date_format: String,
    /// Trim series names and replace inner spaces with underscores
    pub clean_names: bool,
}

impl Default for PanelFormat {
    fn default() -> Self {
        Self {
            date_column: DATE_COL_DEFAULT.to_string(),
            date_format: DATE_FMT_DEFAULT.to_string(),
            clean_names: false,
        }
    }
}

/// Sanitize a series name: trim, then spaces to underscores
pub fn clean_series_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}

/// Untyped CSV contents: the header row plus every data row as strings
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Create a table from already-split cells
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Load a CSV file
    pub fn from_path(path: &Path) -> Result<Self> {
        let rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| DfmError::DataError(format!("Failed to open {}: {}", path.display(), e)))?;
        Self::from_csv_reader(rdr)
    }

    /// Load CSV content from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Self::from_csv_reader(rdr)
    }

    fn from_csv_reader<R: Read>(mut rdr: csv::Reader<R>) -> Result<Self> {
        let header: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let width = header.len();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            row.resize(width.max(row.len()), String::new());
            rows.push(row);
        }

        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data rows (file rows 1..)
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// File row by 0-based position, where row 0 is the header
    pub fn file_row(&self, idx: usize) -> Option<&[String]> {
        if idx == 0 {
            Some(&self.header)
        } else {
            self.rows.get(idx - 1).map(|r| r.as_slice())
        }
    }

    /// Find column index by name
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Locate the date key: the named column, else an unnamed first column
    pub fn date_position(&self, date_column: &str) -> Result<usize> {
        if let Some(pos) = self.column_position(date_column) {
            return Ok(pos);
        }
        match self.header.first() {
            Some(first) if first.trim().is_empty() => Ok(0),
            _ => Err(DfmError::ConfigError(format!(
                "Date column '{}' not found in header (first columns: {:?})",
                date_column,
                self.header.iter().take(6).collect::<Vec<_>>()
            ))),
        }
    }

    /// Normalize into a panel.
    ///
    /// `skip_file_rows` uses file positions (0 = header), which is how the
    /// embedded transform-code row is addressed. Fully blank rows are skipped;
    /// any other row whose date cannot be parsed is an error.
    pub fn to_panel(&self, format: &PanelFormat, skip_file_rows: &[usize]) -> Result<Panel> {
        let date_idx = self.date_position(&format.date_column)?;

        let series_idx: Vec<usize> = (0..self.header.len()).filter(|&i| i != date_idx).collect();
        let mut dates = Vec::with_capacity(self.rows.len());
        let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(self.rows.len()); series_idx.len()];

        for (i, row) in self.rows.iter().enumerate() {
            let file_row = i + 1;
            if skip_file_rows.contains(&file_row) {
                continue;
            }
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }

            let raw_date = row.get(date_idx).map(|s| s.as_str()).unwrap_or("");
            let date = parse_date(raw_date, &format.date_format).ok_or_else(|| {
                DfmError::NonMonotonicOrInvalidIndex(format!(
                    "file row {}: cannot parse '{}' as a date with format '{}'",
                    file_row, raw_date, format.date_format
                ))
            })?;
            dates.push(date);

            for (slot, &col) in series_idx.iter().enumerate() {
                let cell = row.get(col).map(|s| s.as_str()).unwrap_or("");
                values[slot].push(coerce_numeric(cell));
            }
        }

        let columns = series_idx
            .iter()
            .zip(values)
            .map(|(&col, vals)| {
                let name = if format.clean_names {
                    clean_series_name(&self.header[col])
                } else {
                    self.header[col].clone()
                };
                Column::new(name, vals)
            })
            .collect();

        let panel = Panel::new(format.date_column.clone(), dates, columns)?;
        log::debug!(
            "Normalized table into panel: {} rows x {} series",
            panel.n_rows(),
            panel.n_columns()
        );
        Ok(panel)
    }
}

/// Load a processed panel CSV (no embedded code row)
pub fn load_panel_csv(path: &Path, format: &PanelFormat) -> Result<Panel> {
    RawTable::from_path(path)?.to_panel(format, &[])
}
