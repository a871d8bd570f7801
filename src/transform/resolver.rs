//! Locating the embedded transform-code row and building the code map
//!
//! FRED-MD files carry the codes on the line right under the header. The row is
//! either given explicitly or found by scanning: the first row whose non-date
//! cells are all integers in 1..=7 wins.
//!
//! Autodetection is a heuristic. If an early data row happens to contain only
//! small integers it will be taken for the code row, and nothing downstream can
//! tell. Prefer [`TcodeRowStrategy::RowIndex`] when the layout is known.

use crate::data::reader::RawTable;
use crate::error::{DfmError, Result};
use crate::transform::series::coerce_numeric;
use crate::transform::tcode::{TransformCodeMap, ALLOWED_TCODES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conventional code-row position when nothing else is known (header is row 0)
pub const DEFAULT_TCODE_ROW: usize = 1;

/// How to find the code row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TcodeRowStrategy {
    /// 0-based file row (header included) holding the codes
    RowIndex { row: usize },
    /// Scan up to `max_scan_rows` rows after the header
    Autodetect { max_scan_rows: usize },
}

impl Default for TcodeRowStrategy {
    fn default() -> Self {
        TcodeRowStrategy::Autodetect { max_scan_rows: 5 }
    }
}

/// Coverage check of a code map against the table header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TcodeCheck {
    /// Series columns with no valid code
    pub missing_in_tcodes: Vec<String>,
    /// Map keys that are not series columns
    pub extra_in_tcodes: Vec<String>,
}

/// Outcome of resolving the code map from a raw table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcodeResolution {
    pub codes: TransformCodeMap,
    /// File row the codes were read from (header is row 0)
    pub row: usize,
    /// True when the row came from a successful scan
    pub autodetected: bool,
    /// True when a scan found nothing and the conventional row was used
    pub fell_back: bool,
    pub check: TcodeCheck,
}

/// Parse a code cell: numeric and integral, otherwise `None`
fn parse_code(cell: &str) -> Option<i64> {
    let value = coerce_numeric(cell);
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

fn is_allowed(code: i64) -> bool {
    ALLOWED_TCODES.iter().any(|&c| c as i64 == code)
}

/// Scan for the code row; returns its file position
pub fn detect_tcode_row(table: &RawTable, date_column: &str, max_scan_rows: usize) -> Option<usize> {
    let date_idx = table.column_position(date_column);

    table
        .rows()
        .iter()
        .take(max_scan_rows)
        .position(|row| {
            let mut cells = row
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != date_idx)
                .peekable();
            cells.peek().is_some()
                && cells.all(|(_, cell)| parse_code(cell).map_or(false, is_allowed))
        })
        .map(|i| i + 1)
}

/// Read the codes on one file row; non-numeric or out-of-range cells are dropped
pub fn read_embedded_tcodes(table: &RawTable, date_column: &str, row: usize) -> Result<TransformCodeMap> {
    let cells = table.file_row(row).ok_or_else(|| {
        DfmError::DataError(format!(
            "Transform-code row {} is beyond the end of the table ({} data rows)",
            row,
            table.n_rows()
        ))
    })?;

    Ok(table
        .header()
        .iter()
        .zip(cells.iter())
        .filter(|(name, _)| name.as_str() != date_column)
        .filter_map(|(name, cell)| {
            parse_code(cell)
                .filter(|c| is_allowed(*c))
                .map(|c| (name.clone(), c))
        })
        .collect())
}

/// Interpret a JSON value as a code (integers or numeric strings)
fn json_code(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        serde_json::Value::String(s) => parse_code(s),
        _ => None,
    }
}

/// Clean a raw code map against the header.
///
/// Keeps only series present in the header with an allowed code. With
/// `require_all`, any series column left without a code is an error.
pub fn validate_tcode_map<S: AsRef<str>>(
    header: &[S],
    raw: &BTreeMap<String, serde_json::Value>,
    date_column: &str,
    require_all: bool,
) -> Result<(TransformCodeMap, TcodeCheck)> {
    let columns: Vec<&str> = header
        .iter()
        .map(|h| h.as_ref())
        .filter(|h| *h != date_column)
        .collect();

    let cleaned: TransformCodeMap = raw
        .iter()
        .filter(|(name, _)| columns.contains(&name.as_str()))
        .filter_map(|(name, value)| {
            json_code(value)
                .filter(|c| is_allowed(*c))
                .map(|c| (name.clone(), c))
        })
        .collect();

    let check = TcodeCheck {
        missing_in_tcodes: columns
            .iter()
            .filter(|c| !cleaned.contains_key(**c))
            .map(|c| c.to_string())
            .collect(),
        extra_in_tcodes: raw
            .keys()
            .filter(|k| k.as_str() != date_column && !columns.contains(&k.as_str()))
            .cloned()
            .collect(),
    };

    if require_all && !check.missing_in_tcodes.is_empty() {
        return Err(DfmError::MissingTransformCode {
            series: check.missing_in_tcodes,
        });
    }

    Ok((cleaned, check))
}

/// Parse a `{series: code}` JSON document into a raw code map
pub fn parse_tcode_json(json: &str) -> Result<TransformCodeMap> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
    raw.into_iter()
        .map(|(name, value)| match json_code(&value) {
            Some(code) => Ok((name, code)),
            None => Err(DfmError::DataError(format!(
                "Transform code for '{}' is not an integer: {}",
                name, value
            ))),
        })
        .collect()
}

/// Resolves the code map embedded in a raw table
#[derive(Debug, Clone)]
pub struct TcodeResolver {
    pub date_column: String,
    pub strategy: TcodeRowStrategy,
    pub require_all: bool,
}

impl TcodeResolver {
    /// Create a resolver
    pub fn new(date_column: impl Into<String>, strategy: TcodeRowStrategy) -> Self {
        Self {
            date_column: date_column.into(),
            strategy,
            require_all: true,
        }
    }

    /// Allow series without codes (reported in the check instead)
    pub fn allow_missing(mut self) -> Self {
        self.require_all = false;
        self
    }

    /// Pick the code row according to the strategy
    pub fn locate(&self, table: &RawTable) -> (usize, bool, bool) {
        match self.strategy {
            TcodeRowStrategy::RowIndex { row } => (row, false, false),
            TcodeRowStrategy::Autodetect { max_scan_rows } => {
                match detect_tcode_row(table, &self.date_column, max_scan_rows) {
                    Some(row) => (row, true, false),
                    None => {
                        log::warn!(
                            "No transform-code row found in the first {} rows; using row {}",
                            max_scan_rows,
                            DEFAULT_TCODE_ROW
                        );
                        (DEFAULT_TCODE_ROW, false, true)
                    }
                }
            }
        }
    }

    /// Build the validated code map
    pub fn resolve(&self, table: &RawTable) -> Result<TcodeResolution> {
        if table.column_position(&self.date_column).is_none() {
            return Err(DfmError::ConfigError(format!(
                "Expected date column '{}' in CSV header",
                self.date_column
            )));
        }

        let (row, autodetected, fell_back) = self.locate(table);
        let embedded = read_embedded_tcodes(table, &self.date_column, row)?;
        let raw: BTreeMap<String, serde_json::Value> = embedded
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::from(v)))
            .collect();
        let (codes, check) =
            validate_tcode_map(table.header(), &raw, &self.date_column, self.require_all)?;

        log::info!(
            "Resolved {} transform codes from file row {}{}",
            codes.len(),
            row,
            if autodetected { " (autodetected)" } else { "" }
        );

        Ok(TcodeResolution {
            codes,
            row,
            autodetected,
            fell_back,
            check,
        })
    }
}
