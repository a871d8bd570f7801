//! Artifact writers: panel CSVs, JSON documents and missingness tables
//!
//! Floats are rendered like C's `%.{digits}g` and missing cells are left empty,
//! so processed panels read back through [`crate::data::reader`] unchanged.

use crate::diagnostics::missingness::{MissingRun, SeriesBoundary, SeriesPositions};
use crate::error::{DfmError, Result};
use crate::panel::Panel;
use crate::types::{is_missing, Timestamp, DATE_FMT_DEFAULT, FLOAT_DIGITS_DEFAULT};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Render a float with `digits` significant digits, `%g` style
pub fn format_g(value: f64, digits: usize) -> String {
    if is_missing(value) {
        return String::new();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0".into() } else { "0".into() };
    }

    let digits = digits.max(1);
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= digits as i32 {
        let mantissa = strip_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Rendering options for CSV artifacts
#[derive(Debug, Clone)]
pub struct CsvFormat {
    pub date_format: String,
    pub float_digits: usize,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            date_format: DATE_FMT_DEFAULT.to_string(),
            float_digits: FLOAT_DIGITS_DEFAULT,
        }
    }
}

impl CsvFormat {
    fn date(&self, date: Timestamp) -> String {
        date.format(&self.date_format).to_string()
    }

    fn float(&self, value: f64) -> String {
        format_g(value, self.float_digits)
    }
}

/// Fail with `ArtifactExists` unless the path is free or overwriting is allowed
pub fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(DfmError::ArtifactExists(path.to_path_buf()));
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write a panel with the timestamp column labelled `date_label`
pub fn write_panel_csv(panel: &Panel, path: &Path, date_label: &str, format: &CsvFormat) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);

    let mut header = vec![date_label.to_string()];
    header.extend(panel.column_names().iter().map(|s| s.to_string()));
    writer.write_record(&header)?;

    for (row, date) in panel.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(panel.n_columns() + 1);
        record.push(format.date(*date));
        record.extend(panel.columns().iter().map(|c| format.float(c.values[row])));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    log::debug!("Wrote {} ({} rows)", path.display(), panel.n_rows());
    Ok(())
}

/// Write the index-labelled layout (label = panel axis name)
pub fn write_panel_indexed(panel: &Panel, path: &Path, format: &CsvFormat) -> Result<()> {
    write_panel_csv(panel, path, panel.index_label(), format)
}

/// Pretty-printed JSON document
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// One JSON document per line
pub fn write_jsonl<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    let mut writer = create(path)?;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn flag(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

/// `panel_missing_by_series.csv`
pub fn write_boundary_csv(rows: &[SeriesBoundary], path: &Path, format: &CsvFormat) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    writer.write_record([
        "series",
        "n_rows",
        "n_missing",
        "pct_missing",
        "miss_first",
        "miss_second",
        "miss_both_first_two",
        "miss_any_first_two",
        "miss_intermediate",
        "n_missing_intermediate",
        "miss_last",
    ])?;
    for r in rows {
        writer.write_record([
            r.series.clone(),
            r.n_rows.to_string(),
            r.n_missing.to_string(),
            format.float(r.pct_missing),
            flag(r.miss_first),
            flag(r.miss_second),
            flag(r.miss_both_first_two),
            flag(r.miss_any_first_two),
            flag(r.miss_intermediate),
            r.n_missing_intermediate.to_string(),
            flag(r.miss_last),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// `missing_positions_summary.csv`
pub fn write_positions_summary_csv(
    positions: &[SeriesPositions],
    path: &Path,
    format: &CsvFormat,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    writer.write_record([
        "series",
        "n_rows",
        "n_missing",
        "pct_missing",
        "first_missing",
        "last_missing",
        "n_runs",
        "longest_run",
    ])?;
    let date = |d: Option<Timestamp>| d.map(|d| format.date(d)).unwrap_or_default();
    for p in positions {
        writer.write_record([
            p.series.clone(),
            p.n_rows.to_string(),
            p.n_missing.to_string(),
            format.float(p.pct_missing),
            date(p.first_missing),
            date(p.last_missing),
            p.n_runs.to_string(),
            p.longest_run.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct PositionsLine<'a> {
    series: &'a str,
    missing_dates: Vec<String>,
}

/// `missing_positions.jsonl`: `{"series": .., "missing_dates": [..]}` per line
pub fn write_positions_jsonl(positions: &[SeriesPositions], path: &Path, format: &CsvFormat) -> Result<()> {
    let lines: Vec<PositionsLine> = positions
        .iter()
        .map(|p| PositionsLine {
            series: &p.series,
            missing_dates: p.missing_dates.iter().map(|d| format.date(*d)).collect(),
        })
        .collect();
    write_jsonl(&lines, path)
}

/// `missing_runs.csv`
pub fn write_runs_csv(runs: &[MissingRun], path: &Path, format: &CsvFormat) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    writer.write_record(["series", "start", "end", "length"])?;
    for run in runs {
        writer.write_record([
            run.series.clone(),
            format.date(run.start),
            format.date(run.end),
            run.length.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
