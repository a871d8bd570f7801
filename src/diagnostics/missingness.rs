//! Missing-value diagnostics
//!
//! Every report here is an aggregation of one [`MissingMask`]: boundary flags
//! look at a few reference rows, positions list every missing timestamp, and
//! runs collapse consecutive missing rows into spans.

use crate::error::{DfmError, Result};
use crate::panel::Panel;
use crate::types::Timestamp;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-series missing flags over a sorted timestamp axis
#[derive(Debug, Clone, PartialEq)]
pub struct MissingMask {
    dates: Vec<Timestamp>,
    series: Vec<String>,
    flags: Vec<Vec<bool>>,
}

impl MissingMask {
    /// Build the mask of a panel (sorted by timestamp first)
    pub fn from_panel(panel: &Panel) -> Self {
        let sorted = panel.sorted_by_date();
        let flags = sorted
            .columns()
            .par_iter()
            .map(|c| c.missing_mask())
            .collect();
        Self {
            dates: sorted.dates().to_vec(),
            series: sorted.columns().iter().map(|c| c.name.clone()).collect(),
            flags,
        }
    }

    /// Restrict to an inclusive, optionally open-ended, timestamp window
    pub fn window(&self, start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        let rows: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| start.map_or(true, |s| **d >= s) && end.map_or(true, |e| **d <= e))
            .map(|(i, _)| i)
            .collect();
        Self {
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            series: self.series.clone(),
            flags: self
                .flags
                .iter()
                .map(|f| rows.iter().map(|&i| f[i]).collect())
                .collect(),
        }
    }

    pub fn dates(&self) -> &[Timestamp] {
        &self.dates
    }

    pub fn series(&self) -> &[String] {
        &self.series
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    /// Flags of one series by position
    pub fn flags(&self, idx: usize) -> &[bool] {
        &self.flags[idx]
    }

    /// Series positions in name order
    fn sorted_series(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.series.len()).collect();
        order.sort_by(|&a, &b| self.series[a].cmp(&self.series[b]));
        order
    }
}

/// Maximal runs of `true` as inclusive `(start, end)` positions.
///
/// Missing positions are split wherever two consecutive positions differ by
/// more than one.
pub fn contiguous_runs(mask: &[bool]) -> Vec<(usize, usize)> {
    let positions: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter(|(_, m)| **m)
        .map(|(i, _)| i)
        .collect();

    let mut runs = Vec::new();
    let mut iter = positions.iter().copied();
    if let Some(first) = iter.next() {
        let (mut start, mut prev) = (first, first);
        for pos in iter {
            if pos - prev > 1 {
                runs.push((start, prev));
                start = pos;
            }
            prev = pos;
        }
        runs.push((start, prev));
    }
    runs
}

/// Longest missing run strictly between the first and last observation.
///
/// A series with no observation counts as one gap spanning every row.
pub fn interior_max_gap(values: &[f64]) -> usize {
    let mask: Vec<bool> = values.iter().map(|v| v.is_nan()).collect();
    let first = mask.iter().position(|m| !m);
    let last = mask.iter().rposition(|m| !m);
    match (first, last) {
        (Some(first), Some(last)) => contiguous_runs(&mask[first..=last])
            .iter()
            .map(|(s, e)| e - s + 1)
            .max()
            .unwrap_or(0),
        _ => values.len(),
    }
}

fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Explicit reference dates for the boundary summary; `None` means positional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryRequest {
    pub first: Option<Timestamp>,
    pub second: Option<Timestamp>,
    pub last: Option<Timestamp>,
}

/// Resolved reference rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryDates {
    pub first: Timestamp,
    pub second: Timestamp,
    pub last: Timestamp,
    #[serde(skip)]
    pub first_idx: usize,
    #[serde(skip)]
    pub second_idx: usize,
    #[serde(skip)]
    pub last_idx: usize,
    /// One entry per requested date that was not in the index
    pub notes: Vec<String>,
}

impl BoundaryDates {
    /// Resolve a request against an axis.
    ///
    /// Defaults are the first, second (or first again for a one-row axis)
    /// and last rows. A requested date absent from the axis keeps the default.
    pub fn resolve(dates: &[Timestamp], request: &BoundaryRequest) -> Result<Self> {
        let n = dates.len();
        if n == 0 {
            return Err(DfmError::EmptyPanel { stage: "boundary missingness" });
        }

        let mut notes = Vec::new();
        let mut pick = |label: &str, requested: Option<Timestamp>, default: usize| match requested {
            None => default,
            Some(date) => match dates.iter().position(|d| *d == date) {
                Some(idx) => idx,
                None => {
                    let note = format!(
                        "requested {}={} not in index; using {} row {}",
                        label, date, label, dates[default]
                    );
                    log::warn!("{}", note);
                    notes.push(note);
                    default
                }
            },
        };

        let first_idx = pick("first", request.first, 0);
        let second_idx = pick("second", request.second, if n > 1 { 1 } else { 0 });
        let last_idx = pick("last", request.last, n - 1);

        Ok(Self {
            first: dates[first_idx],
            second: dates[second_idx],
            last: dates[last_idx],
            first_idx,
            second_idx,
            last_idx,
            notes,
        })
    }
}

/// Boundary flags and counts for one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBoundary {
    pub series: String,
    pub n_rows: usize,
    pub n_missing: usize,
    pub pct_missing: f64,
    pub miss_first: bool,
    pub miss_second: bool,
    pub miss_both_first_two: bool,
    pub miss_any_first_two: bool,
    /// Missing anywhere strictly between the second and last reference dates
    pub miss_intermediate: bool,
    pub n_missing_intermediate: usize,
    pub miss_last: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCounts {
    pub missing_at_first: usize,
    pub missing_at_second: usize,
    pub missing_at_both_first_two: usize,
    pub missing_at_any_first_two: usize,
    pub missing_any_intermediate: usize,
    pub missing_at_last: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryLists {
    pub series_missing_at_first: Vec<String>,
    pub series_missing_at_second: Vec<String>,
    pub series_missing_at_both_first_two: Vec<String>,
    pub series_missing_at_any_first_two: Vec<String>,
    pub series_missing_any_intermediate: Vec<String>,
    pub series_missing_at_last: Vec<String>,
}

/// Panel-level roll-up of the boundary flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySummary {
    pub n_series: usize,
    pub n_rows: usize,
    pub boundaries: BoundaryDates,
    pub counts: BoundaryCounts,
    pub lists: BoundaryLists,
}

impl BoundarySummary {
    fn from_rows(rows: &[SeriesBoundary], n_rows: usize, boundaries: BoundaryDates) -> Self {
        let names = |pred: fn(&SeriesBoundary) -> bool| -> Vec<String> {
            rows.iter()
                .filter(|r| pred(r))
                .map(|r| r.series.clone())
                .collect()
        };
        let lists = BoundaryLists {
            series_missing_at_first: names(|r| r.miss_first),
            series_missing_at_second: names(|r| r.miss_second),
            series_missing_at_both_first_two: names(|r| r.miss_both_first_two),
            series_missing_at_any_first_two: names(|r| r.miss_any_first_two),
            series_missing_any_intermediate: names(|r| r.miss_intermediate),
            series_missing_at_last: names(|r| r.miss_last),
        };
        let counts = BoundaryCounts {
            missing_at_first: lists.series_missing_at_first.len(),
            missing_at_second: lists.series_missing_at_second.len(),
            missing_at_both_first_two: lists.series_missing_at_both_first_two.len(),
            missing_at_any_first_two: lists.series_missing_at_any_first_two.len(),
            missing_any_intermediate: lists.series_missing_any_intermediate.len(),
            missing_at_last: lists.series_missing_at_last.len(),
        };
        Self {
            n_series: rows.len(),
            n_rows,
            boundaries,
            counts,
            lists,
        }
    }
}

/// Boundary-style report, one row per series in name order
pub fn boundary_report(
    mask: &MissingMask,
    request: &BoundaryRequest,
) -> Result<(Vec<SeriesBoundary>, BoundarySummary)> {
    let bounds = BoundaryDates::resolve(mask.dates(), request)?;
    let n = mask.n_rows();

    let interior: Vec<usize> = if n >= 3 {
        mask.dates()
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > bounds.second && **d < bounds.last)
            .map(|(i, _)| i)
            .collect()
    } else {
        Vec::new()
    };

    let rows: Vec<SeriesBoundary> = mask
        .sorted_series()
        .into_par_iter()
        .map(|idx| {
            let flags = mask.flags(idx);
            let n_missing = flags.iter().filter(|f| **f).count();
            let miss_first = flags[bounds.first_idx];
            let miss_second = flags[bounds.second_idx];
            let n_missing_intermediate = interior.iter().filter(|&&i| flags[i]).count();
            SeriesBoundary {
                series: mask.series()[idx].clone(),
                n_rows: n,
                n_missing,
                pct_missing: pct(n_missing, n),
                miss_first,
                miss_second,
                miss_both_first_two: miss_first && miss_second,
                miss_any_first_two: miss_first || miss_second,
                miss_intermediate: n_missing_intermediate > 0,
                n_missing_intermediate,
                miss_last: flags[bounds.last_idx],
            }
        })
        .collect();

    let summary = BoundarySummary::from_rows(&rows, n, bounds);
    Ok((rows, summary))
}

/// Window and cap for the positions report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionsOptions {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    /// Maximum number of timestamps listed per series
    pub limit: Option<usize>,
}

/// Exact missing timestamps of one series plus run statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPositions {
    pub series: String,
    pub n_rows: usize,
    pub n_missing: usize,
    pub pct_missing: f64,
    pub first_missing: Option<Timestamp>,
    pub last_missing: Option<Timestamp>,
    pub n_runs: usize,
    pub longest_run: usize,
    pub missing_dates: Vec<Timestamp>,
}

/// Positions report, one entry per series in name order
pub fn missing_positions(mask: &MissingMask, options: &PositionsOptions) -> Vec<SeriesPositions> {
    let mask = mask.window(options.start, options.end);
    let n = mask.n_rows();

    mask.sorted_series()
        .into_par_iter()
        .map(|idx| {
            let flags = mask.flags(idx);
            let missing: Vec<usize> = flags
                .iter()
                .enumerate()
                .filter(|(_, f)| **f)
                .map(|(i, _)| i)
                .collect();
            let runs = contiguous_runs(flags);
            let mut missing_dates: Vec<Timestamp> =
                missing.iter().map(|&i| mask.dates()[i]).collect();
            if let Some(limit) = options.limit {
                missing_dates.truncate(limit);
            }

            SeriesPositions {
                series: mask.series()[idx].clone(),
                n_rows: n,
                n_missing: missing.len(),
                pct_missing: pct(missing.len(), n),
                first_missing: missing.first().map(|&i| mask.dates()[i]),
                last_missing: missing.last().map(|&i| mask.dates()[i]),
                n_runs: runs.len(),
                longest_run: runs.iter().map(|(s, e)| e - s + 1).max().unwrap_or(0),
                missing_dates,
            }
        })
        .collect()
}

/// One maximal missing span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRun {
    pub series: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub length: usize,
}

/// Flat run table in panel column order
pub fn missing_runs(mask: &MissingMask, start: Option<Timestamp>, end: Option<Timestamp>) -> Vec<MissingRun> {
    let windowed = mask.window(start, end);
    let windowed = &windowed;
    (0..windowed.series().len())
        .into_par_iter()
        .flat_map_iter(move |idx| {
            contiguous_runs(windowed.flags(idx))
                .into_iter()
                .map(move |(s, e)| MissingRun {
                    series: windowed.series()[idx].clone(),
                    start: windowed.dates()[s],
                    end: windowed.dates()[e],
                    length: e - s + 1,
                })
        })
        .collect()
}

/// All three reports over one panel
#[derive(Debug, Clone, PartialEq)]
pub struct MissingnessReport {
    pub by_series: Vec<SeriesBoundary>,
    pub summary: BoundarySummary,
    pub positions: Vec<SeriesPositions>,
    pub runs: Vec<MissingRun>,
}

/// Runs the boundary, positions and runs reports with shared settings
#[derive(Debug, Clone, Default)]
pub struct MissingnessDiagnostics {
    pub boundaries: BoundaryRequest,
    pub positions: PositionsOptions,
}

impl MissingnessDiagnostics {
    pub fn new(boundaries: BoundaryRequest, positions: PositionsOptions) -> Self {
        Self {
            boundaries,
            positions,
        }
    }

    pub fn run(&self, panel: &Panel) -> Result<MissingnessReport> {
        let mask = MissingMask::from_panel(panel);
        let (by_series, summary) = boundary_report(&mask, &self.boundaries)?;
        let positions = missing_positions(&mask, &self.positions);
        let runs = missing_runs(&mask, self.positions.start, self.positions.end);

        log::info!(
            "Missingness: {} series, {} rows, {} missing runs",
            summary.n_series,
            summary.n_rows,
            runs.len()
        );

        Ok(MissingnessReport {
            by_series,
            summary,
            positions,
            runs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(m: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2000, m, 1).unwrap()
    }

    fn panel() -> Panel {
        let nan = f64::NAN;
        Panel::from_pairs(
            "sasdate",
            (1..=6).map(month).collect(),
            vec![
                ("Z", vec![nan, 1.0, 1.0, nan, 1.0, 1.0]),
                ("A", vec![1.0, nan, nan, 1.0, 1.0, nan]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_runs_from_mask() {
        let mask = [false, true, true, false, true, false, false, true, true, true];
        assert_eq!(contiguous_runs(&mask), vec![(1, 2), (4, 4), (7, 9)]);
        assert!(contiguous_runs(&[false, false]).is_empty());
    }

    #[test]
    fn test_interior_gap() {
        let nan = f64::NAN;
        assert_eq!(interior_max_gap(&[nan, 1.0, nan, nan, 1.0, nan]), 2);
        assert_eq!(interior_max_gap(&[nan, 1.0, 2.0, nan]), 0);
        assert_eq!(interior_max_gap(&[nan; 4]), 4);
    }

    #[test]
    fn test_boundary_flags() {
        let mask = MissingMask::from_panel(&panel());
        let (rows, summary) = boundary_report(&mask, &BoundaryRequest::default()).unwrap();
        assert_eq!(rows[0].series, "A");
        let a = &rows[0];
        assert!(!a.miss_first && a.miss_second && a.miss_any_first_two && !a.miss_both_first_two);
        assert_eq!(a.n_missing_intermediate, 1);
        assert!(a.miss_last);
        assert_eq!(summary.counts.missing_at_first, 1);
        assert_eq!(summary.lists.series_missing_at_first, vec!["Z"]);
        assert!(summary.boundaries.notes.is_empty());
    }

    #[test]
    fn test_absent_boundary_date_falls_back() {
        let mask = MissingMask::from_panel(&panel());
        let request = BoundaryRequest {
            first: Some(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            ..BoundaryRequest::default()
        };
        let (_, summary) = boundary_report(&mask, &request).unwrap();
        assert_eq!(summary.boundaries.first, month(1));
        assert_eq!(summary.boundaries.notes.len(), 1);
    }

    #[test]
    fn test_positions_window_and_limit() {
        let mask = MissingMask::from_panel(&panel());
        let options = PositionsOptions {
            start: Some(month(2)),
            end: None,
            limit: Some(1),
        };
        let positions = missing_positions(&mask, &options);
        let a = &positions[0];
        assert_eq!(a.n_rows, 5);
        assert_eq!(a.n_missing, 3);
        assert_eq!(a.missing_dates, vec![month(2)]);
        assert_eq!(a.n_runs, 2);
        assert_eq!(a.longest_run, 2);
        assert_eq!(a.last_missing, Some(month(6)));
    }

    #[test]
    fn test_runs_table_order() {
        let runs = missing_runs(&MissingMask::from_panel(&panel()), None, None);
        assert_eq!(runs.len(), 4);
        assert_eq!(runs[0].series, "Z");
        assert_eq!(runs[2].start, month(2));
        assert_eq!(runs[2].length, 2);
    }
}
