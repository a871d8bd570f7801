//! Training-window selection from row coverage
//!
//! Coverage is the share of series observed in each month. The window starts
//! at the first sustained stretch of good coverage and ends a holdout period
//! before the last month, capped at the desired training length.

use crate::error::{DfmError, Result};
use crate::panel::Panel;
use crate::types::{Share, Timestamp};
use serde::{Deserialize, Serialize};

pub const COVERAGE_THRESHOLD_DEFAULT: Share = 0.75;
pub const TRAIN_YEARS_DEFAULT: usize = 30;
pub const HOLDOUT_MONTHS_DEFAULT: usize = 60;
pub const MIN_RUN_DEFAULT: usize = 12;

/// Parameters of the window search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSelection {
    /// Minimum share of observed series for a month to qualify
    pub coverage_threshold: Share,
    /// Desired training length in years
    pub train_years: usize,
    /// Months reserved at the tail
    pub holdout_months: usize,
    /// Consecutive qualifying months required to start
    pub min_run: usize,
}

impl Default for WindowSelection {
    fn default() -> Self {
        Self {
            coverage_threshold: COVERAGE_THRESHOLD_DEFAULT,
            train_years: TRAIN_YEARS_DEFAULT,
            holdout_months: HOLDOUT_MONTHS_DEFAULT,
            min_run: MIN_RUN_DEFAULT,
        }
    }
}

/// How the earliest admissible start was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartRule {
    /// Start of the first run of `min_run` qualifying months
    Run,
    /// No run exists; first single qualifying month
    SingleMonth,
    /// Nothing qualifies; the `min_run`-th month (or the last one)
    Positional,
}

/// Selected training window, inclusive on both ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingWindow {
    pub start: Timestamp,
    pub end: Timestamp,
    pub start_idx: usize,
    pub end_idx: usize,
    /// Earliest admissible start position before the length cap was applied
    pub qualifying_idx: usize,
    pub start_rule: StartRule,
    /// The holdout was cut short because the regular window was empty
    pub holdout_shrunk: bool,
    /// Fallbacks taken while selecting
    pub notes: Vec<String>,
}

impl TrainingWindow {
    /// Number of months in the window
    pub fn n_months(&self) -> usize {
        self.end_idx - self.start_idx + 1
    }

    /// Check whether a timestamp falls inside the window
    pub fn contains(&self, date: Timestamp) -> bool {
        date >= self.start && date <= self.end
    }
}

impl WindowSelection {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.coverage_threshold) {
            return Err(DfmError::InvalidParameter {
                name: "coverage_threshold",
                value: self.coverage_threshold.to_string(),
                expected: "a share in [0, 1]",
            });
        }
        Ok(())
    }

    /// Earliest admissible start position and the rule that produced it
    pub fn qualifying_start(&self, coverage: &[f64]) -> (usize, StartRule) {
        let n = coverage.len();
        let min_run = self.min_run.max(1);
        let ok: Vec<bool> = coverage
            .iter()
            .map(|c| *c >= self.coverage_threshold)
            .collect();

        let mut run = 0usize;
        for (i, &good) in ok.iter().enumerate() {
            run = if good { run + 1 } else { 0 };
            if run >= min_run {
                return (i + 1 - min_run, StartRule::Run);
            }
        }

        if let Some(i) = ok.iter().position(|&good| good) {
            return (i, StartRule::SingleMonth);
        }

        ((min_run - 1).min(n.saturating_sub(1)), StartRule::Positional)
    }

    /// Select the window over a precomputed coverage series
    pub fn select_from_coverage(&self, dates: &[Timestamp], coverage: &[f64]) -> Result<TrainingWindow> {
        self.validate()?;
        let n = dates.len();
        if n == 0 {
            return Err(DfmError::EmptyPanel { stage: "training window" });
        }
        if coverage.len() != n {
            return Err(DfmError::LengthMismatch {
                series: "coverage".to_string(),
                expected: n,
                actual: coverage.len(),
            });
        }

        let min_run = self.min_run.max(1);
        let mut notes = Vec::new();
        let (qualifying_idx, start_rule) = self.qualifying_start(coverage);
        match start_rule {
            StartRule::Run => {}
            StartRule::SingleMonth => notes.push(format!(
                "no run of {} months reaches coverage {}; using first qualifying month",
                min_run, self.coverage_threshold
            )),
            StartRule::Positional => notes.push(format!(
                "no month reaches coverage {}; using month {} of the panel",
                self.coverage_threshold,
                qualifying_idx + 1
            )),
        }

        let mut end_idx = n.saturating_sub(self.holdout_months.saturating_add(1));
        let desired = self.train_years.saturating_mul(12);
        let mut start_idx = qualifying_idx.max((end_idx + 1).saturating_sub(desired));
        let mut holdout_shrunk = false;

        if start_idx > end_idx {
            start_idx = qualifying_idx;
            end_idx = qualifying_idx.saturating_add(min_run - 1).min(n - 1);
            holdout_shrunk = true;
            notes.push(format!(
                "holdout of {} months leaves no room after {}; window shrunk to {} month(s)",
                self.holdout_months,
                dates[qualifying_idx],
                end_idx - start_idx + 1
            ));
        }

        for note in &notes {
            log::warn!("Training window: {}", note);
        }

        let window = TrainingWindow {
            start: dates[start_idx],
            end: dates[end_idx],
            start_idx,
            end_idx,
            qualifying_idx,
            start_rule,
            holdout_shrunk,
            notes,
        };
        log::info!(
            "Training window {}..{} ({} months)",
            window.start,
            window.end,
            window.n_months()
        );
        Ok(window)
    }

    /// Select the window for an anchored monthly panel
    pub fn select(&self, panel: &Panel) -> Result<TrainingWindow> {
        if panel.is_empty() {
            return Err(DfmError::EmptyPanel { stage: "training window" });
        }
        self.select_from_coverage(panel.dates(), &panel.row_coverage())
    }
}
