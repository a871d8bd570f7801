//! Named panel variants: anchoring, window selection and column survival rules
//!
//! A variant is the panel from an anchor date onwards, restricted to the series
//! that pass every quality rule. Rules are checked in a fixed order and only
//! the first violation is recorded. That short circuit hides later violations
//! of a dropped series; the catalog keeps every diagnostic value so they can
//! still be recovered.

use crate::diagnostics::missingness::interior_max_gap;
use crate::error::{DfmError, Result};
use crate::panel::Panel;
use crate::preprocessing::window::{StartRule, TrainingWindow, WindowSelection};
use crate::transform::series::leading_missing;
use crate::types::{is_missing, parse_date, Share, Timestamp, DATE_FMT_DEFAULT};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const MISSING_SHARE_MAX_DEFAULT: Share = 0.40;
pub const LEADING_NA_LIMIT_DEFAULT: usize = 24;
pub const INTERIOR_GAP_MAX_DEFAULT: usize = 6;
pub const MIN_OBS_TRAIN_DEFAULT: usize = 36;

/// Column survival thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRules {
    /// Drop if the overall missing share exceeds this
    pub missing_share_max: Share,
    /// Drop if more than this many months are missing right after the anchor
    pub leading_na_limit_months: usize,
    /// Drop if the longest interior gap exceeds this many months
    pub interior_gap_max_months: usize,
    /// Drop if fewer observations than this fall inside the training window
    pub min_obs_train_months: usize,
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self {
            missing_share_max: MISSING_SHARE_MAX_DEFAULT,
            leading_na_limit_months: LEADING_NA_LIMIT_DEFAULT,
            interior_gap_max_months: INTERIOR_GAP_MAX_DEFAULT,
            min_obs_train_months: MIN_OBS_TRAIN_DEFAULT,
        }
    }
}

/// Rule that removed a series, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingShareExceeded,
    LeadingNaExceeded,
    InteriorGapExceeded,
    InsufficientTrainObs,
}

impl DropReason {
    /// Short tag including the threshold, e.g. `missing_share>0.40`
    pub fn tag(&self, rules: &ColumnRules) -> String {
        match self {
            DropReason::MissingShareExceeded => format!("missing_share>{:.2}", rules.missing_share_max),
            DropReason::LeadingNaExceeded => format!("leading_na>{}", rules.leading_na_limit_months),
            DropReason::InteriorGapExceeded => {
                format!("interior_gap>{}", rules.interior_gap_max_months)
            }
            DropReason::InsufficientTrainObs => {
                format!("nobs_train<{}", rules.min_obs_train_months)
            }
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DropReason::MissingShareExceeded => "missing-share-exceeded",
            DropReason::LeadingNaExceeded => "leading-na-exceeded",
            DropReason::InteriorGapExceeded => "interior-gap-exceeded",
            DropReason::InsufficientTrainObs => "insufficient-train-obs",
        };
        f.write_str(name)
    }
}

/// Diagnostics and verdict for one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDecision {
    #[serde(skip)]
    pub series: String,
    pub missing_share: Share,
    pub leading_na_since_anchor: usize,
    pub interior_gap_months: usize,
    pub nobs_train: usize,
    pub drop_reason: Option<DropReason>,
    /// Threshold tag of the drop reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ColumnDecision {
    pub fn is_kept(&self) -> bool {
        self.drop_reason.is_none()
    }
}

impl ColumnRules {
    /// First violated rule, if any
    pub fn first_violation(
        &self,
        missing_share: Share,
        leading_na: usize,
        interior_gap: usize,
        nobs_train: usize,
    ) -> Option<DropReason> {
        if missing_share > self.missing_share_max {
            Some(DropReason::MissingShareExceeded)
        } else if leading_na > self.leading_na_limit_months {
            Some(DropReason::LeadingNaExceeded)
        } else if interior_gap > self.interior_gap_max_months {
            Some(DropReason::InteriorGapExceeded)
        } else if nobs_train < self.min_obs_train_months {
            Some(DropReason::InsufficientTrainObs)
        } else {
            None
        }
    }

    /// Evaluate one series of an anchored panel against a training window
    pub fn decide(&self, series: &str, values: &[f64], window: &TrainingWindow) -> ColumnDecision {
        let n = values.len();
        let n_missing = values.iter().filter(|v| is_missing(**v)).count();
        let missing_share = if n == 0 { 0.0 } else { n_missing as f64 / n as f64 };
        let leading_na = leading_missing(values);
        let interior_gap = interior_max_gap(values);
        let nobs_train = values
            .get(window.start_idx..=window.end_idx)
            .map_or(0, |w| w.iter().filter(|v| !is_missing(**v)).count());

        let drop_reason = self.first_violation(missing_share, leading_na, interior_gap, nobs_train);
        ColumnDecision {
            series: series.to_string(),
            missing_share,
            leading_na_since_anchor: leading_na,
            interior_gap_months: interior_gap,
            nobs_train,
            drop_reason,
            reason: drop_reason.map(|r| r.tag(self)),
        }
    }
}

/// Name and anchor of one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    pub name: String,
    /// Anchor date as written in the configuration
    pub anchor_start: String,
}

impl VariantSpec {
    pub fn new(name: impl Into<String>, anchor_start: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            anchor_start: anchor_start.into(),
        }
    }

    /// The two FRED-MD variants built by default
    pub fn defaults() -> Vec<VariantSpec> {
        vec![
            VariantSpec::new("panel_start_1965_keep_late", "01/01/1965"),
            VariantSpec::new("panel_start_1960_drop_late", "01/01/1960"),
        ]
    }

    /// Parse the anchor with a date format (ISO also accepted)
    pub fn anchor(&self, date_format: &str) -> Result<Timestamp> {
        parse_date(&self.anchor_start, date_format).ok_or_else(|| DfmError::InvalidParameter {
            name: "anchor_start",
            value: self.anchor_start.clone(),
            expected: "a date in the configured format",
        })
    }
}

/// Window parameters and outcome as recorded in a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    #[serde(flatten)]
    pub selection: WindowSelection,
    pub anchored_span: [String; 2],
    pub start_rule: StartRule,
    pub holdout_shrunk: bool,
    pub notes: Vec<String>,
}

/// Persisted record of one variant build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantCatalog {
    pub input_csv: Option<String>,
    pub input_sha256: Option<String>,
    pub variant: String,
    pub anchor_start: String,
    pub train_window: [String; 2],
    pub rules: ColumnRules,
    pub training_window_selection: WindowRecord,
    pub n_rows: usize,
    pub n_series: usize,
    pub kept_series: Vec<String>,
    pub dropped_series: BTreeMap<String, ColumnDecision>,
}

/// A built variant: survivor panel plus its decisions and catalog
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub panel: Panel,
    pub window: TrainingWindow,
    pub decisions: Vec<ColumnDecision>,
    pub catalog: VariantCatalog,
}

impl Variant {
    pub fn kept(&self) -> impl Iterator<Item = &ColumnDecision> {
        self.decisions.iter().filter(|d| d.is_kept())
    }

    pub fn dropped(&self) -> impl Iterator<Item = &ColumnDecision> {
        self.decisions.iter().filter(|d| !d.is_kept())
    }

    /// Rows keyed by timestamp
    pub fn keyed_rows(&self) -> BTreeMap<Timestamp, Vec<f64>> {
        self.panel.keyed_rows()
    }

    /// Rows with the timestamp as a leading plain column, plus the header
    pub fn plain_rows(&self) -> (Vec<String>, Vec<(Timestamp, Vec<f64>)>) {
        let mut header = vec![self.panel.index_label().to_string()];
        header.extend(self.panel.column_names().iter().map(|s| s.to_string()));
        let rows = (0..self.panel.n_rows())
            .map(|row| (self.panel.dates()[row], self.panel.row_values(row)))
            .collect();
        (header, rows)
    }
}

/// Builds variants from one monthly panel
#[derive(Debug, Clone)]
pub struct VariantBuilder {
    pub rules: ColumnRules,
    pub selection: WindowSelection,
    pub date_format: String,
    pub input_csv: Option<String>,
    pub input_sha256: Option<String>,
}

impl Default for VariantBuilder {
    fn default() -> Self {
        Self {
            rules: ColumnRules::default(),
            selection: WindowSelection::default(),
            date_format: DATE_FMT_DEFAULT.to_string(),
            input_csv: None,
            input_sha256: None,
        }
    }
}

impl VariantBuilder {
    pub fn new(rules: ColumnRules, selection: WindowSelection) -> Self {
        Self {
            rules,
            selection,
            ..Self::default()
        }
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    /// Record the input file and its digest in every catalog
    pub fn with_provenance(mut self, input_csv: impl Into<String>, sha256: Option<String>) -> Self {
        self.input_csv = Some(input_csv.into());
        self.input_sha256 = sha256;
        self
    }

    fn fmt_date(&self, date: Timestamp) -> String {
        date.format(&self.date_format).to_string()
    }

    /// Build one variant from a monthly panel
    pub fn build(&self, panel: &Panel, spec: &VariantSpec) -> Result<Variant> {
        let anchor = spec.anchor(&self.date_format)?;
        let anchored = panel.sorted_by_date().rows_from(anchor);
        let window = self.selection.select(&anchored)?;

        let decisions: Vec<ColumnDecision> = anchored
            .columns()
            .par_iter()
            .map(|c| self.rules.decide(&c.name, &c.values, &window))
            .collect();

        for d in decisions.iter().filter(|d| !d.is_kept()) {
            log::debug!(
                "{}: dropping '{}' ({})",
                spec.name,
                d.series,
                d.reason.as_deref().unwrap_or_default()
            );
        }

        let kept_series: Vec<String> = decisions
            .iter()
            .filter(|d| d.is_kept())
            .map(|d| d.series.clone())
            .collect();
        let survivors = anchored.select_columns(&kept_series)?;

        let anchored_span = match (anchored.first_date(), anchored.last_date()) {
            (Some(first), Some(last)) => [self.fmt_date(first), self.fmt_date(last)],
            _ => return Err(DfmError::EmptyPanel { stage: "variant" }),
        };

        let catalog = VariantCatalog {
            input_csv: self.input_csv.clone(),
            input_sha256: self.input_sha256.clone(),
            variant: spec.name.clone(),
            anchor_start: spec.anchor_start.clone(),
            train_window: [self.fmt_date(window.start), self.fmt_date(window.end)],
            rules: self.rules,
            training_window_selection: WindowRecord {
                selection: self.selection,
                anchored_span,
                start_rule: window.start_rule,
                holdout_shrunk: window.holdout_shrunk,
                notes: window.notes.clone(),
            },
            n_rows: survivors.n_rows(),
            n_series: survivors.n_columns(),
            kept_series,
            dropped_series: decisions
                .iter()
                .filter(|d| !d.is_kept())
                .map(|d| (d.series.clone(), d.clone()))
                .collect(),
        };

        log::info!(
            "Variant {}: {} rows, kept {} of {} series, window {}..{}",
            spec.name,
            catalog.n_rows,
            catalog.n_series,
            decisions.len(),
            catalog.train_window[0],
            catalog.train_window[1]
        );

        Ok(Variant {
            name: spec.name.clone(),
            panel: survivors,
            window,
            decisions,
            catalog,
        })
    }

    /// Build several variants from the same panel
    pub fn build_all(&self, panel: &Panel, specs: &[VariantSpec]) -> Result<Vec<Variant>> {
        specs.iter().map(|spec| self.build(panel, spec)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{MonthStartCalendar, PeriodCalendar};
    use chrono::NaiveDate;

    fn months(start: NaiveDate, n: usize) -> Vec<Timestamp> {
        let cal = MonthStartCalendar::new();
        (0..n).map(|i| cal.shift(start, i as i32).unwrap()).collect()
    }

    fn window(start_idx: usize, end_idx: usize) -> TrainingWindow {
        let dates = months(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(), end_idx + 1);
        TrainingWindow {
            start: dates[start_idx],
            end: dates[end_idx],
            start_idx,
            end_idx,
            qualifying_idx: start_idx,
            start_rule: StartRule::Run,
            holdout_shrunk: false,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_rule_priority_reports_first_violation() {
        let rules = ColumnRules {
            missing_share_max: 0.2,
            interior_gap_max_months: 1,
            min_obs_train_months: 0,
            ..ColumnRules::default()
        };
        let nan = f64::NAN;
        // Too many missing values and a three-month interior gap
        let values = vec![1.0, nan, nan, nan, 1.0, 1.0];
        let d = rules.decide("X", &values, &window(0, 5));
        assert_eq!(d.interior_gap_months, 3);
        assert_eq!(d.drop_reason, Some(DropReason::MissingShareExceeded));
        assert_eq!(d.reason.as_deref(), Some("missing_share>0.20"));
    }

    #[test]
    fn test_nobs_train_counts_window_only() {
        let rules = ColumnRules {
            min_obs_train_months: 3,
            ..ColumnRules::default()
        };
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let d = rules.decide("X", &values, &window(3, 4));
        assert_eq!(d.nobs_train, 2);
        assert_eq!(d.drop_reason, Some(DropReason::InsufficientTrainObs));
        assert_eq!(d.reason.as_deref(), Some("nobs_train<3"));
    }

    #[test]
    fn test_build_anchors_and_filters() {
        let start = NaiveDate::from_ymd_opt(1959, 1, 1).unwrap();
        let n = 72;
        let dates = months(start, n);
        let good: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let late: Vec<f64> = (0..n).map(|i| if i < 48 { f64::NAN } else { 1.0 }).collect();
        let panel = Panel::from_pairs("sasdate", dates, vec![("GOOD", good), ("LATE", late)]).unwrap();

        let builder = VariantBuilder::new(
            ColumnRules {
                min_obs_train_months: 12,
                ..ColumnRules::default()
            },
            WindowSelection {
                coverage_threshold: 0.5,
                holdout_months: 6,
                ..WindowSelection::default()
            },
        );
        let variant = builder
            .build(&panel, &VariantSpec::new("v", "01/01/1960"))
            .unwrap();

        assert_eq!(variant.panel.first_date(), NaiveDate::from_ymd_opt(1960, 1, 1));
        assert_eq!(variant.panel.n_rows(), 60);
        assert_eq!(variant.catalog.kept_series, vec!["GOOD"]);
        let late = &variant.catalog.dropped_series["LATE"];
        assert_eq!(late.drop_reason, Some(DropReason::MissingShareExceeded));
        assert_eq!(variant.catalog.train_window[0], "01/01/1960");
        assert_eq!(variant.catalog.anchor_start, "01/01/1960");

        let (header, rows) = variant.plain_rows();
        assert_eq!(header, vec!["sasdate", "GOOD"]);
        assert_eq!(rows.len(), variant.keyed_rows().len());
    }

    #[test]
    fn test_anchor_past_end_is_empty() {
        let dates = months(NaiveDate::from_ymd_opt(1959, 1, 1).unwrap(), 3);
        let panel = Panel::from_pairs("sasdate", dates, vec![("A", vec![1.0, 2.0, 3.0])]).unwrap();
        let err = VariantBuilder::default()
            .build(&panel, &VariantSpec::new("v", "01/01/2000"))
            .unwrap_err();
        assert!(matches!(err, DfmError::EmptyPanel { .. }));
    }

    #[test]
    fn test_default_specs() {
        let specs = VariantSpec::defaults();
        assert_eq!(specs.len(), 2);
        assert_eq!(
            specs[1].anchor(DATE_FMT_DEFAULT).unwrap(),
            NaiveDate::from_ymd_opt(1960, 1, 1).unwrap()
        );
    }
}
