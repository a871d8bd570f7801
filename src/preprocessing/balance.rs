//! Panel balancing by first-valid position

use crate::error::{DfmError, Result};
use crate::panel::Panel;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How much of the ragged edge to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceMode {
    /// Keep every row
    None,
    /// Trim leading rows until every series has started
    #[default]
    Initial,
    /// Trim leading rows, then drop any row with a missing value
    All,
}

impl BalanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceMode::None => "none",
            BalanceMode::Initial => "initial",
            BalanceMode::All => "all",
        }
    }
}

impl fmt::Display for BalanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalanceMode {
    type Err = DfmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(BalanceMode::None),
            "initial" => Ok(BalanceMode::Initial),
            "all" => Ok(BalanceMode::All),
            other => Err(DfmError::InvalidParameter {
                name: "balance",
                value: other.to_string(),
                expected: "one of none, initial, all",
            }),
        }
    }
}

/// What balancing removed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceDiagnostics {
    pub mode: BalanceMode,
    /// Series with no observation at all, removed before trimming
    pub all_missing_dropped: Vec<String>,
    /// First observed row of each surviving series (positions in the unbalanced panel)
    pub first_valid: BTreeMap<String, usize>,
    /// Latest first-valid position across surviving series (0 if none survive)
    pub global_first_valid: usize,
    /// Timestamps of removed rows, leading trim first
    pub dropped_rows: Vec<Timestamp>,
}

/// Trims a panel to a common start and, optionally, a dense block
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelBalancer {
    pub mode: BalanceMode,
}

impl PanelBalancer {
    pub fn new(mode: BalanceMode) -> Self {
        Self { mode }
    }

    pub fn balance(&self, panel: &Panel) -> (Panel, BalanceDiagnostics) {
        let all_missing_dropped: Vec<String> = panel
            .columns()
            .iter()
            .filter(|c| c.first_valid().is_none())
            .map(|c| c.name.clone())
            .collect();
        for name in &all_missing_dropped {
            log::warn!("Series '{}' has no observations; dropped before balancing", name);
        }
        let kept = panel.drop_columns(&all_missing_dropped);

        let first_valid: BTreeMap<String, usize> = kept
            .columns()
            .iter()
            .filter_map(|c| c.first_valid().map(|pos| (c.name.clone(), pos)))
            .collect();
        let global_first_valid = first_valid.values().copied().max().unwrap_or(0);

        let (balanced, dropped_rows) = match self.mode {
            BalanceMode::None => (kept, Vec::new()),
            BalanceMode::Initial => {
                let dropped = kept.dates()[..global_first_valid].to_vec();
                (kept.slice_rows(global_first_valid, kept.n_rows()), dropped)
            }
            BalanceMode::All => {
                let mut dropped = kept.dates()[..global_first_valid].to_vec();
                let trimmed = kept.slice_rows(global_first_valid, kept.n_rows());
                let (dense, gappy): (Vec<usize>, Vec<usize>) =
                    (0..trimmed.n_rows()).partition(|&row| !trimmed.row_has_missing(row));
                dropped.extend(gappy.into_iter().map(|row| trimmed.dates()[row]));
                (trimmed.take_rows(&dense), dropped)
            }
        };

        log::info!(
            "Balanced panel ({}): {} -> {} rows, {} series",
            self.mode,
            panel.n_rows(),
            balanced.n_rows(),
            balanced.n_columns()
        );

        let diagnostics = BalanceDiagnostics {
            mode: self.mode,
            all_missing_dropped,
            first_valid,
            global_first_valid,
            dropped_rows,
        };
        (balanced, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(m: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2000, m, 1).unwrap()
    }

    fn ragged() -> Panel {
        let nan = f64::NAN;
        Panel::from_pairs(
            "sasdate",
            (1..=5).map(month).collect(),
            vec![
                ("A", vec![1.0, 2.0, 3.0, nan, 5.0]),
                ("B", vec![nan, nan, 3.0, 4.0, 5.0]),
                ("DEAD", vec![nan; 5]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Initial".parse::<BalanceMode>().unwrap(), BalanceMode::Initial);
        assert!("partial".parse::<BalanceMode>().is_err());
    }

    #[test]
    fn test_none_keeps_rows_but_drops_dead_columns() {
        let (out, diag) = PanelBalancer::new(BalanceMode::None).balance(&ragged());
        assert_eq!(out.n_rows(), 5);
        assert_eq!(diag.all_missing_dropped, vec!["DEAD"]);
        assert!(!out.contains("DEAD"));
        assert!(diag.dropped_rows.is_empty());
    }

    #[test]
    fn test_initial_trims_to_latest_start() {
        let (out, diag) = PanelBalancer::new(BalanceMode::Initial).balance(&ragged());
        assert_eq!(diag.global_first_valid, 2);
        assert_eq!(diag.first_valid["A"], 0);
        assert_eq!(diag.dropped_rows, vec![month(1), month(2)]);
        assert_eq!(out.first_date(), Some(month(3)));
        assert!(out.columns().iter().all(|c| !c.values[0].is_nan()));
    }

    #[test]
    fn test_all_drops_interior_gaps() {
        let (out, diag) = PanelBalancer::new(BalanceMode::All).balance(&ragged());
        assert_eq!(out.dates(), &[month(3), month(5)]);
        assert_eq!(diag.dropped_rows, vec![month(1), month(2), month(4)]);
    }
}
