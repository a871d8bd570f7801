//! Property-based tests for transforms, grid enforcement, balancing and runs

use chrono::{Months, NaiveDate};
use proptest::prelude::*;
use rusty_dfm::diagnostics::contiguous_runs;
use rusty_dfm::panel::Panel;
use rusty_dfm::preprocessing::{BalanceMode, MonthlyGridEnforcer, PanelBalancer, WindowSelection};
use rusty_dfm::transform::{leading_missing, transform_series, TransformCode};

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
}

/// Finite values with occasional gaps
fn gappy_series(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop::option::weighted(0.8, -1.0e6..1.0e6f64), len)
        .prop_map(|v| v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
}

/// Panel on a sparse subset of 48 months with two gappy series
fn sparse_panel() -> impl Strategy<Value = Panel> {
    prop::collection::btree_set(0u32..48, 1..30).prop_flat_map(|months| {
        let n = months.len();
        (Just(months), gappy_series(n..n + 1), gappy_series(n..n + 1)).prop_map(|(months, a, b)| {
            let dates = months
                .iter()
                .map(|m| base() + Months::new(*m))
                .collect();
            Panel::from_pairs("sasdate", dates, vec![("A", a), ("B", b)]).unwrap()
        })
    })
}

/// Monthly panel whose series start late but have no interior gaps
fn ragged_panel() -> impl Strategy<Value = Panel> {
    (2usize..40).prop_flat_map(|n| {
        prop::collection::vec((0..=n, prop::collection::vec(1.0..100.0f64, n)), 1..6).prop_map(
            move |series| {
                let dates = (0..n).map(|i| base() + Months::new(i as u32)).collect();
                let pairs = series
                    .into_iter()
                    .enumerate()
                    .map(|(k, (lead, mut values))| {
                        values[..lead].iter_mut().for_each(|v| *v = f64::NAN);
                        (format!("S{}", k), values)
                    })
                    .collect();
                Panel::from_pairs("sasdate", dates, pairs).unwrap()
            },
        )
    })
}

proptest! {
    #[test]
    fn prop_level_is_identity(values in gappy_series(0..60)) {
        let out = transform_series(&values, TransformCode::Level);
        prop_assert_eq!(out.len(), values.len());
        for (x, y) in values.iter().zip(&out) {
            prop_assert!((x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits());
        }
    }

    #[test]
    fn prop_differences_lose_leads(values in prop::collection::vec(-1.0e6..1.0e6f64, 3..60)) {
        prop_assert_eq!(leading_missing(&transform_series(&values, TransformCode::Diff)), 1);
        prop_assert_eq!(leading_missing(&transform_series(&values, TransformCode::SecondDiff)), 2);
    }

    #[test]
    fn prop_log_masks_non_positive(values in prop::collection::vec(-10.0..100.0f64, 2..60)) {
        let logged = transform_series(&values, TransformCode::Log);
        let growth = transform_series(&values, TransformCode::LogDiff);
        let acceleration = transform_series(&values, TransformCode::LogSecondDiff);
        for (t, x) in values.iter().enumerate() {
            if *x <= 0.0 {
                prop_assert!(logged[t].is_nan());
                for lag in 0..2 {
                    if t + lag < values.len() {
                        prop_assert!(growth[t + lag].is_nan());
                    }
                }
                for lag in 0..3 {
                    if t + lag < values.len() {
                        prop_assert!(acceleration[t + lag].is_nan(), "row {} after {}", t + lag, t);
                    }
                }
            } else {
                prop_assert!(logged[t].is_finite());
            }
        }
    }

    #[test]
    fn prop_grid_is_idempotent(panel in sparse_panel()) {
        let enforcer = MonthlyGridEnforcer::new();
        let once = enforcer.enforce(&panel).unwrap();
        let twice = enforcer.enforce(&once).unwrap();
        prop_assert_eq!(&once, &twice);

        let span = once.dates().len() as u32;
        prop_assert_eq!(once.first_date(), panel.first_date());
        prop_assert_eq!(once.last_date().unwrap(), panel.first_date().unwrap() + Months::new(span - 1));
    }

    #[test]
    fn prop_initial_balance_starts_observed(panel in ragged_panel()) {
        let (balanced, diagnostics) = PanelBalancer::new(BalanceMode::Initial).balance(&panel);
        if balanced.n_rows() > 0 {
            for column in balanced.columns() {
                prop_assert!(!column.values[0].is_nan(), "{} starts missing", column.name);
            }
        }
        prop_assert_eq!(
            balanced.n_rows() + diagnostics.dropped_rows.len(),
            panel.n_rows()
        );
    }

    #[test]
    fn prop_all_balance_is_dense(panel in sparse_panel()) {
        let (balanced, _) = PanelBalancer::new(BalanceMode::All).balance(&panel);
        for column in balanced.columns() {
            prop_assert!(column.values.iter().all(|v| !v.is_nan()));
        }
    }

    #[test]
    fn prop_runs_cover_mask(mask in prop::collection::vec(any::<bool>(), 0..80)) {
        let runs = contiguous_runs(&mask);
        let covered: usize = runs.iter().map(|(s, e)| e - s + 1).sum();
        prop_assert_eq!(covered, mask.iter().filter(|m| **m).count());
        for pair in runs.windows(2) {
            // maximal: at least one observed row between runs
            prop_assert!(pair[1].0 > pair[0].1 + 1);
        }
    }

    #[test]
    fn prop_window_is_ordered(
        coverage in prop::collection::vec(0.0..=1.0f64, 1..200),
        holdout in 0usize..80,
        years in 1usize..40,
    ) {
        let dates: Vec<NaiveDate> = (0..coverage.len())
            .map(|i| base() + Months::new(i as u32))
            .collect();
        let selection = WindowSelection { holdout_months: holdout, train_years: years, ..Default::default() };
        let window = selection.select_from_coverage(&dates, &coverage).unwrap();
        prop_assert!(window.start <= window.end);
        prop_assert!(window.end_idx < dates.len());
        prop_assert!(window.n_months() <= years * 12 || window.holdout_shrunk);
    }
}
