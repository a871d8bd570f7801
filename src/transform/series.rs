//! Single-series transformations
//!
//! Each transform is causal: the value at row `t` depends only on rows `<= t`.
//! Differencing leaves leading `NaN`s in place, so the output always has the
//! same length as the input.

use crate::error::Result;
use crate::transform::tcode::TransformCode;
use crate::types::is_missing;

/// Parse a raw cell into a float; anything non-numeric becomes missing
pub fn coerce_numeric(token: &str) -> f64 {
    let token = token.trim();
    if token.is_empty() {
        return f64::NAN;
    }
    token.parse::<f64>().unwrap_or(f64::NAN)
}

/// One-period difference, `NaN` at row 0
fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if !values.is_empty() {
        out.push(f64::NAN);
    }
    for window in values.windows(2) {
        out.push(window[1] - window[0]);
    }
    out
}

/// Natural log restricted to positive values
fn safe_log(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| if v > 0.0 { v.ln() } else { f64::NAN })
        .collect()
}

/// One-period percentage change `x_t / x_{t-1} - 1`
fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if !values.is_empty() {
        out.push(f64::NAN);
    }
    for window in values.windows(2) {
        out.push(window[1] / window[0] - 1.0);
    }
    out
}

/// Apply one transformation code to a series
pub fn transform_series(values: &[f64], code: TransformCode) -> Vec<f64> {
    let transformed = match code {
        TransformCode::Level => values.to_vec(),
        TransformCode::Diff => diff(values),
        TransformCode::SecondDiff => diff(&diff(values)),
        TransformCode::Log => safe_log(values),
        TransformCode::LogDiff => diff(&safe_log(values)),
        TransformCode::LogSecondDiff => diff(&diff(&safe_log(values))),
        TransformCode::PctChangeDiff => diff(&pct_change(values)),
    };

    // Division by zero in pct_change can leave infinities behind
    transformed
        .into_iter()
        .map(|v| if v.is_infinite() { f64::NAN } else { v })
        .collect()
}

/// Apply a raw integer code, rejecting anything outside the allowed set
pub fn transform_series_with_code(values: &[f64], code: i64) -> Result<Vec<f64>> {
    let code = TransformCode::try_from(code)?;
    Ok(transform_series(values, code))
}

/// Transform raw string cells (numeric coercion first)
pub fn transform_tokens<S: AsRef<str>>(tokens: &[S], code: TransformCode) -> Vec<f64> {
    let values: Vec<f64> = tokens.iter().map(|t| coerce_numeric(t.as_ref())).collect();
    transform_series(&values, code)
}

/// Number of leading missing values in a transformed series
pub fn leading_missing(values: &[f64]) -> usize {
    values.iter().take_while(|v| is_missing(**v)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DfmError;
    use approx::assert_relative_eq;

    #[test]
    fn test_level_is_identity() {
        let x = vec![1.5, f64::NAN, -2.0, 0.0];
        let y = transform_series(&x, TransformCode::Level);
        assert_eq!(y[0], 1.5);
        assert!(y[1].is_nan());
        assert_eq!(y[2], -2.0);
        assert_eq!(y[3], 0.0);
    }

    #[test]
    fn test_differences() {
        let x = vec![1.0, 3.0, 6.0, 10.0];
        let d1 = transform_series(&x, TransformCode::Diff);
        assert!(d1[0].is_nan());
        assert_eq!(&d1[1..], &[2.0, 3.0, 4.0]);

        let d2 = transform_series(&x, TransformCode::SecondDiff);
        assert_eq!(leading_missing(&d2), 2);
        assert_eq!(&d2[2..], &[1.0, 1.0]);
    }

    #[test]
    fn test_log_domain() {
        let x = vec![1.0, 0.0, -5.0, std::f64::consts::E];
        let y = transform_series(&x, TransformCode::Log);
        assert_relative_eq!(y[0], 0.0);
        assert!(y[1].is_nan());
        assert!(y[2].is_nan());
        assert_relative_eq!(y[3], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_diff_propagates_non_positive() {
        let x = vec![100.0, 110.0, 0.0, 121.0, 133.1];
        let y = transform_series(&x, TransformCode::LogDiff);
        assert!(y[0].is_nan());
        assert_relative_eq!(y[1], (110.0f64 / 100.0).ln(), epsilon = 1e-12);
        assert!(y[2].is_nan());
        assert!(y[3].is_nan());
        assert_relative_eq!(y[4], (133.1f64 / 121.0).ln(), epsilon = 1e-12);

        let y2 = transform_series(&x, TransformCode::LogSecondDiff);
        assert!(y2[2].is_nan() && y2[3].is_nan() && y2[4].is_nan());
    }

    #[test]
    fn test_pct_change_diff() {
        let x = vec![100.0, 110.0, 121.0, 121.0];
        let y = transform_series(&x, TransformCode::PctChangeDiff);
        assert_eq!(leading_missing(&y), 2);
        assert_relative_eq!(y[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(y[3], -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_infinities_become_missing() {
        let x = vec![0.0, 5.0, 6.0];
        let y = transform_series(&x, TransformCode::PctChangeDiff);
        assert!(y.iter().all(|v| !v.is_infinite()));
        assert!(y[2].is_nan());
    }

    #[test]
    fn test_tokens_are_coerced() {
        let y = transform_tokens(&["1", "n/a", "", "4.5"], TransformCode::Level);
        assert_eq!(y[0], 1.0);
        assert!(y[1].is_nan());
        assert!(y[2].is_nan());
        assert_eq!(y[3], 4.5);
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        let err = transform_series_with_code(&[1.0], 8).unwrap_err();
        assert!(matches!(err, DfmError::InvalidTransformCode { .. }));
        assert!(err.to_string().contains('8'));
    }
}
