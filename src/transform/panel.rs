//! Panel-wide transformation by code map

use crate::error::{DfmError, InvalidCode, Result};
use crate::panel::{Column, Panel};
use crate::transform::series::transform_series;
use crate::transform::tcode::{TransformCode, TransformCodeMap};
use rayon::prelude::*;

/// Resolve the code for every panel column.
///
/// Missing codes are reported before invalid ones, and each check lists every
/// offending series. Codes for series absent from the panel are ignored.
pub fn resolve_codes(panel: &Panel, codes: &TransformCodeMap) -> Result<Vec<TransformCode>> {
    let missing: Vec<String> = panel
        .columns()
        .iter()
        .filter(|c| !codes.contains_key(&c.name))
        .map(|c| c.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(DfmError::MissingTransformCode { series: missing });
    }

    let mut resolved = Vec::with_capacity(panel.n_columns());
    let mut invalid = Vec::new();
    for column in panel.columns() {
        let raw = codes[&column.name];
        match TransformCode::try_from(raw) {
            Ok(code) => resolved.push(code),
            Err(_) => invalid.push(InvalidCode {
                series: Some(column.name.clone()),
                code: raw,
            }),
        }
    }
    if !invalid.is_empty() {
        return Err(DfmError::InvalidTransformCode { entries: invalid });
    }

    Ok(resolved)
}

/// Apply each series' code column-wise.
///
/// The input is sorted by timestamp first when needed (stable, ties keep their
/// order). The output shares that axis exactly: transforms never drop rows.
pub fn transform_panel(panel: &Panel, codes: &TransformCodeMap) -> Result<Panel> {
    let codes = resolve_codes(panel, codes)?;
    let sorted = panel.sorted_by_date();

    let columns: Vec<Column> = sorted
        .columns()
        .par_iter()
        .zip(codes.par_iter())
        .map(|(column, code)| Column::new(column.name.clone(), transform_series(&column.values, *code)))
        .collect();

    log::info!(
        "Transformed panel: {} rows x {} series",
        sorted.n_rows(),
        columns.len()
    );

    sorted.with_columns(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn panel() -> Panel {
        Panel::from_pairs(
            "sasdate",
            vec![month(2000, 1), month(2000, 2), month(2000, 3)],
            vec![("A", vec![1.0, 2.0, 4.0]), ("B", vec![10.0, 20.0, 40.0])],
        )
        .unwrap()
    }

    #[test]
    fn test_missing_codes_listed() {
        let codes = TransformCodeMap::from([("A".to_string(), 1)]);
        match transform_panel(&panel(), &codes) {
            Err(DfmError::MissingTransformCode { series }) => assert_eq!(series, vec!["B"]),
            other => panic!("expected MissingTransformCode, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_codes_listed() {
        let codes = TransformCodeMap::from([("A".to_string(), 0), ("B".to_string(), 9)]);
        match transform_panel(&panel(), &codes) {
            Err(DfmError::InvalidTransformCode { entries }) => assert_eq!(entries.len(), 2),
            other => panic!("expected InvalidTransformCode, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_codes_ignored() {
        let codes = TransformCodeMap::from([
            ("A".to_string(), 1),
            ("B".to_string(), 2),
            ("GONE".to_string(), 42),
        ]);
        let out = transform_panel(&panel(), &codes).unwrap();
        assert_eq!(out.n_rows(), 3);
        assert_eq!(out.values("B").unwrap()[1..], [10.0, 20.0]);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let unsorted = Panel::from_pairs(
            "sasdate",
            vec![month(2000, 3), month(2000, 1), month(2000, 2)],
            vec![("A", vec![4.0, 1.0, 2.0])],
        )
        .unwrap();
        let codes = TransformCodeMap::from([("A".to_string(), 2)]);
        let out = transform_panel(&unsorted, &codes).unwrap();
        assert_eq!(out.dates(), &[month(2000, 1), month(2000, 2), month(2000, 3)]);
        assert_eq!(out.values("A").unwrap()[1..], [1.0, 2.0]);
    }
}
