//! Error taxonomy: every structural failure surfaces as a typed error with a
//! message naming what went wrong

use chrono::NaiveDate;
use rusty_dfm::data::reader::{PanelFormat, RawTable};
use rusty_dfm::error::DfmError;
use rusty_dfm::panel::{Column, Panel};
use rusty_dfm::preprocessing::{ensure_monthly, VariantBuilder, VariantSpec, WindowSelection};
use rusty_dfm::preprocessing::ColumnRules;
use rusty_dfm::transform::{transform_panel, transform_series_with_code, TransformCodeMap};

fn month(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).unwrap()
}

fn panel() -> Panel {
    Panel::from_pairs(
        "sasdate",
        vec![month(2000, 1), month(2000, 2), month(2000, 3)],
        vec![
            ("RPI", vec![1.0, 2.0, 3.0]),
            ("INDPRO", vec![4.0, 5.0, 6.0]),
            ("UNRATE", vec![7.0, 8.0, 9.0]),
        ],
    )
    .unwrap()
}

fn codes(pairs: &[(&str, i64)]) -> TransformCodeMap {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[cfg(test)]
mod transform_code_errors {
    use super::*;

    #[test]
    fn test_missing_codes_list_every_series() {
        let err = transform_panel(&panel(), &codes(&[("RPI", 5)])).unwrap_err();
        match &err {
            DfmError::MissingTransformCode { series } => {
                assert_eq!(series, &vec!["INDPRO".to_string(), "UNRATE".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let msg = err.to_string();
        assert!(msg.contains("INDPRO"));
        assert!(msg.contains("UNRATE"));
    }

    #[test]
    fn test_invalid_code_names_series_and_allowed_set() {
        let map = codes(&[("RPI", 5), ("INDPRO", 9), ("UNRATE", 0)]);
        let err = transform_panel(&panel(), &map).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, DfmError::InvalidTransformCode { .. }));
        assert!(msg.contains("INDPRO=9"));
        assert!(msg.contains("UNRATE=0"));
        assert!(msg.contains("[1, 2, 3, 4, 5, 6, 7]"));
    }

    #[test]
    fn test_extra_codes_are_ignored() {
        let map = codes(&[("RPI", 1), ("INDPRO", 1), ("UNRATE", 1), ("GONE", 2)]);
        assert!(transform_panel(&panel(), &map).is_ok());
    }

    #[test]
    fn test_bare_series_rejects_unknown_code() {
        let err = transform_series_with_code(&[1.0, 2.0], 8).unwrap_err();
        assert!(err.to_string().contains('8'));
    }
}

#[cfg(test)]
mod index_errors {
    use super::*;

    #[test]
    fn test_empty_panel() {
        let empty = Panel::new("sasdate", vec![], vec![]).unwrap();
        let err = ensure_monthly(&empty).unwrap_err();
        assert!(matches!(err, DfmError::EmptyPanel { .. }));
        assert!(err.to_string().contains("at least one timestamp"));
    }

    #[test]
    fn test_mid_month_date_rejected() {
        let p = Panel::from_pairs(
            "sasdate",
            vec![month(2000, 1), NaiveDate::from_ymd_opt(2000, 2, 15).unwrap()],
            vec![("RPI", vec![1.0, 2.0])],
        )
        .unwrap();
        assert!(matches!(
            ensure_monthly(&p),
            Err(DfmError::NonMonotonicOrInvalidIndex(_))
        ));
    }

    #[test]
    fn test_unparseable_date_row() {
        let table = RawTable::from_reader("sasdate,RPI\n01/01/2000,1\nnot a date,2\n".as_bytes()).unwrap();
        let err = table.to_panel(&PanelFormat::default(), &[]).unwrap_err();
        assert!(matches!(err, DfmError::NonMonotonicOrInvalidIndex(_)));
        assert!(err.to_string().contains("not a date"));
    }

    #[test]
    fn test_missing_date_column() {
        let table = RawTable::from_reader("when,RPI\n01/01/2000,1\n".as_bytes()).unwrap();
        assert!(matches!(
            table.to_panel(&PanelFormat::default(), &[]),
            Err(DfmError::ConfigError(_))
        ));
    }
}

#[cfg(test)]
mod panel_errors {
    use super::*;

    #[test]
    fn test_duplicate_series() {
        let err = Panel::new(
            "sasdate",
            vec![month(2000, 1)],
            vec![Column::new("RPI", vec![1.0]), Column::new("RPI", vec![2.0])],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate series name: RPI");
    }

    #[test]
    fn test_length_mismatch() {
        let err = Panel::from_pairs("sasdate", vec![month(2000, 1)], vec![("RPI", vec![1.0, 2.0])])
            .unwrap_err();
        assert!(matches!(
            err,
            DfmError::LengthMismatch {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_series_selection() {
        assert!(matches!(
            panel().select_columns(&["GDP"]),
            Err(DfmError::SeriesNotFound(_))
        ));
    }
}

#[cfg(test)]
mod variant_errors {
    use super::*;

    #[test]
    fn test_bad_anchor() {
        let builder = VariantBuilder::new(ColumnRules::default(), WindowSelection::default());
        let err = builder
            .build(&panel(), &VariantSpec::new("v", "the sixties"))
            .unwrap_err();
        assert!(err.to_string().contains("anchor_start"));
    }

    #[test]
    fn test_anchor_after_last_date_is_empty() {
        let builder = VariantBuilder::new(ColumnRules::default(), WindowSelection::default());
        let err = builder
            .build(&panel(), &VariantSpec::new("v", "01/01/2010"))
            .unwrap_err();
        assert!(matches!(err, DfmError::EmptyPanel { .. }));
    }
}
