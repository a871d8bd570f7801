//! Polars export of panels

use crate::error::Result;
use crate::panel::Panel;
use crate::types::is_missing;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Convert a panel to a `DataFrame`: a `Date` column named after the axis,
/// then one nullable `Float64` column per series (missing -> null)
pub fn to_dataframe(panel: &Panel) -> Result<DataFrame> {
    let days: Vec<i32> = panel
        .dates()
        .iter()
        .map(|d| (*d - epoch()).num_days() as i32)
        .collect();
    let date = Series::new(panel.index_label(), days).cast(&DataType::Date)?;

    let mut columns = Vec::with_capacity(panel.n_columns() + 1);
    columns.push(date);
    for column in panel.columns() {
        let values: Vec<Option<f64>> = column
            .values
            .iter()
            .map(|v| if is_missing(*v) { None } else { Some(*v) })
            .collect();
        columns.push(Series::new(&column.name, values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Write a panel as Parquet
pub fn write_parquet(panel: &Panel, path: &Path) -> Result<()> {
    let mut df = to_dataframe(panel)?;
    let file = File::create(path)?;
    ParquetWriter::new(file).finish(&mut df)?;
    log::debug!("Wrote {} ({} rows)", path.display(), df.height());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> Panel {
        let dates = vec![
            NaiveDate::from_ymd_opt(1959, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(1959, 2, 1).unwrap(),
        ];
        Panel::from_pairs("sasdate", dates, vec![("RPI", vec![1.5, f64::NAN])]).unwrap()
    }

    #[test]
    fn test_dataframe_shape_and_nulls() {
        let df = to_dataframe(&panel()).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("sasdate").unwrap().dtype(), &DataType::Date);
        let rpi = df.column("RPI").unwrap();
        assert_eq!(rpi.null_count(), 1);
        assert_eq!(rpi.f64().unwrap().get(0), Some(1.5));
    }

    #[test]
    fn test_parquet_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.parquet");
        write_parquet(&panel(), &path).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}
