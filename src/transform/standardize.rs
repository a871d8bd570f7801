//! Column-wise z-scoring

use crate::error::{DfmError, Result};
use crate::panel::{Column, Panel};
use crate::types::is_missing;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Mean and deviation used to standardize one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMoments {
    pub series: String,
    /// Mean over observed values (`NaN` when nothing is observed)
    pub mean: f64,
    /// Standard deviation; `None` when undefined (zero variance or too few observations)
    pub std: Option<f64>,
}

/// Result of standardizing a panel
#[derive(Debug, Clone)]
pub struct Standardization {
    pub panel: Panel,
    pub moments: Vec<ColumnMoments>,
}

impl Standardization {
    /// Moments for one series
    pub fn moments_for(&self, series: &str) -> Option<&ColumnMoments> {
        self.moments.iter().find(|m| m.series == series)
    }

    /// Map standardized values back to the original scale.
    ///
    /// Series with an undefined deviation come back all-missing.
    pub fn inverse(&self, standardized: &Panel) -> Result<Panel> {
        let columns = standardized
            .columns()
            .iter()
            .map(|column| {
                let moments = self
                    .moments_for(&column.name)
                    .ok_or_else(|| DfmError::SeriesNotFound(column.name.clone()))?;
                let values = match moments.std {
                    Some(std) => column.values.iter().map(|z| z * std + moments.mean).collect(),
                    None => vec![f64::NAN; column.len()],
                };
                Ok(Column::new(column.name.clone(), values))
            })
            .collect::<Result<Vec<_>>>()?;
        standardized.with_columns(columns)
    }
}

/// Z-score standardizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standardizer {
    /// Delta degrees of freedom for the deviation (0 = population)
    pub ddof: usize,
}

impl Standardizer {
    /// Create a standardizer with the given degrees-of-freedom correction
    pub fn new(ddof: usize) -> Self {
        Self { ddof }
    }

    /// Mean and deviation of the observed values of one series
    pub fn moments(&self, column: &Column) -> ColumnMoments {
        let observed: Vec<f64> = column
            .values
            .iter()
            .copied()
            .filter(|v| !is_missing(*v))
            .collect();
        let mean = observed.iter().mean();

        let std = if observed.len() > self.ddof {
            let n = observed.len();
            let variance = match self.ddof {
                0 => observed.iter().population_variance(),
                1 => observed.iter().variance(),
                // statrs only offers the population and sample divisors
                ddof => observed.iter().population_variance() * n as f64 / (n - ddof) as f64,
            };
            let std = variance.sqrt();
            if std == 0.0 || std.is_nan() {
                None
            } else {
                Some(std)
            }
        } else {
            None
        };

        ColumnMoments {
            series: column.name.clone(),
            mean,
            std,
        }
    }

    /// Standardize every column: `(x - mean) / std`
    pub fn standardize(&self, panel: &Panel) -> Result<Standardization> {
        let moments: Vec<ColumnMoments> = panel
            .columns()
            .par_iter()
            .map(|column| self.moments(column))
            .collect();

        let columns = panel
            .columns()
            .iter()
            .zip(moments.iter())
            .map(|(column, m)| {
                let values = match m.std {
                    Some(std) => column.values.iter().map(|x| (x - m.mean) / std).collect(),
                    None => {
                        log::warn!(
                            "Series '{}' has undefined standard deviation; standardized values set to missing",
                            column.name
                        );
                        vec![f64::NAN; column.len()]
                    }
                };
                Column::new(column.name.clone(), values)
            })
            .collect();

        Ok(Standardization {
            panel: panel.with_columns(columns)?,
            moments,
        })
    }
}
