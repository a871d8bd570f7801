//! Pipeline configuration (TOML)
//!
//! Every field has a default, so a file only needs the values it changes:
//!
//! ```toml
//! [paths]
//! raw_csv = "data/raw/current.csv"
//!
//! [window]
//! holdout_months = 36
//!
//! [[variants]]
//! name = "panel_start_1970"
//! anchor_start = "01/01/1970"
//! ```

use crate::data::reader::PanelFormat;
use crate::data::writer::CsvFormat;
use crate::error::{DfmError, Result};
use crate::preprocessing::factors::PrepareOptions;
use crate::preprocessing::variants::{ColumnRules, VariantSpec};
use crate::preprocessing::window::WindowSelection;
use crate::transform::resolver::{TcodeResolver, TcodeRowStrategy};
use crate::types::{DATE_COL_DEFAULT, DATE_FMT_DEFAULT, FLOAT_DIGITS_DEFAULT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_raw_csv")]
    pub raw_csv: PathBuf,
    #[serde(default = "default_tcode_json")]
    pub tcode_json: PathBuf,
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: PathBuf,
    #[serde(default = "default_quality_dir")]
    pub quality_dir: PathBuf,
}

fn default_raw_csv() -> PathBuf {
    PathBuf::from("data/raw/current.csv")
}

fn default_tcode_json() -> PathBuf {
    PathBuf::from("data/metadata/fred_md_tcodes.json")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed_data")
}

fn default_metadata_dir() -> PathBuf {
    PathBuf::from("data/metadata")
}

fn default_quality_dir() -> PathBuf {
    PathBuf::from("data/quality_checks")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_csv: default_raw_csv(),
            tcode_json: default_tcode_json(),
            processed_dir: default_processed_dir(),
            metadata_dir: default_metadata_dir(),
            quality_dir: default_quality_dir(),
        }
    }
}

/// Table layout and rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatConfig {
    #[serde(default = "default_date_column")]
    pub date_column: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_float_digits")]
    pub float_digits: usize,
    /// Trim series names and replace spaces with underscores at ingestion
    #[serde(default)]
    pub clean_names: bool,
    /// Also write Parquet next to the transformed panel CSV
    #[serde(default)]
    pub parquet: bool,
}

fn default_date_column() -> String {
    DATE_COL_DEFAULT.to_string()
}

fn default_date_format() -> String {
    DATE_FMT_DEFAULT.to_string()
}

fn default_float_digits() -> usize {
    FLOAT_DIGITS_DEFAULT
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            date_column: default_date_column(),
            date_format: default_date_format(),
            float_digits: default_float_digits(),
            clean_names: false,
            parquet: false,
        }
    }
}

impl FormatConfig {
    pub fn panel_format(&self) -> PanelFormat {
        PanelFormat {
            date_column: self.date_column.clone(),
            date_format: self.date_format.clone(),
            clean_names: self.clean_names,
        }
    }

    pub fn csv_format(&self) -> CsvFormat {
        CsvFormat {
            date_format: self.date_format.clone(),
            float_digits: self.float_digits,
        }
    }
}

/// Locating the embedded transform-code row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcodeConfig {
    /// Explicit 0-based file row; wins over autodetection
    #[serde(default)]
    pub row: Option<usize>,
    #[serde(default = "default_true")]
    pub autodetect: bool,
    #[serde(default = "default_max_scan_rows")]
    pub max_scan_rows: usize,
    #[serde(default = "default_true")]
    pub require_all: bool,
    /// Replace an existing code-map file
    #[serde(default)]
    pub overwrite: bool,
    /// Write `<json>.meta.json` next to the code map
    #[serde(default = "default_true")]
    pub write_meta: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_scan_rows() -> usize {
    5
}

impl Default for TcodeConfig {
    fn default() -> Self {
        Self {
            row: None,
            autodetect: true,
            max_scan_rows: default_max_scan_rows(),
            require_all: true,
            overwrite: false,
            write_meta: true,
        }
    }
}

impl TcodeConfig {
    pub fn strategy(&self) -> TcodeRowStrategy {
        match (self.row, self.autodetect) {
            (Some(row), _) => TcodeRowStrategy::RowIndex { row },
            (None, true) => TcodeRowStrategy::Autodetect {
                max_scan_rows: self.max_scan_rows,
            },
            (None, false) => TcodeRowStrategy::RowIndex {
                row: crate::transform::resolver::DEFAULT_TCODE_ROW,
            },
        }
    }

    pub fn resolver(&self, date_column: &str) -> TcodeResolver {
        let resolver = TcodeResolver::new(date_column, self.strategy());
        if self.require_all {
            resolver
        } else {
            resolver.allow_missing()
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub format: FormatConfig,
    #[serde(default)]
    pub tcodes: TcodeConfig,
    #[serde(default)]
    pub rules: ColumnRules,
    #[serde(default)]
    pub window: WindowSelection,
    #[serde(default)]
    pub prepare: PrepareOptions,
    #[serde(default = "VariantSpec::defaults")]
    pub variants: Vec<VariantSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            format: FormatConfig::default(),
            tcodes: TcodeConfig::default(),
            rules: ColumnRules::default(),
            window: WindowSelection::default(),
            prepare: PrepareOptions::default(),
            variants: VariantSpec::defaults(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            DfmError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        if !(0.0..=1.0).contains(&self.rules.missing_share_max) {
            return Err(DfmError::InvalidParameter {
                name: "missing_share_max",
                value: self.rules.missing_share_max.to_string(),
                expected: "a share in [0, 1]",
            });
        }
        if let Some(dup) = self
            .variants
            .iter()
            .enumerate()
            .find(|(i, v)| self.variants[..*i].iter().any(|w| w.name == v.name))
        {
            return Err(DfmError::ConfigError(format!(
                "Variant '{}' is defined more than once",
                dup.1.name
            )));
        }
        for spec in &self.variants {
            spec.anchor(&self.format.date_format)?;
        }
        Ok(())
    }

    /// Render as TOML (used by `--print-config`)
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DfmError::ConfigError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::balance::BalanceMode;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.format.date_column, "sasdate");
        assert_eq!(config.rules.leading_na_limit_months, 24);
        assert_eq!(config.window.min_run, 12);
        assert_eq!(config.variants.len(), 2);
        assert_eq!(
            config.tcodes.strategy(),
            TcodeRowStrategy::Autodetect { max_scan_rows: 5 }
        );
    }

    #[test]
    fn test_partial_file() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [window]
            holdout_months = 36

            [rules]
            missing_share_max = 0.3

            [prepare]
            balance = "all"

            [tcodes]
            row = 1

            [[variants]]
            name = "late"
            anchor_start = "01/01/1970"
            "#,
        )
        .unwrap();
        assert_eq!(config.window.holdout_months, 36);
        assert_eq!(config.window.train_years, 30);
        assert_eq!(config.rules.missing_share_max, 0.3);
        assert_eq!(config.rules.interior_gap_max_months, 6);
        assert_eq!(config.prepare.balance, BalanceMode::All);
        assert_eq!(config.tcodes.strategy(), TcodeRowStrategy::RowIndex { row: 1 });
        assert_eq!(config.variants, vec![VariantSpec::new("late", "01/01/1970")]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(PipelineConfig::from_toml_str("[window]\ncoverage_threshold = 1.5\n").is_err());
        assert!(PipelineConfig::from_toml_str(
            "[[variants]]\nname = \"a\"\nanchor_start = \"someday\"\n"
        )
        .is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PipelineConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }
}
