//! # rusty-dfm
//!
//! Preprocessing for macroeconomic panels (FRED-MD style) ahead of dynamic
//! factor model estimation.
//!
//! The pipeline reads a raw monthly CSV whose second row carries the
//! Stock–Watson transformation codes, applies the transforms, puts the panel
//! on a gap-free month-start grid, selects a training window, drops series
//! that fail the survival rules and reports where data is missing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rusty_dfm::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let config = PipelineConfig::default();
//!     let transformed = runner::build_transformed_panel(&config)?;
//!     for (variant, _) in runner::build_variants(&config, &transformed.csv_path)? {
//!         println!("{}: {} series kept", variant.name, variant.catalog.kept_series.len());
//!     }
//!     let diagnostics = MissingnessDiagnostics::default();
//!     runner::report_missing(&config, Path::new("data/processed_data/panel_transformed.csv"), &diagnostics)?;
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod groups;
pub mod panel;
pub mod preprocessing;
pub mod runner;
pub mod transform;
pub mod types;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::calendar::{MonthStartCalendar, PeriodCalendar};
    pub use crate::config::PipelineConfig;
    pub use crate::data::{load_panel_csv, write_panel_csv, CsvFormat, PanelFormat, RawTable};
    pub use crate::diagnostics::{
        BoundaryRequest, MissingMask, MissingnessDiagnostics, MissingnessReport, PositionsOptions,
    };
    pub use crate::error::{DfmError, Result};
    pub use crate::groups::{group_of, SeriesGroup};
    pub use crate::panel::{Column, Panel};
    pub use crate::preprocessing::{
        ensure_monthly, prepare_panel_for_factors, BalanceMode, ColumnRules, PanelBalancer,
        PrepareOptions, VariantBuilder, VariantSpec, WindowSelection,
    };
    pub use crate::runner;
    pub use crate::transform::{
        transform_panel, transform_series, TcodeResolver, TcodeRowStrategy, TransformCode,
        TransformCodeMap,
    };
    pub use crate::types::*;
}
