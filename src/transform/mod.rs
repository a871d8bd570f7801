//! Stationarity transforms and code-map handling

pub mod panel;
pub mod resolver;
pub mod series;
pub mod standardize;
pub mod tcode;

pub use panel::{resolve_codes, transform_panel};
pub use resolver::{
    detect_tcode_row, parse_tcode_json, read_embedded_tcodes, validate_tcode_map, TcodeCheck,
    TcodeResolution, TcodeResolver, TcodeRowStrategy,
};
pub use series::{coerce_numeric, leading_missing, transform_series, transform_series_with_code};
pub use standardize::{ColumnMoments, Standardization, Standardizer};
pub use tcode::{TransformCode, TransformCodeMap, ALLOWED_TCODES, LEADS_LOST};
