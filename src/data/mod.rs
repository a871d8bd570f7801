//! Panel I/O: CSV ingestion, artifact writers, polars export, digests

pub mod frame;
pub mod provenance;
pub mod reader;
pub mod writer;

pub use frame::{to_dataframe, write_parquet};
pub use provenance::{compute_sha256, sha256_file};
pub use reader::{clean_series_name, load_panel_csv, PanelFormat, RawTable};
pub use writer::{ensure_writable, format_g, write_json, write_panel_csv, CsvFormat};
