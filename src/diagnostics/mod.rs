//! Data-quality diagnostics

pub mod missingness;

pub use missingness::{
    boundary_report, contiguous_runs, interior_max_gap, missing_positions, missing_runs,
    BoundaryDates, BoundaryRequest, BoundarySummary, MissingMask, MissingRun,
    MissingnessDiagnostics, MissingnessReport, PositionsOptions, SeriesBoundary, SeriesPositions,
};
