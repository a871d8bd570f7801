//! Batch steps: each reads its inputs from a [`PipelineConfig`], runs one
//! stage of the pipeline and writes its artifacts

use crate::config::PipelineConfig;
use crate::data::frame::write_parquet;
use crate::data::provenance::sha256_file;
use crate::data::reader::{clean_series_name, load_panel_csv, RawTable};
use crate::data::writer::{
    ensure_writable, write_boundary_csv, write_json, write_panel_csv, write_panel_indexed,
    write_positions_jsonl, write_positions_summary_csv, write_runs_csv,
};
use crate::diagnostics::missingness::{MissingnessDiagnostics, MissingnessReport, PositionsOptions};
use crate::error::Result;
use crate::panel::Panel;
use crate::preprocessing::factors::{prepare_panel_for_factors, PrepareInfo};
use crate::preprocessing::grid::ensure_monthly;
use crate::preprocessing::variants::{Variant, VariantBuilder, VariantCatalog};
use crate::transform::panel::transform_panel;
use crate::transform::resolver::{parse_tcode_json, TcodeResolution};
use crate::transform::tcode::TransformCodeMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const TRANSFORMED_STEM: &str = "panel_transformed";
pub const FACTORS_STEM: &str = "panel_factors";

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

/// Sidecar provenance for an extracted code map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcodeMeta {
    pub tcode_row: usize,
    pub autodetected: bool,
    pub csv_path: String,
    pub csv_sha256: String,
    pub n_series: usize,
    pub missing_in_tcodes: Vec<String>,
    pub extra_in_tcodes: Vec<String>,
    pub mapping_json_path: String,
}

#[derive(Debug, Clone)]
pub struct TcodeExtraction {
    pub codes: TransformCodeMap,
    pub meta: TcodeMeta,
    pub mapping_path: PathBuf,
    pub meta_path: Option<PathBuf>,
}

/// `<json>.meta.json`
pub fn meta_path_for(mapping: &Path) -> PathBuf {
    let mut name = mapping.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

/// Resolve the embedded codes of the raw CSV and persist them as a plain map
pub fn extract_tcodes(config: &PipelineConfig) -> Result<TcodeExtraction> {
    let csv_path = &config.paths.raw_csv;
    let mapping_path = config.paths.tcode_json.clone();
    ensure_writable(&mapping_path, config.tcodes.overwrite)?;

    let table = RawTable::from_path(csv_path)?;
    let resolution = config
        .tcodes
        .resolver(&config.format.date_column)
        .resolve(&table)?;

    write_json(&resolution.codes, &mapping_path)?;

    let meta = TcodeMeta {
        tcode_row: resolution.row,
        autodetected: resolution.autodetected,
        csv_path: path_string(csv_path),
        csv_sha256: sha256_file(csv_path)?,
        n_series: resolution.codes.len(),
        missing_in_tcodes: resolution.check.missing_in_tcodes.clone(),
        extra_in_tcodes: resolution.check.extra_in_tcodes.clone(),
        mapping_json_path: path_string(&mapping_path),
    };

    let meta_path = if config.tcodes.write_meta {
        let path = meta_path_for(&mapping_path);
        write_json(&meta, &path)?;
        Some(path)
    } else {
        None
    };

    log::info!(
        "Extracted {} transform codes to {}",
        meta.n_series,
        mapping_path.display()
    );

    Ok(TcodeExtraction {
        codes: resolution.codes,
        meta,
        mapping_path,
        meta_path,
    })
}

/// Read a persisted `{series: code}` map
pub fn load_tcode_map(path: &Path) -> Result<TransformCodeMap> {
    parse_tcode_json(&fs::read_to_string(path)?)
}

/// Raw panel (code row skipped) plus the codes embedded in the file.
///
/// When the configured code-map JSON exists the embedded row is only located
/// and skipped, so gaps in it are reported rather than rejected.
pub fn load_raw_panel(config: &PipelineConfig) -> Result<(Panel, TcodeResolution)> {
    let table = RawTable::from_path(&config.paths.raw_csv)?;
    let mut resolver = config.tcodes.resolver(&config.format.date_column);
    if config.paths.tcode_json.exists() {
        resolver = resolver.allow_missing();
    }
    let resolution = resolver.resolve(&table)?;
    let panel = table.to_panel(&config.format.panel_format(), &[resolution.row])?;
    Ok((panel, resolution))
}

/// Code map from the configured JSON when present, else from the raw file.
/// Keys follow the panel's column naming.
fn codes_for(config: &PipelineConfig, embedded: TransformCodeMap) -> Result<TransformCodeMap> {
    let codes = if config.paths.tcode_json.exists() {
        log::info!("Using transform codes from {}", config.paths.tcode_json.display());
        load_tcode_map(&config.paths.tcode_json)?
    } else {
        embedded
    };
    if config.format.clean_names {
        Ok(codes
            .into_iter()
            .map(|(name, code)| (clean_series_name(&name), code))
            .collect())
    } else {
        Ok(codes)
    }
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub panel: Panel,
    pub csv_path: PathBuf,
    pub parquet_path: Option<PathBuf>,
}

/// Transform the raw panel and write `panel_transformed.csv` (and Parquet)
pub fn build_transformed_panel(config: &PipelineConfig) -> Result<TransformOutput> {
    let (raw, resolution) = load_raw_panel(config)?;
    let codes = codes_for(config, resolution.codes)?;
    let panel = transform_panel(&raw, &codes)?;

    let dir = &config.paths.processed_dir;
    let csv_path = dir.join(format!("{}.csv", TRANSFORMED_STEM));
    write_panel_csv(&panel, &csv_path, &config.format.date_column, &config.format.csv_format())?;

    let parquet_path = if config.format.parquet {
        let path = dir.join(format!("{}.parquet", TRANSFORMED_STEM));
        write_parquet(&panel, &path)?;
        Some(path)
    } else {
        None
    };

    log::info!(
        "Transformed panel {} x {} written to {}",
        panel.n_rows(),
        panel.n_columns(),
        csv_path.display()
    );

    Ok(TransformOutput {
        panel,
        csv_path,
        parquet_path,
    })
}

/// Files written for one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantArtifacts {
    pub panel_csv_index: String,
    pub panel_csv_with_sasdate_col: String,
    pub catalog_json: String,
}

#[derive(Serialize)]
struct CatalogRecord<'a> {
    #[serde(flatten)]
    catalog: &'a VariantCatalog,
    artifacts: &'a VariantArtifacts,
}

/// Monthly panel and a builder carrying the input's provenance
pub fn variant_inputs(config: &PipelineConfig, input: &Path) -> Result<(Panel, VariantBuilder)> {
    let panel = ensure_monthly(&load_panel_csv(input, &config.format.panel_format())?)?;
    let builder = VariantBuilder::new(config.rules, config.window)
        .with_date_format(config.format.date_format.clone())
        .with_provenance(path_string(input), Some(sha256_file(input)?));
    Ok((panel, builder))
}

/// Write both panel layouts and the catalog of a built variant
pub fn write_variant(config: &PipelineConfig, variant: &Variant) -> Result<VariantArtifacts> {
    let csv_format = config.format.csv_format();
    let index_path = config.paths.processed_dir.join(format!("{}.csv", variant.name));
    let column_path = config
        .paths
        .processed_dir
        .join(format!("{}_{}_column.csv", variant.name, config.format.date_column));
    let catalog_path = config
        .paths
        .metadata_dir
        .join(format!("{}_catalog.json", variant.name));

    write_panel_indexed(&variant.panel, &index_path, &csv_format)?;
    write_panel_csv(&variant.panel, &column_path, &config.format.date_column, &csv_format)?;

    let artifacts = VariantArtifacts {
        panel_csv_index: path_string(&index_path),
        panel_csv_with_sasdate_col: path_string(&column_path),
        catalog_json: path_string(&catalog_path),
    };
    write_json(
        &CatalogRecord {
            catalog: &variant.catalog,
            artifacts: &artifacts,
        },
        &catalog_path,
    )?;
    Ok(artifacts)
}

/// Build and write every configured variant
pub fn build_variants(config: &PipelineConfig, input: &Path) -> Result<Vec<(Variant, VariantArtifacts)>> {
    let (panel, builder) = variant_inputs(config, input)?;
    config
        .variants
        .iter()
        .map(|spec| {
            let variant = builder.build(&panel, spec)?;
            let artifacts = write_variant(config, &variant)?;
            Ok((variant, artifacts))
        })
        .collect()
}

/// Files written by the missingness report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessArtifacts {
    pub by_series_csv: String,
    pub summary_json: String,
    pub positions_summary_csv: String,
    pub positions_jsonl: String,
    pub runs_csv: String,
}

#[derive(Serialize)]
struct MissingnessCatalog<'a> {
    input_csv: String,
    input_sha256: String,
    artifacts: &'a MissingnessArtifacts,
    params: MissingnessParams<'a>,
}

#[derive(Serialize)]
struct MissingnessParams<'a> {
    date_format: &'a str,
    diagnostics: &'a PositionsOptions,
}

/// Run all three missingness reports over a panel CSV and write them
pub fn report_missing(
    config: &PipelineConfig,
    input: &Path,
    diagnostics: &MissingnessDiagnostics,
) -> Result<(MissingnessReport, MissingnessArtifacts)> {
    let panel = load_panel_csv(input, &config.format.panel_format())?;
    let report = diagnostics.run(&panel)?;
    let csv_format = config.format.csv_format();
    let qc = &config.paths.quality_dir;
    let meta = &config.paths.metadata_dir;

    let by_series = qc.join("panel_missing_by_series.csv");
    let summary = meta.join("panel_missing_summary.json");
    let positions_summary = qc.join("missing_positions_summary.csv");
    let positions = qc.join("missing_positions.jsonl");
    let runs = qc.join("missing_runs.csv");

    write_boundary_csv(&report.by_series, &by_series, &csv_format)?;
    write_json(&report.summary, &summary)?;
    write_positions_summary_csv(&report.positions, &positions_summary, &csv_format)?;
    write_positions_jsonl(&report.positions, &positions, &csv_format)?;
    write_runs_csv(&report.runs, &runs, &csv_format)?;

    let artifacts = MissingnessArtifacts {
        by_series_csv: path_string(&by_series),
        summary_json: path_string(&summary),
        positions_summary_csv: path_string(&positions_summary),
        positions_jsonl: path_string(&positions),
        runs_csv: path_string(&runs),
    };
    write_json(
        &MissingnessCatalog {
            input_csv: path_string(input),
            input_sha256: sha256_file(input)?,
            artifacts: &artifacts,
            params: MissingnessParams {
                date_format: &config.format.date_format,
                diagnostics: &diagnostics.positions,
            },
        },
        &meta.join("panel_missing_catalog.json"),
    )?;

    Ok((report, artifacts))
}

#[derive(Debug, Clone)]
pub struct PrepareOutput {
    pub panel: Panel,
    pub info: PrepareInfo,
    pub csv_path: PathBuf,
    pub info_path: PathBuf,
}

/// Factor-model preparation of the raw panel
pub fn prepare(config: &PipelineConfig) -> Result<PrepareOutput> {
    let (raw, resolution) = load_raw_panel(config)?;
    let codes = codes_for(config, resolution.codes)?;
    let (panel, info) = prepare_panel_for_factors(&raw, &codes, &config.prepare)?;

    let csv_path = config.paths.processed_dir.join(format!("{}.csv", FACTORS_STEM));
    let info_path = config
        .paths
        .metadata_dir
        .join(format!("{}_info.json", FACTORS_STEM));
    write_panel_csv(&panel, &csv_path, &config.format.date_column, &config.format.csv_format())?;
    write_json(&info, &info_path)?;

    Ok(PrepareOutput {
        panel,
        info,
        csv_path,
        info_path,
    })
}
