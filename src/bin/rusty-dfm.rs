//! rusty-dfm CLI - batch preprocessing of FRED-MD style panels
//!
//! ## Example Usage
//!
//! ```bash
//! # Pull the transform codes out of the raw file
//! rusty-dfm extract-tcodes --csv data/raw/current.csv
//!
//! # Transform, build the default variants, report missingness
//! rusty-dfm run
//!
//! # One variant with a custom anchor
//! rusty-dfm variants --variant panel_start_1970=01/01/1970
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rusty_dfm::config::PipelineConfig;
use rusty_dfm::data::reader::load_panel_csv;
use rusty_dfm::data::writer::write_panel_csv;
use rusty_dfm::diagnostics::{BoundaryRequest, MissingnessDiagnostics, PositionsOptions};
use rusty_dfm::groups::{assign_groups, filter_by_group, SeriesGroup};
use rusty_dfm::preprocessing::{BalanceMode, VariantSpec};
use rusty_dfm::runner;
use rusty_dfm::types::{parse_date, Timestamp};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

const CONFIG_FILE: &str = "rusty-dfm.toml";

/// rusty-dfm: macroeconomic panel preprocessing for dynamic factor models
#[derive(Parser)]
#[command(name = "rusty-dfm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Macroeconomic panel preprocessing for dynamic factor models", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the embedded transform codes to JSON
    ExtractTcodes {
        /// Raw CSV with the code row
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output JSON path
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// Explicit 0-based file row holding the codes (header is row 0)
        #[arg(long)]
        row: Option<usize>,

        /// Do not scan for the code row
        #[arg(long)]
        no_autodetect: bool,

        /// Accept series without a code
        #[arg(long)]
        allow_missing: bool,

        /// Replace an existing JSON file
        #[arg(short = 'f', long)]
        overwrite: bool,

        /// Skip the `.meta.json` sidecar
        #[arg(long)]
        no_meta: bool,
    },

    /// Transform the raw panel by code
    Transform {
        /// Raw CSV with the code row
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Code map JSON (defaults to the codes embedded in the CSV)
        #[arg(long)]
        tcodes: Option<PathBuf>,

        /// Output directory
        #[arg(short = 'o', long)]
        out_dir: Option<PathBuf>,

        /// Also write Parquet
        #[arg(long)]
        parquet: bool,
    },

    /// Build anchored panel variants with training windows and drop rules
    Variants {
        /// Transformed panel CSV
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Variant as NAME=ANCHOR (repeatable; replaces the configured list)
        #[arg(long = "variant", value_name = "NAME=ANCHOR", value_parser = parse_variant)]
        variants: Vec<VariantSpec>,

        /// Months reserved at the tail
        #[arg(long)]
        holdout_months: Option<usize>,

        /// Desired training length in years
        #[arg(long)]
        train_years: Option<usize>,
    },

    /// Report missing data: boundaries, positions and runs
    Diagnostics {
        /// Panel CSV
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// First boundary date
        #[arg(long)]
        first: Option<String>,

        /// Second boundary date
        #[arg(long)]
        second: Option<String>,

        /// Last boundary date
        #[arg(long)]
        last: Option<String>,

        /// Restrict positions and runs to dates from here
        #[arg(long)]
        start: Option<String>,

        /// Restrict positions and runs to dates up to here
        #[arg(long)]
        end: Option<String>,

        /// Keep at most this many missing dates per series
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Transform, balance and standardize for factor estimation
    Prepare {
        /// Row balancing (none, initial, all)
        #[arg(short = 'b', long)]
        balance: Option<BalanceMode>,

        /// Skip z-scoring
        #[arg(long)]
        no_standardize: bool,

        /// Degrees-of-freedom correction for the deviation
        #[arg(long)]
        ddof: Option<usize>,
    },

    /// Show FRED-MD group membership, or extract one group
    Groups {
        /// Panel CSV
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Group label or number 1-8
        #[arg(short = 'g', long)]
        group: Option<SeriesGroup>,

        /// Write the selected group's panel here
        #[arg(short = 'o', long, requires = "group")]
        out: Option<PathBuf>,
    },

    /// Extract codes, transform, build variants and report missingness
    Run,

    /// Print the effective configuration as TOML
    Config,
}

fn parse_variant(raw: &str) -> std::result::Result<VariantSpec, String> {
    match raw.split_once('=') {
        Some((name, anchor)) if !name.trim().is_empty() && !anchor.trim().is_empty() => {
            Ok(VariantSpec::new(name.trim(), anchor.trim()))
        }
        _ => Err(format!("expected NAME=ANCHOR, got '{}'", raw)),
    }
}

fn read_config(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::from_path(path).with_context(|| format!("loading {}", path.display()))
}

/// `--config`, then `./rusty-dfm.toml`, then the user config dir, then defaults
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    if let Some(path) = path {
        return read_config(path);
    }

    let candidates = std::iter::once(PathBuf::from(CONFIG_FILE)).chain(
        dirs::config_dir().map(|dir| dir.join("rusty-dfm").join("config.toml")),
    );
    for candidate in candidates {
        if !candidate.exists() {
            continue;
        }
        match read_config(&candidate) {
            Ok(config) => {
                log::info!("Using configuration {}", candidate.display());
                return Ok(config);
            }
            Err(e) => {
                eprintln!("{} {:#}", "Warning:".yellow(), e);
            }
        }
    }

    Ok(PipelineConfig::default())
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose && std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    if cli.verbose {
        println!("{} v{}", "rusty-dfm".cyan().bold(), env!("CARGO_PKG_VERSION"));
        println!(
            "Raw CSV: {}",
            config.paths.raw_csv.display().to_string().dimmed()
        );
    }

    let result = match cli.command {
        Commands::ExtractTcodes {
            csv,
            out,
            row,
            no_autodetect,
            allow_missing,
            overwrite,
            no_meta,
        } => {
            let mut config = config;
            if let Some(csv) = csv {
                config.paths.raw_csv = csv;
            }
            if let Some(out) = out {
                config.paths.tcode_json = out;
            }
            if row.is_some() {
                config.tcodes.row = row;
            }
            config.tcodes.autodetect &= !no_autodetect;
            config.tcodes.require_all &= !allow_missing;
            config.tcodes.overwrite |= overwrite;
            config.tcodes.write_meta &= !no_meta;
            extract_tcodes(&config)
        }

        Commands::Transform {
            csv,
            tcodes,
            out_dir,
            parquet,
        } => {
            let mut config = config;
            if let Some(csv) = csv {
                config.paths.raw_csv = csv;
            }
            if let Some(tcodes) = tcodes {
                config.paths.tcode_json = tcodes;
            }
            if let Some(dir) = out_dir {
                config.paths.processed_dir = dir;
            }
            config.format.parquet |= parquet;
            transform(&config)
        }

        Commands::Variants {
            input,
            variants,
            holdout_months,
            train_years,
        } => {
            let mut config = config;
            if !variants.is_empty() {
                config.variants = variants;
            }
            if let Some(holdout) = holdout_months {
                config.window.holdout_months = holdout;
            }
            if let Some(years) = train_years {
                config.window.train_years = years;
            }
            config
                .validate()
                .context("invalid variant settings")
                .and_then(|_| {
                    let input = input.unwrap_or_else(|| transformed_csv(&config));
                    build_variants(&config, &input)
                })
        }

        Commands::Diagnostics {
            input,
            first,
            second,
            last,
            start,
            end,
            limit,
        } => {
            let fmt = config.format.date_format.clone();
            let date = |raw: Option<String>| parse_date_arg(raw, &fmt);
            (|| -> Result<()> {
                let diagnostics = MissingnessDiagnostics::new(
                    BoundaryRequest {
                        first: date(first)?,
                        second: date(second)?,
                        last: date(last)?,
                    },
                    PositionsOptions {
                        start: date(start)?,
                        end: date(end)?,
                        limit,
                    },
                );
                let input = input.unwrap_or_else(|| transformed_csv(&config));
                diagnostics_report(&config, &input, &diagnostics)
            })()
        }

        Commands::Prepare {
            balance,
            no_standardize,
            ddof,
        } => {
            let mut config = config;
            if let Some(balance) = balance {
                config.prepare.balance = balance;
            }
            config.prepare.standardize &= !no_standardize;
            if let Some(ddof) = ddof {
                config.prepare.ddof = ddof;
            }
            prepare(&config)
        }

        Commands::Groups { input, group, out } => {
            let input = input.unwrap_or_else(|| transformed_csv(&config));
            groups(&config, &input, group, out.as_deref())
        }

        Commands::Run => run_all(config),

        Commands::Config => config
            .to_toml_string()
            .map(|text| print!("{}", text))
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn parse_date_arg(raw: Option<String>, format: &str) -> Result<Option<Timestamp>> {
    raw.map(|raw| {
        parse_date(&raw, format)
            .with_context(|| format!("cannot parse date '{}' (expected {} or YYYY-MM-DD)", raw, format))
    })
    .transpose()
}

fn transformed_csv(config: &PipelineConfig) -> PathBuf {
    config
        .paths
        .processed_dir
        .join(format!("{}.csv", runner::TRANSFORMED_STEM))
}

fn done(what: &str, path: &Path) {
    println!("{} {}: {}", "✓".green().bold(), what, path.display());
}

fn extract_tcodes(config: &PipelineConfig) -> Result<()> {
    let extraction = runner::extract_tcodes(config).context("extracting transform codes")?;
    let meta = &extraction.meta;

    let how = if meta.autodetected { "detected" } else { "configured" };
    println!(
        "Code row {} ({}), {} series",
        meta.tcode_row.to_string().bold(),
        how,
        meta.n_series
    );
    if !meta.missing_in_tcodes.is_empty() {
        println!(
            "{} no code for: {}",
            "Warning:".yellow(),
            meta.missing_in_tcodes.join(", ")
        );
    }
    done("Transform codes", &extraction.mapping_path);
    if let Some(path) = &extraction.meta_path {
        done("Metadata", path);
    }
    Ok(())
}

fn transform(config: &PipelineConfig) -> Result<()> {
    let start = Instant::now();
    let output = runner::build_transformed_panel(config).context("transforming panel")?;
    println!(
        "Transformed {} series x {} months in {:.2}s",
        output.panel.n_columns(),
        output.panel.n_rows(),
        start.elapsed().as_secs_f64()
    );
    done("Panel", &output.csv_path);
    if let Some(path) = &output.parquet_path {
        done("Parquet", path);
    }
    Ok(())
}

fn build_variants(config: &PipelineConfig, input: &Path) -> Result<()> {
    let (panel, builder) = runner::variant_inputs(config, input)
        .with_context(|| format!("reading {}", input.display()))?;

    let pb = ProgressBar::new(config.variants.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓▒░ "),
    );

    let mut summaries = Vec::with_capacity(config.variants.len());
    for spec in &config.variants {
        pb.set_message(spec.name.clone());
        let variant = builder
            .build(&panel, spec)
            .with_context(|| format!("building variant {}", spec.name))?;
        let artifacts = runner::write_variant(config, &variant)?;
        summaries.push((variant, artifacts));
        pb.inc(1);
    }
    pb.finish_with_message("Complete!");

    println!();
    for (variant, artifacts) in &summaries {
        let window = &variant.window;
        println!("{}", variant.name.green().bold());
        println!(
            "  {} {} .. {} ({} months, {:?} rule)",
            "Training window:".bold(),
            window.start.format(&config.format.date_format),
            window.end.format(&config.format.date_format),
            window.n_months(),
            window.start_rule
        );
        for note in &window.notes {
            println!("  {} {}", "Note:".yellow(), note);
        }
        println!(
            "  {} {} kept, {} dropped",
            "Series:".bold(),
            variant.catalog.kept_series.len(),
            variant.catalog.dropped_series.len()
        );
        println!("  {} {}", "Catalog:".bold(), artifacts.catalog_json.dimmed());
    }
    Ok(())
}

fn diagnostics_report(
    config: &PipelineConfig,
    input: &Path,
    diagnostics: &MissingnessDiagnostics,
) -> Result<()> {
    let (report, artifacts) = runner::report_missing(config, input, diagnostics)
        .with_context(|| format!("diagnosing {}", input.display()))?;
    let summary = &report.summary;
    println!(
        "{} series x {} months, {} missing runs",
        summary.n_series,
        summary.n_rows,
        report.runs.len()
    );
    println!(
        "  {} {} missing at the first date, {} at the last, {} with interior gaps",
        "Boundaries:".bold(),
        summary.counts.missing_at_first,
        summary.counts.missing_at_last,
        summary.counts.missing_any_intermediate
    );
    for path in [
        &artifacts.by_series_csv,
        &artifacts.summary_json,
        &artifacts.positions_summary_csv,
        &artifacts.positions_jsonl,
        &artifacts.runs_csv,
    ] {
        done("Wrote", Path::new(path));
    }
    Ok(())
}

fn prepare(config: &PipelineConfig) -> Result<()> {
    let output = runner::prepare(config).context("preparing factor panel")?;
    println!(
        "Balanced ({}) to {} rows x {} series{}",
        output.info.balance.mode,
        output.panel.n_rows(),
        output.panel.n_columns(),
        if output.info.standardized { ", standardized" } else { "" }
    );
    done("Panel", &output.csv_path);
    done("Info", &output.info_path);
    Ok(())
}

fn groups(
    config: &PipelineConfig,
    input: &Path,
    group: Option<SeriesGroup>,
    out: Option<&Path>,
) -> Result<()> {
    let panel = load_panel_csv(input, &config.format.panel_format())
        .with_context(|| format!("reading {}", input.display()))?;

    match group {
        Some(group) => {
            let selected = filter_by_group(&panel, group)?;
            println!(
                "{} ({}): {}",
                group.label().bold(),
                group.number(),
                selected.column_names().join(", ")
            );
            if let Some(out) = out {
                write_panel_csv(&selected, out, &config.format.date_column, &config.format.csv_format())?;
                done("Panel", out);
            }
        }
        None => {
            let assigned = assign_groups(&panel);
            for g in SeriesGroup::ALL {
                let members: Vec<&str> = assigned
                    .iter()
                    .filter(|(_, a)| *a == Some(g))
                    .map(|(name, _)| name.as_str())
                    .collect();
                println!("{} {} ({})", g.number(), g.label().bold(), members.len());
            }
            let unknown: Vec<&str> = assigned
                .iter()
                .filter(|(_, a)| a.is_none())
                .map(|(name, _)| name.as_str())
                .collect();
            if !unknown.is_empty() {
                println!("{} {}", "Ungrouped:".yellow(), unknown.join(", "));
            }
        }
    }
    Ok(())
}

fn run_all(mut config: PipelineConfig) -> Result<()> {
    let start = Instant::now();
    config.tcodes.overwrite = true;

    extract_tcodes(&config)?;
    transform(&config)?;
    let input = transformed_csv(&config);
    build_variants(&config, &input)?;
    diagnostics_report(&config, &input, &MissingnessDiagnostics::default())?;

    println!();
    println!(
        "{} Pipeline finished in {:.2}s",
        "✓".green().bold(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = vec!["rusty-dfm", "run"];
        let _cli = Cli::try_parse_from(args).unwrap();
    }

    #[test]
    fn test_extract_command() {
        let args = vec![
            "rusty-dfm",
            "extract-tcodes",
            "--csv",
            "current.csv",
            "--row",
            "1",
            "--overwrite",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::ExtractTcodes { row, overwrite, .. } => {
                assert_eq!(row, Some(1));
                assert!(overwrite);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_variant_overrides() {
        let args = vec![
            "rusty-dfm",
            "variants",
            "--variant",
            "late=01/01/1970",
            "--variant",
            "early=1960-01-01",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Variants { variants, .. } => {
                assert_eq!(variants[0], VariantSpec::new("late", "01/01/1970"));
                assert_eq!(variants[1].name, "early");
            }
            _ => panic!("wrong subcommand"),
        }
        assert!(Cli::try_parse_from(vec!["rusty-dfm", "variants", "--variant", "bad"]).is_err());
    }

    #[test]
    fn test_prepare_balance_mode() {
        let cli = Cli::try_parse_from(vec!["rusty-dfm", "prepare", "--balance", "all"]).unwrap();
        match cli.command {
            Commands::Prepare { balance, .. } => assert_eq!(balance, Some(BalanceMode::All)),
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_group_out_requires_group() {
        assert!(Cli::try_parse_from(vec!["rusty-dfm", "groups", "--out", "x.csv"]).is_err());
        assert!(Cli::try_parse_from(vec!["rusty-dfm", "groups", "-g", "prices"]).is_ok());
    }

    #[test]
    fn test_parse_date_arg() {
        let fmt = "%m/%d/%Y";
        assert_eq!(parse_date_arg(None, fmt).unwrap(), None);
        assert!(parse_date_arg(Some("2000-01-01".into()), fmt).unwrap().is_some());
        assert!(parse_date_arg(Some("soon".into()), fmt).is_err());
    }
}
