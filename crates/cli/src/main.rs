use anyhow::{bail, Context, Result};
use autocurator_catalog::{
    is_primary_process, json, xml, Catalog, CatalogConfig, DatasetReader, FileScanner,
    IngestStats, WriteOutcome, DEFAULT_PATTERN,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;

mod flags;

use flags::{DuplicatesFlag, ReaderFlag};

#[derive(Parser)]
#[command(name = "autocurator")]
#[command(about = "Build a cross-file metadata catalog of gridded data files", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the data files to index
    #[arg(long)]
    path: Option<PathBuf>,

    /// Glob matched against file names in --path
    #[arg(long, default_value = DEFAULT_PATTERN)]
    ext: String,

    /// Also index subdirectories of --path
    #[arg(long)]
    recurse: bool,

    /// Start from a previously written JSON catalog
    #[arg(long)]
    in_json: Option<PathBuf>,

    /// Write the catalog as XML ("-" for stdout)
    #[arg(long)]
    out_xml: Option<PathBuf>,

    /// Write the catalog as JSON ("-" for stdout)
    #[arg(long)]
    out_json: Option<PathBuf>,

    /// Indent JSON output
    #[arg(long)]
    out_pretty: bool,

    /// How data files are read (default: netcdf when compiled in)
    #[arg(long, value_enum)]
    reader: Option<ReaderFlag>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tolerance for comparing floating point coordinates
    #[arg(long)]
    tolerance: Option<f64>,

    /// What to do when two files store the same variable slice
    #[arg(long, value_enum)]
    duplicates: Option<DuplicatesFlag>,

    /// Log and skip files that fail to ingest instead of stopping
    #[arg(long)]
    keep_going: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone)]
enum Format {
    Json { pretty: bool },
    Xml,
}

fn main() {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.path.is_none() && cli.in_json.is_none() {
        bail!("either --path or --in-json is required");
    }
    let config = load_config(cli)?;

    let mut catalog = match &cli.in_json {
        Some(path) => json::read_json_file(path, config)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::new(config),
    };

    if let Some(dir) = &cli.path {
        let reader = cli.reader.unwrap_or(ReaderFlag::build_default()).open()?;
        let stats = populate(&mut catalog, reader.as_ref(), dir, cli)?;
        log::info!(
            "Indexed {} files ({} new axes, {} variants, {} new variables) in {} ms",
            stats.files,
            stats.axes,
            stats.variants,
            stats.variables,
            stats.time_ms
        );
        if !stats.errors.is_empty() {
            log::warn!("Skipped {} files that failed to ingest", stats.errors.len());
        }
    }

    if let Some(path) = &cli.out_json {
        emit(&catalog, path, Format::Json { pretty: cli.out_pretty })?;
    }
    if let Some(path) = &cli.out_xml {
        emit(&catalog, path, Format::Xml)?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<CatalogConfig> {
    let mut config = match &cli.config {
        Some(path) => CatalogConfig::load(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => CatalogConfig::default(),
    };
    if let Some(tolerance) = cli.tolerance {
        if !tolerance.is_finite() || tolerance < 0.0 {
            bail!("--tolerance must be a non-negative number, got {tolerance}");
        }
        config.float_tolerance = tolerance;
    }
    if let Some(duplicates) = cli.duplicates {
        config.duplicates = duplicates.as_domain();
    }
    Ok(config)
}

fn populate(
    catalog: &mut Catalog,
    reader: &dyn DatasetReader,
    dir: &Path,
    cli: &Cli,
) -> Result<IngestStats> {
    if !cli.keep_going {
        return catalog
            .populate_from_path(reader, dir, &cli.ext, cli.recurse)
            .with_context(|| format!("Failed to index {}", dir.display()));
    }

    let start = Instant::now();
    let batches = FileScanner::new(dir)
        .with_pattern(cli.ext.as_str())
        .recursive(cli.recurse)
        .scan()
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    let mut stats = IngestStats::new();
    for batch in &batches {
        for name in &batch.files {
            match catalog.ingest_file(reader, &batch.directory, name) {
                Ok(file_stats) => stats.merge(file_stats),
                Err(err) => {
                    log::warn!("Skipping {name}: {err}");
                    stats.add_error(err.to_string());
                }
            }
        }
    }
    stats.time_ms = start.elapsed().as_millis() as u64;
    Ok(stats)
}

fn emit(catalog: &Catalog, path: &Path, format: Format) -> Result<()> {
    if path == Path::new("-") {
        if is_primary_process() {
            let text = match format {
                Format::Json { pretty } => json::to_json(catalog, pretty)?,
                Format::Xml => xml::to_xml(catalog),
            };
            println!("{}", text.trim_end());
        }
        return Ok(());
    }

    let outcome = match format {
        Format::Json { pretty } => json::write_json_file(catalog, path, pretty),
        Format::Xml => xml::write_xml_file(catalog, path),
    }
    .with_context(|| format!("Failed to write {}", path.display()))?;
    if outcome == WriteOutcome::Suppressed {
        log::debug!("Not the primary process; {} left untouched", path.display());
    }
    Ok(())
}
