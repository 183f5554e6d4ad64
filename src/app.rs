//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the tracing subscriber
//! - parses CLI arguments
//! - builds the taxonomy registry and the engine configuration
//! - runs the parse pipeline
//! - prints the summary or JSON envelope and writes optional exports

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckTaxonomyArgs, Command, ParseArgs, TaxonomyArgs};
use crate::domain::{ParseConfig, ParseResponse};
use crate::error::AppError;
use crate::taxonomy::Taxonomy;

pub mod pipeline;

use pipeline::Cancellation;

/// Extensions accepted by `opsheet parse`.
const SUPPORTED_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Entry point for the `opsheet` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Parse(args) => handle_parse(args),
        Command::Taxonomy(args) => handle_taxonomy(args),
        Command::CheckTaxonomy(args) => handle_check_taxonomy(args),
    }
}

/// Structured logs go to stderr so `--json` output on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_parse(args: ParseArgs) -> Result<(), AppError> {
    let config = parse_config_from_args(&args)?;
    let taxonomy = load_taxonomy(args.taxonomy.as_deref())?;

    validate_extension(&args.file)?;
    let bytes = std::fs::read(&args.file)
        .map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", args.file.display())))?;
    let filename = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let cancel = match args.timeout_ms {
        Some(ms) => Cancellation::with_timeout(Duration::from_millis(ms)),
        None => Cancellation::new(),
    };

    let outcome = pipeline::parse_workbook(&bytes, filename, &taxonomy, &config, &cancel);
    let failure = outcome.as_ref().err().cloned();
    let response = pipeline::respond(outcome);

    if let Some(path) = &args.out {
        crate::io::export::write_response_json(path, &response)?;
    }
    if args.json {
        let json = serde_json::to_string_pretty(&response)
            .map_err(|e| AppError::new(4, format!("Failed to serialize result: {e}")))?;
        println!("{json}");
    }

    match (&response, failure) {
        (_, Some(err)) => Err(err.into()),
        (ParseResponse::Success(result), None) => {
            if !args.json {
                println!("{}", crate::report::format_parse_summary(filename, result));
            }
            if let Some(path) = &args.export_csv {
                crate::io::export::write_parsed_csv(path, &result.parsed_data)?;
            }
            Ok(())
        }
        (ParseResponse::Failure(f), None) => Err(AppError::new(2, f.detail.clone())),
    }
}

fn handle_taxonomy(args: TaxonomyArgs) -> Result<(), AppError> {
    let taxonomy = load_taxonomy(args.taxonomy.as_deref())?;
    println!("{}", crate::report::format_taxonomy(&taxonomy));
    Ok(())
}

fn handle_check_taxonomy(args: CheckTaxonomyArgs) -> Result<(), AppError> {
    let taxonomy = Taxonomy::from_json_path(&args.path)
        .map_err(|e| AppError::new(3, format!("{}: {e}", args.path.display())))?;
    println!(
        "{}: OK ({} parameters, {} assets)",
        args.path.display(),
        taxonomy.entries().len(),
        taxonomy.assets().len()
    );
    Ok(())
}

/// The registry named by `--taxonomy`, else `OPSHEET_TAXONOMY`, else the built-in one.
fn load_taxonomy(path: Option<&Path>) -> Result<Taxonomy, AppError> {
    let from_env = std::env::var_os("OPSHEET_TAXONOMY").map(PathBuf::from);
    match path.map(Path::to_path_buf).or(from_env) {
        Some(path) => Taxonomy::from_json_path(&path)
            .map_err(|e| AppError::new(3, format!("Taxonomy '{}': {e}", path.display()))),
        None => Ok(Taxonomy::builtin()?),
    }
}

/// Environment defaults, then CLI overrides, then validation.
pub fn parse_config_from_args(args: &ParseArgs) -> Result<ParseConfig, AppError> {
    let mut config = parse_config_from_env()?;
    if let Some(v) = args.medium_threshold {
        config.medium_threshold = v;
    }
    if let Some(v) = args.low_floor {
        config.low_floor = v;
    }
    if let Some(v) = args.sample_limit {
        config.sample_limit = v;
    }
    if let Some(v) = args.scan_limit {
        config.scan_limit = v;
    }
    if args.sequential {
        config.parallel = false;
    }
    config.validate().map_err(|msg| AppError::new(2, msg))?;
    Ok(config)
}

/// `ParseConfig` defaults overridden by `OPSHEET_*` variables.
pub fn parse_config_from_env() -> Result<ParseConfig, AppError> {
    let mut config = ParseConfig::default();
    if let Some(v) = env_value("OPSHEET_MEDIUM_THRESHOLD")? {
        config.medium_threshold = v;
    }
    if let Some(v) = env_value("OPSHEET_LOW_FLOOR")? {
        config.low_floor = v;
    }
    if let Some(v) = env_value("OPSHEET_SAMPLE_LIMIT")? {
        config.sample_limit = v;
    }
    if let Some(v) = env_value("OPSHEET_SCAN_LIMIT")? {
        config.scan_limit = v;
    }
    if let Some(v) = env_value("OPSHEET_PARALLEL")? {
        config.parallel = v;
    }
    Ok(config)
}

fn env_value<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::new(2, format!("Invalid {key}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Reject files the upload form would not accept.
fn validate_extension(path: &Path) -> Result<(), AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(AppError::new(
            2,
            format!(
                "Unsupported file '{}': expected one of .{}",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", .")
            ),
        ))
    }
}
