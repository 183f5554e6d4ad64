//! Command-line parsing for the operational spreadsheet parser.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! engine. Every tunable flag is optional so that unset flags fall back to the
//! environment (`.env` included) and then to built-in defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "opsheet",
    version,
    about = "Map messy factory spreadsheets onto a fixed asset/parameter taxonomy"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a workbook and print (or export) the classification result.
    Parse(ParseArgs),
    /// List the taxonomy registry in use.
    Taxonomy(TaxonomyArgs),
    /// Validate a JSON taxonomy catalogue and report the first defect.
    CheckTaxonomy(CheckTaxonomyArgs),
}

/// Options for `opsheet parse`.
#[derive(Debug, Args, Clone)]
pub struct ParseArgs {
    /// Workbook to parse (.xlsx, .xlsm, .xlsb, .xls, .ods).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the wire envelope as JSON instead of the summary.
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON envelope to a file.
    #[arg(long, value_name = "JSON")]
    pub out: Option<PathBuf>,

    /// Export `parsed_data` to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// JSON taxonomy catalogue to use instead of the built-in one.
    #[arg(long, value_name = "JSON")]
    pub taxonomy: Option<PathBuf>,

    /// Stop starting new sheets after this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Minimum similarity for a `medium` match.
    #[arg(long)]
    pub medium_threshold: Option<f64>,

    /// Minimum similarity for a `low` match; below this a label is unmapped.
    #[arg(long)]
    pub low_floor: Option<f64>,

    /// Raw sample values kept per unmapped label.
    #[arg(long)]
    pub sample_limit: Option<usize>,

    /// Rows/columns searched for a header lane.
    #[arg(long)]
    pub scan_limit: Option<usize>,

    /// Process sheets one at a time.
    #[arg(long)]
    pub sequential: bool,
}

/// Options for `opsheet taxonomy`.
#[derive(Debug, Args, Clone)]
pub struct TaxonomyArgs {
    /// JSON taxonomy catalogue to list instead of the built-in one.
    #[arg(long, value_name = "JSON")]
    pub taxonomy: Option<PathBuf>,
}

/// Options for `opsheet check-taxonomy`.
#[derive(Debug, Args, Clone)]
pub struct CheckTaxonomyArgs {
    /// JSON taxonomy catalogue to validate.
    #[arg(value_name = "JSON")]
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_subcommand_flags() {
        let cli = Cli::parse_from([
            "opsheet",
            "parse",
            "plant.xlsx",
            "--json",
            "--medium-threshold",
            "0.9",
            "--sequential",
        ]);
        match cli.command {
            Command::Parse(args) => {
                assert_eq!(args.file, PathBuf::from("plant.xlsx"));
                assert!(args.json);
                assert_eq!(args.medium_threshold, Some(0.9));
                assert_eq!(args.low_floor, None);
                assert!(args.sequential);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn check_taxonomy_takes_a_path() {
        let cli = Cli::parse_from(["opsheet", "check-taxonomy", "catalogue.json"]);
        assert!(matches!(cli.command, Command::CheckTaxonomy(a) if a.path == PathBuf::from("catalogue.json")));
    }
}
