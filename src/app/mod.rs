use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::LinkConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Primary CityGML document (.gml/.xml)
    #[arg(short, long)]
    pub primary: PathBuf,

    /// Secondary dataset (.gml, .xml, .json, .geojson, .csv)
    #[arg(short, long)]
    pub secondary: PathBuf,

    /// Link configuration file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Output file (.gml or .csv)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format (auto-detected if omitted)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    #[value(name = "gml")]
    Gml,
    #[value(name = "csv")]
    Csv,
}

pub fn output_format_label(format: &OutputFormat) -> &'static str {
    match format {
        OutputFormat::Gml => "gml",
        OutputFormat::Csv => "csv",
    }
}

/// Detects the output format from the output file extension.
pub fn detect_output_format(output: &Path) -> Option<OutputFormat> {
    let ext = output.extension()?.to_str()?;
    match ext.to_lowercase().as_str() {
        "gml" | "xml" => Some(OutputFormat::Gml),
        "csv" => Some(OutputFormat::Csv),
        _ => None,
    }
}

/// (attribute mappings, csv columns) counts for the startup summary.
pub fn summarize_config(config: &LinkConfig) -> (usize, usize) {
    (config.attributes.len(), config.csv_columns.len())
}
