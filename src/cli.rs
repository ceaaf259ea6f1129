use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Geocode spreadsheet addresses into point shapefile layers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Geocode every row and write the point layer plus a failure log
    Run(RunArgs),
    /// Inspect the input and print the attribute schema a run would use
    Probe(ProbeArgs),
    /// Write an empty point layer carrying the inferred attribute schema
    Template(TemplateArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Run configuration YAML file
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Override the configured input spreadsheet
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Override the parent directory for the timestamped run directory
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Stop after this many data rows (useful for trial runs)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Run configuration YAML file
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Override the configured input spreadsheet
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    /// Run configuration YAML file
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Override the configured input spreadsheet
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Destination .shp path for the empty template layer
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}
