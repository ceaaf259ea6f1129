pub mod address;
pub mod cli;
pub mod config;
pub mod data;
pub mod failures;
pub mod fields;
pub mod geocode;
pub mod nominatim;
pub mod run;
pub mod shp;
pub mod street;
pub mod workbook;

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::Config,
    data::CellValue,
    fields::FieldDef,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_geocoder", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run::execute(&args),
        Commands::Probe(args) => handle_probe(&args),
        Commands::Template(args) => handle_template(&args),
    }
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let config = load_config(&args.config, args.input.as_ref())?;
    let sheet = workbook::load(&config.input)?;
    let sample_row = config.input.effective_sample_row();
    let sample = sheet.sample(sample_row)?;
    let defs = fields::layer_fields(
        &sheet.headers,
        &sample.cells,
        config.output.sizing,
        &config.output.overrides,
    );
    info!(
        "Input {:?}: {} column(s), {} row(s), sample row {}",
        config.input.path,
        sheet.column_count,
        sheet.rows().len(),
        sample_row
    );
    print_schema(&defs, &sample.cells);
    Ok(())
}

fn handle_template(args: &cli::TemplateArgs) -> Result<()> {
    let config = load_config(&args.config, args.input.as_ref())?;
    let sheet = workbook::load(&config.input)?;
    let sample = sheet.sample(config.input.effective_sample_row())?;
    let defs = fields::layer_fields(
        &sheet.headers,
        &sample.cells,
        config.output.sizing,
        &config.output.overrides,
    );
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating template directory {parent:?}"))?;
        }
    }
    shp::create_template(&args.output, &defs)?;
    info!(
        "Template layer with {} field(s) written to {:?}",
        defs.len(),
        args.output
    );
    Ok(())
}

pub(crate) fn load_config(path: &Path, input_override: Option<&PathBuf>) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(input) = input_override {
        config.input.path = input.clone();
    }
    Ok(config)
}

fn print_schema(defs: &[FieldDef], sample: &[CellValue]) {
    let name_width = defs
        .iter()
        .map(|def| def.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("field".len());
    println!("{:<name_width$}  type  width  precision  sample", "field");
    for (idx, def) in defs.iter().enumerate() {
        let sample_text = sample
            .get(idx)
            .map(|cell| cell.as_display())
            .unwrap_or_default();
        println!(
            "{:<name_width$}  {:^4}  {:>5}  {:>9}  {}",
            def.name,
            def.kind.code(),
            def.width,
            def.precision,
            sample_text
        );
    }
}
