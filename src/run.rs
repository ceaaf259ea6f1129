//! The `run` command: end-to-end geocoding of one spreadsheet.
//!
//! Loads the input, walks the configured row window, assembles a query per
//! row, resolves it through the search strategy, and routes each outcome to
//! the point layer or the failure log. Everything lands in a timestamped run
//! directory so successive runs never overwrite each other.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info, warn};

use crate::{
    address::{AddressParts, Assembler},
    cli::RunArgs,
    config::Config,
    failures::FailureLog,
    fields,
    geocode::{GeocodeResult, NO_RESULTS_STATUS, Orchestrator},
    nominatim::NominatimClient,
    shp::PointLayer,
    workbook::{self, Row, SheetData},
};

#[derive(Debug)]
pub struct PassSummary {
    pub rows: usize,
    pub matched: usize,
    pub failed: usize,
    pub layer_path: PathBuf,
    pub failure_log: Option<PathBuf>,
}

pub fn execute(args: &RunArgs) -> Result<()> {
    let mut config = crate::load_config(&args.config, args.input.as_ref())?;
    if let Some(dir) = &args.output_dir {
        config.output.dir = Some(dir.clone());
    }

    let sheet = workbook::load(&config.input)?;
    let assembler = Assembler::from_config(&config.address)?;
    let client = NominatimClient::new(&config.search.endpoint)?;
    let orchestrator = Orchestrator::new(&client, config.search.mode, config.search.delay());
    let run_dir = create_run_dir(&config)?;
    info!(
        "Geocoding {:?} via {} ({:?} mode, {} ms between queries)",
        config.input.path, config.search.endpoint, config.search.mode, config.search.delay_ms
    );
    let started = Instant::now();
    let summary = run_pass(
        &sheet,
        &config,
        &assembler,
        &orchestrator,
        &run_dir,
        args.limit,
    )?;
    info!(
        "Processed {} row(s) in {:.1?}: {} matched into {:?}, {} failed{}",
        summary.rows,
        started.elapsed(),
        summary.matched,
        summary.layer_path,
        summary.failed,
        summary
            .failure_log
            .as_ref()
            .map(|path| format!(" (see {path:?})"))
            .unwrap_or_default()
    );
    Ok(())
}

/// One full pass over the row window. Split from [`execute`] so the pipeline
/// can be driven with any [`crate::geocode::Geocoder`] behind the
/// orchestrator.
pub fn run_pass(
    sheet: &SheetData,
    config: &Config,
    assembler: &Assembler,
    orchestrator: &Orchestrator,
    run_dir: &Path,
    limit: Option<usize>,
) -> Result<PassSummary> {
    let sample = sheet.sample(config.input.effective_sample_row())?;
    let defs = fields::layer_fields(
        &sheet.headers,
        &sample.cells,
        config.output.sizing,
        &config.output.overrides,
    );
    let stem = input_stem(&config.input.path);
    let layer_path = run_dir.join(format!("{stem}.shp"));
    let mut layer = PointLayer::create(&layer_path, &defs)?;
    let mut failures = FailureLog::new(run_dir, &stem, &sheet.headers);

    let mut rows = 0usize;
    let window = sheet
        .window(config.input.first_data_row(), config.input.max_row)
        .take(limit.unwrap_or(usize::MAX));
    for row in window {
        rows += 1;
        let parts = address_parts(row, config);
        let address = assembler.assemble(&parts);
        match &address {
            Some(address) => debug!("row {}: '{address}'", row.number),
            None => debug!("row {}: no usable address", row.number),
        }
        let attempt = orchestrator.resolve(address);
        match attempt.result {
            GeocodeResult::Match(hit) => {
                layer.write_point(
                    hit.longitude,
                    hit.latitude,
                    &row.cells,
                    attempt.query.as_deref().unwrap_or_default(),
                    &hit.provider_ref,
                    hit.confidence,
                )?;
                info!(
                    "row {}: ({:.6}, {:.6}) via {} confidence {:.2}",
                    row.number, hit.longitude, hit.latitude, hit.provider_ref, hit.confidence
                );
            }
            GeocodeResult::NoResults { status_code } => {
                warn!("row {}: no results (HTTP {status_code})", row.number);
                failures.append(
                    &row.cells,
                    attempt.query.as_deref(),
                    NO_RESULTS_STATUS,
                    i32::from(status_code),
                    false,
                )?;
            }
            GeocodeResult::Failed(failure) => {
                warn!(
                    "row {}: {} (code {}, timeout {})",
                    row.number, failure.status, failure.status_code, failure.timed_out
                );
                failures.append(
                    &row.cells,
                    attempt.query.as_deref(),
                    &failure.status,
                    failure.status_code,
                    failure.timed_out,
                )?;
            }
        }
    }
    Ok(PassSummary {
        rows,
        matched: layer.feature_count(),
        failed: failures.count(),
        layer_path,
        failure_log: failures.path().map(Path::to_path_buf),
    })
}

/// Creates `output_<timestamp>/` under the configured parent directory (the
/// input's directory by default).
fn create_run_dir(config: &Config) -> Result<PathBuf> {
    let parent = match &config.output.dir {
        Some(dir) => dir.clone(),
        None => config
            .input
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let run_dir = parent.join(format!("output_{stamp}"));
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("Creating run directory {run_dir:?}"))?;
    Ok(run_dir)
}

fn input_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("layer")
        .to_string()
}

fn address_parts(row: &Row, config: &Config) -> AddressParts {
    AddressParts {
        street: role_cell(row, config.columns.street),
        secondary_place: role_cell(row, config.columns.secondary_place),
        primary_place: role_cell(row, config.columns.primary_place),
        county: role_cell(row, config.columns.county),
    }
}

/// Reads a 1-based role column from the row; out-of-range cells read as
/// empty so short rows degrade to failures instead of panics.
fn role_cell(row: &Row, index: usize) -> String {
    row.cells
        .get(index - 1)
        .map(|cell| cell.as_display().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CellValue;

    #[test]
    fn role_cells_are_trimmed_and_safe_out_of_range() {
        let row = Row {
            number: 2,
            cells: vec![
                CellValue::Text("  Polna 7  ".to_string()),
                CellValue::Integer(48),
            ],
        };
        assert_eq!(role_cell(&row, 1), "Polna 7");
        assert_eq!(role_cell(&row, 2), "48");
        assert_eq!(role_cell(&row, 9), "");
    }

    #[test]
    fn input_stems_fall_back_for_odd_paths() {
        assert_eq!(input_stem(Path::new("data/points.xlsx")), "points");
        assert_eq!(input_stem(Path::new("points.csv")), "points");
        assert_eq!(input_stem(Path::new("/")), "layer");
    }
}
