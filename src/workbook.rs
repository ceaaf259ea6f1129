//! Input loading: workbooks and delimited text into one uniform row table.
//!
//! Both backends produce absolutely numbered rows (row 1 is the first
//! spreadsheet row, header included) padded to a single column count, so
//! the 1-based row and column references in the configuration mean the same
//! thing regardless of the file format. Workbook ranges that do not start at
//! cell A1 are padded back to column A for the same reason.

use std::path::Path;

use anyhow::{Context, Result, bail};
use calamine::{Reader, open_workbook_auto};
use log::debug;

use crate::config::InputConfig;
use crate::data::{self, CellValue};

#[derive(Debug, Clone)]
pub struct Row {
    /// 1-based spreadsheet row number.
    pub number: u32,
    pub cells: Vec<CellValue>,
}

#[derive(Debug, Clone)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub column_count: usize,
    rows: Vec<Row>,
}

impl SheetData {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows inside the configured window, both bounds inclusive.
    pub fn window(&self, min_row: u32, max_row: Option<u32>) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |row| {
            row.number >= min_row && max_row.is_none_or(|max| row.number <= max)
        })
    }

    pub fn row(&self, number: u32) -> Option<&Row> {
        self.rows.iter().find(|row| row.number == number)
    }

    pub fn sample(&self, number: u32) -> Result<&Row> {
        self.row(number)
            .with_context(|| format!("Sample row {number} not found in the input"))
    }
}

pub fn load(input: &InputConfig) -> Result<SheetData> {
    let path = input.path.as_path();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let mut rows = match extension.as_str() {
        "csv" | "txt" => load_delimited(path, b',')?,
        "tsv" => load_delimited(path, b'\t')?,
        _ => load_workbook(path)?,
    };
    let column_count = input
        .max_columns
        .unwrap_or_else(|| rows.iter().map(|row| row.cells.len()).max().unwrap_or(0));
    if column_count == 0 {
        bail!("Input {path:?} contains no columns");
    }
    for row in &mut rows {
        row.cells.resize(column_count, CellValue::Empty);
    }
    let headers = header_names(&rows, column_count, input.has_header);
    debug!(
        "Loaded {} row(s) x {} column(s) from {:?}",
        rows.len(),
        column_count,
        path
    );
    Ok(SheetData {
        headers,
        column_count,
        rows,
    })
}

fn load_workbook(path: &Path) -> Result<Vec<Row>> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
    let range = workbook
        .worksheet_range_at(0)
        .with_context(|| format!("Workbook {path:?} has no sheets"))?
        .with_context(|| format!("Reading the first sheet of {path:?}"))?;
    let Some((start_row, start_col)) = range.start() else {
        return Ok(Vec::new());
    };
    let start_col = start_col as usize;
    let mut rows = Vec::with_capacity(range.height());
    for (offset, cells) in range.rows().enumerate() {
        let number = start_row + offset as u32 + 1;
        let mut padded = vec![CellValue::Empty; start_col];
        padded.extend(cells.iter().map(data::from_sheet_cell));
        rows.push(Row {
            number,
            cells: padded,
        });
    }
    Ok(rows)
}

fn load_delimited(path: &Path, delimiter: u8) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("Opening input {path:?}"))?;
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} from {path:?}", idx + 1))?;
        let cells = record.iter().map(data::infer_cell).collect();
        rows.push(Row {
            number: idx as u32 + 1,
            cells,
        });
    }
    Ok(rows)
}

fn header_names(rows: &[Row], column_count: usize, has_header: bool) -> Vec<String> {
    let header_row = if has_header {
        rows.iter().find(|row| row.number == 1)
    } else {
        None
    };
    (0..column_count)
        .map(|idx| {
            let name = header_row
                .and_then(|row| row.cells.get(idx))
                .map(|cell| cell.as_display().trim().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                column_letter(idx)
            } else {
                name
            }
        })
        .collect()
}

/// Spreadsheet-style column letters: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_letter(index: usize) -> String {
    let mut value = index + 1;
    let mut letters = String::new();
    while value > 0 {
        value -= 1;
        letters.insert(0, (b'A' + (value % 26) as u8) as char);
        value /= 26;
    }
    letters
}
