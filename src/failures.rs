//! Failure log: one CSV row per input row that produced no point.
//!
//! The file is created lazily on the first failure so clean runs leave no
//! log behind. Every logged row is also kept in memory; if the primary file
//! stops accepting writes (a spreadsheet tool holding a lock on it is the
//! usual cause), the log replays everything into an `_alt` sibling and
//! continues there. A failure on the alternate path is fatal.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::warn;

use crate::data::CellValue;

/// Diagnostic columns appended after the input columns.
pub const FAILURE_COLUMNS: [&str; 4] = ["query", "gc_status", "gc_status_code", "gc_timeout"];

pub struct FailureLog {
    primary: PathBuf,
    alternate: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    writer: Option<csv::Writer<File>>,
    written: usize,
    on_alternate: bool,
}

impl FailureLog {
    pub fn new(dir: &Path, stem: &str, column_headers: &[String]) -> Self {
        let mut headers: Vec<String> = column_headers.to_vec();
        headers.extend(FAILURE_COLUMNS.iter().map(|name| name.to_string()));
        Self {
            primary: dir.join(format!("NO_RESULTS_{stem}.csv")),
            alternate: dir.join(format!("NO_RESULTS_{stem}_alt.csv")),
            headers,
            rows: Vec::new(),
            writer: None,
            written: 0,
            on_alternate: false,
        }
    }

    /// Records one failed row: the input cells followed by the last query
    /// (empty when the row never produced one) and the provider status.
    pub fn append(
        &mut self,
        cells: &[CellValue],
        query: Option<&str>,
        status: &str,
        status_code: i32,
        timed_out: bool,
    ) -> Result<()> {
        let mut row: Vec<String> = cells.iter().map(CellValue::as_display).collect();
        row.push(query.unwrap_or_default().to_string());
        row.push(status.to_string());
        row.push(status_code.to_string());
        row.push(timed_out.to_string());
        self.rows.push(row);
        if let Err(err) = self.write_pending() {
            if self.on_alternate {
                return Err(err)
                    .with_context(|| format!("Writing failure log {:?}", self.alternate));
            }
            warn!(
                "Failure log {:?} is not writable ({err:#}); switching to {:?}",
                self.primary, self.alternate
            );
            self.on_alternate = true;
            self.writer = None;
            self.written = 0;
            self.write_pending()
                .with_context(|| format!("Writing fallback failure log {:?}", self.alternate))?;
        }
        Ok(())
    }

    fn write_pending(&mut self) -> Result<()> {
        if self.writer.is_none() {
            let path = self.target().to_path_buf();
            let file =
                File::create(&path).with_context(|| format!("Creating failure log {path:?}"))?;
            let mut writer = csv::Writer::from_writer(file);
            writer
                .write_record(&self.headers)
                .context("Writing failure log header")?;
            self.written = 0;
            self.writer = Some(writer);
        }
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        while self.written < self.rows.len() {
            writer.write_record(&self.rows[self.written])?;
            self.written += 1;
        }
        writer.flush()?;
        Ok(())
    }

    /// Where failures are being written; `None` while the log is empty.
    pub fn path(&self) -> Option<&Path> {
        self.writer.is_some().then(|| self.target())
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    fn target(&self) -> &Path {
        if self.on_alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }
}
