//! Cell values read from spreadsheet inputs.
//!
//! Every input backend (workbooks via `calamine`, delimited text via `csv`)
//! funnels its cells through [`CellValue`] so the rest of the pipeline never
//! cares where a row came from. [`CellKind`] tags the variants and doubles as
//! the key for per-type attribute overrides in the run configuration.

use std::fmt;

use calamine::{Data, DataType};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Empty,
    Text,
    Integer,
    Real,
    Boolean,
    Timestamp,
}

impl CellValue {
    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::Empty => CellKind::Empty,
            CellValue::Text(_) => CellKind::Text,
            CellValue::Integer(_) => CellKind::Integer,
            CellValue::Real(_) => CellKind::Real,
            CellValue::Boolean(_) => CellKind::Boolean,
            CellValue::Timestamp(_) => CellKind::Timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Real(f) => {
                if f.fract() == 0.0 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Timestamp(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Real(f) => Some(*f),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            CellValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Timestamp(dt) => Some(*dt),
            CellValue::Text(s) => parse_timestamp(s.trim()),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Converts a workbook cell into the pipeline representation. Formula errors
/// and ISO durations degrade to text so a single bad cell never aborts a run.
pub fn from_sheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Int(value) => CellValue::Integer(*value),
        Data::Float(value) => CellValue::Real(*value),
        Data::Bool(value) => CellValue::Boolean(*value),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(stamp) => CellValue::Timestamp(stamp),
            None => CellValue::Text(cell.to_string()),
        },
        Data::DurationIso(text) => CellValue::Text(text.clone()),
        Data::Error(error) => CellValue::Text(error.to_string()),
    }
}

/// Infers a typed cell from a delimited-text field, mirroring the implicit
/// typing a workbook would apply to the same content.
pub fn infer_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return CellValue::Integer(int);
    }
    // The digit guard keeps "inf" and "NaN" textual.
    if trimmed.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(real) = trimmed.parse::<f64>() {
            return CellValue::Real(real);
        }
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => return CellValue::Boolean(true),
        "false" => return CellValue::Boolean(false),
        _ => {}
    }
    if let Some(stamp) = parse_timestamp(trimmed) {
        return CellValue::Timestamp(stamp);
    }
    CellValue::Text(raw.to_string())
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}
