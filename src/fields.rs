//! Attribute schema for the output point layer.
//!
//! The dBase table attached to the point layer mirrors the input columns,
//! with every column typed from a single sample row, plus three provenance
//! fields describing how each point was found. Field names obey the dBase
//! 10-byte limit and are de-duplicated after truncation so the name-keyed
//! record writer never merges two columns.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::data::{CellKind, CellValue};

pub const MAX_FIELD_NAME_BYTES: usize = 10;
pub const MAX_CHARACTER_WIDTH: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Character,
    Numeric,
    Float,
    Logical,
    Date,
}

impl FieldKind {
    /// dBase type letter, as shown by `probe`.
    pub fn code(self) -> char {
        match self {
            FieldKind::Character => 'C',
            FieldKind::Numeric => 'N',
            FieldKind::Float => 'F',
            FieldKind::Logical => 'L',
            FieldKind::Date => 'D',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub width: u8,
    pub precision: u8,
}

/// How column widths are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizingMode {
    /// Generous constant widths per type.
    #[default]
    Fixed,
    /// Widths measured from the sample row's rendered values.
    Sampled,
}

/// Per-cell-kind width adjustments from the run configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldOverride {
    pub width: Option<u8>,
    pub precision: Option<u8>,
}

/// Infers the full attribute schema: one field per input column followed by
/// the three provenance fields.
pub fn layer_fields(
    headers: &[String],
    sample: &[CellValue],
    sizing: SizingMode,
    overrides: &BTreeMap<CellKind, FieldOverride>,
) -> Vec<FieldDef> {
    let mut defs: Vec<FieldDef> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let value = sample.get(idx).unwrap_or(&CellValue::Empty);
            infer_field(header, value, sizing, overrides)
        })
        .collect();
    defs.extend(provenance_fields());
    uniquify(&mut defs);
    defs
}

/// Provenance fields appended after the spreadsheet columns: the query that
/// produced the point, the provider object reference, and the confidence.
pub fn provenance_fields() -> Vec<FieldDef> {
    vec![
        FieldDef {
            name: "QUERY".to_string(),
            kind: FieldKind::Character,
            width: MAX_CHARACTER_WIDTH,
            precision: 0,
        },
        FieldDef {
            name: "OSM_REF".to_string(),
            kind: FieldKind::Character,
            width: MAX_CHARACTER_WIDTH,
            precision: 0,
        },
        FieldDef {
            name: "CONFIDENCE".to_string(),
            kind: FieldKind::Float,
            width: 5,
            precision: 2,
        },
    ]
}

fn infer_field(
    header: &str,
    sample: &CellValue,
    sizing: SizingMode,
    overrides: &BTreeMap<CellKind, FieldOverride>,
) -> FieldDef {
    let (kind, mut width, mut precision) = match sample.kind() {
        CellKind::Empty | CellKind::Text => (FieldKind::Character, MAX_CHARACTER_WIDTH, 0),
        CellKind::Integer => (FieldKind::Numeric, 9, 0),
        CellKind::Real => (FieldKind::Numeric, 6, 2),
        CellKind::Boolean => (FieldKind::Logical, 1, 0),
        CellKind::Timestamp => (FieldKind::Date, 8, 0),
    };
    if sizing == SizingMode::Sampled {
        (width, precision) = sampled_size(sample, width, precision);
    }
    if let Some(adjust) = overrides.get(&sample.kind()) {
        if let Some(w) = adjust.width {
            width = w;
        }
        if let Some(p) = adjust.precision {
            precision = p;
        }
    }
    FieldDef {
        name: dbf_field_name(header),
        kind,
        width,
        precision,
    }
}

/// Measures width and precision from the sample value's rendered form.
/// Logical and date fields have fixed storage widths and are left alone.
fn sampled_size(sample: &CellValue, width: u8, precision: u8) -> (u8, u8) {
    match sample {
        CellValue::Text(text) => {
            let measured = text.trim().len().clamp(1, MAX_CHARACTER_WIDTH as usize);
            (measured as u8, 0)
        }
        CellValue::Integer(_) => {
            let measured = sample.as_display().len().max(1);
            (measured as u8, 0)
        }
        CellValue::Real(_) => {
            let rendered = sample.as_display();
            match rendered.split_once('.') {
                Some((int_part, frac_part)) => (
                    (int_part.len() + frac_part.len()).max(1) as u8,
                    frac_part.len() as u8,
                ),
                None => (rendered.len().max(1) as u8, 0),
            }
        }
        _ => (width, precision),
    }
}

/// Applies the dBase naming rules to a column header: trim, then cut at the
/// 10-byte limit without splitting a multi-byte character.
pub fn dbf_field_name(header: &str) -> String {
    let name = truncate_bytes(header.trim(), MAX_FIELD_NAME_BYTES);
    if name.is_empty() {
        "FIELD".to_string()
    } else {
        name.to_string()
    }
}

pub fn truncate_bytes(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Renames later duplicates with a numeric suffix, keeping every name inside
/// the 10-byte limit.
fn uniquify(defs: &mut [FieldDef]) {
    let mut used: BTreeSet<String> = BTreeSet::new();
    for def in defs.iter_mut() {
        if used.insert(def.name.clone()) {
            continue;
        }
        let mut counter = 2usize;
        loop {
            let suffix = format!("_{counter}");
            let keep = MAX_FIELD_NAME_BYTES.saturating_sub(suffix.len());
            let candidate = format!("{}{suffix}", truncate_bytes(&def.name, keep));
            if used.insert(candidate.clone()) {
                def.name = candidate;
                break;
            }
            counter += 1;
        }
    }
}
